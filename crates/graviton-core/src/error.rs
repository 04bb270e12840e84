//! Graviton 핵심 에러 타입.
//!
//! 격리 실행 준비 실패, 스케줄러 등록/해제 실패, 설정/입출력 에러를 정의한다.
//! 스케줄러 미지원은 에러가 아니다 (`probe()`가 `None`을 반환).

use std::path::PathBuf;
use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 클래스패스 항목이 존재하지 않음
    #[error("클래스패스 항목 미발견: {}", path.display())]
    ClasspathEntryNotFound {
        /// 존재하지 않는 경로
        path: PathBuf,
    },

    /// 진입점을 찾을 수 없거나 실행할 수 없음
    #[error("진입점 미발견: {name}")]
    EntryPointNotFound {
        /// 요청된 진입점 이름
        name: String,
    },

    /// 예약 작업 등록 실패 (다음 시작 시 재시도 대상)
    #[error("예약 작업 등록 실패 — {task}: {reason}")]
    SchedulerRegistration {
        /// 작업 이름
        task: String,
        /// 실패 사유 (백엔드별 메시지)
        reason: String,
    },

    /// 예약 작업 해제 실패 (로그만 남김)
    #[error("예약 작업 해제 실패 — {task}: {reason}")]
    SchedulerDeregistration {
        /// 작업 이름
        task: String,
        /// 실패 사유
        reason: String,
    },

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 — {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl CoreError {
    /// 유효성 검증 에러 생성 헬퍼
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// `source()` 체인을 포함한 여러 줄 보고서.
    ///
    /// 에러 로그 마커 파일과 치명적 오류 알림창에 그대로 기록된다.
    pub fn report_chain(&self) -> String {
        render_chain(self)
    }
}

/// 임의의 에러를 `source()` 체인과 함께 문자열로 변환
pub fn render_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str("\n  원인: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
