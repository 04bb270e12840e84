//! 예약 작업 정의.
//!
//! OS 네이티브 스케줄러에 등록할 반복 백그라운드 작업 하나를 기술한다.
//! 동작은 없고 값만 가진다. 등록 상태는 OS 스케줄러가 소유하며 런처는 캐시하지 않는다.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// 반복 백그라운드 작업 정의
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTaskDefinition {
    /// 주기마다 실행할 바이너리 절대 경로
    pub executable_path: PathBuf,
    /// 실행마다 전달할 인자 (순서 유지)
    pub arguments: Vec<String>,
    /// 실행 사이 최소 간격. 백엔드는 올림만 허용한다.
    pub frequency: Duration,
    /// 네이티브 작업에 함께 저장되는 설명
    pub description: String,
    /// 네트워크가 없을 때 실행을 건너뛰라는 힌트
    pub network_sensitive: bool,
}

impl ScheduledTaskDefinition {
    /// 새 정의 생성. 인자/설명은 비어 있고 네트워크 힌트는 꺼져 있다.
    pub fn new(executable_path: impl Into<PathBuf>, frequency: Duration) -> Self {
        Self {
            executable_path: executable_path.into(),
            arguments: Vec::new(),
            frequency,
            description: String::new(),
            network_sensitive: false,
        }
    }

    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_network_sensitive(mut self, network_sensitive: bool) -> Self {
        self.network_sensitive = network_sensitive;
        self
    }

    /// 등록 직전 불변식 검증: 실행 파일이 존재하고 주기가 0보다 커야 한다.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.frequency.is_zero() {
            return Err(CoreError::validation("frequency", "0보다 커야 함"));
        }
        if !self.executable_path.is_absolute() {
            return Err(CoreError::validation(
                "executable_path",
                format!("절대 경로가 아님: {}", self.executable_path.display()),
            ));
        }
        if !self.executable_path.exists() {
            return Err(CoreError::validation(
                "executable_path",
                format!("파일 없음: {}", self.executable_path.display()),
            ));
        }
        Ok(())
    }
}

/// 요청 주기를 `granularity` 배수로 올림한다. 결과는 최소 `granularity` 이상.
///
/// 네이티브 스케줄러가 거친 단위만 지원할 때 "최소 N시간마다" 보장을 지키기 위해
/// 절대 내림하지 않는다.
pub fn round_up_to(requested: Duration, granularity: Duration) -> Duration {
    let unit = granularity.as_nanos().max(1);
    let units = requested.as_nanos().div_ceil(unit).max(1);
    let nanos = units.saturating_mul(unit);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}
