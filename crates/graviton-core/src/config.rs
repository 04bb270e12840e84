//! 런처 설정 구조체.
//!
//! 로그 레벨, 백그라운드 업데이트 예약 작업, 상태 디렉토리 등 런타임 설정을 정의한다.
//! `config` crate를 통해 파일/환경변수에서 로드 ([`crate::config_manager`]).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CoreError;
use crate::platform::Platform;

/// 백그라운드 업데이트 예약 작업의 고정 이름
pub const DEFAULT_TASK_NAME: &str = "app.graviton.update";

/// 예약 작업 실행 시 전달하는 플래그
pub const BACKGROUND_UPDATE_FLAG: &str = "--background-update";

/// 주기 재정의 상한 (366일)
pub const MAX_FREQUENCY_HOURS: u64 = 24 * 366;

/// 최상위 런처 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 백그라운드 업데이트 예약 작업 설정
    pub scheduler: SchedulerConfig,
    /// 경로 설정
    pub paths: PathsConfig,
}

/// 예약 작업 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// 첫 실행 시 예약 작업 등록 여부
    pub enabled: bool,
    /// 네이티브 스케줄러에 등록되는 작업 이름
    pub task_name: String,
    /// 주기 재정의 (시간). 없으면 플랫폼 기본값.
    pub frequency_hours: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            task_name: DEFAULT_TASK_NAME.to_string(),
            frequency_hours: None,
        }
    }
}

/// 경로 설정
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// 라이프사이클 마커 디렉토리. 없으면 설치 디렉토리.
    pub state_dir: Option<PathBuf>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl LauncherConfig {
    /// 기본 설정
    pub fn default_config() -> Self {
        Self {
            log_level: "info".to_string(),
            scheduler: SchedulerConfig::default(),
            paths: PathsConfig::default(),
        }
    }

    /// 예약 작업 주기 (재정의가 없으면 플랫폼 기본값)
    pub fn update_frequency(&self, platform: Platform) -> Duration {
        match self.scheduler.frequency_hours {
            Some(hours) => Duration::from_secs(hours.saturating_mul(60 * 60)),
            None => platform.default_update_frequency(),
        }
    }

    /// 마커 파일을 둘 디렉토리
    pub fn state_dir(&self, install_dir: &Path) -> PathBuf {
        self.paths
            .state_dir
            .clone()
            .unwrap_or_else(|| install_dir.to_path_buf())
    }

    /// 값 범위 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.scheduler.task_name.trim().is_empty() {
            return Err(CoreError::validation("scheduler.task_name", "비어 있음"));
        }
        if self.scheduler.frequency_hours == Some(0) {
            return Err(CoreError::validation(
                "scheduler.frequency_hours",
                "0보다 커야 함",
            ));
        }
        if let Some(hours) = self.scheduler.frequency_hours {
            if hours > MAX_FREQUENCY_HOURS {
                return Err(CoreError::validation(
                    "scheduler.frequency_hours",
                    format!("{MAX_FREQUENCY_HOURS}시간 이하여야 함"),
                ));
            }
        }
        const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.as_str()) {
            return Err(CoreError::validation(
                "log_level",
                format!("알 수 없는 레벨: {}", self.log_level),
            ));
        }
        Ok(())
    }
}
