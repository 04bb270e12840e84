//! 라이프사이클 마커 파일.
//!
//! 설치(또는 상태) 디렉토리의 두 파일:
//! - `last-run-version`: 시작 점검을 마친 마지막 버전 (정수 한 줄)
//! - `task-scheduler-error-log.txt`: 마지막 예약 작업 등록이 실패했을 때만 존재
//!
//! 버전 마커가 없거나 에러 로그가 있으면 첫 실행으로 취급한다.
//! 버전 마커는 임시 파일에 쓴 뒤 rename하여 부분 쓰기를 남기지 않는다.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use graviton_core::error::CoreError;

/// 마지막 실행 버전 마커 파일 이름
pub const LAST_RUN_VERSION_FILE: &str = "last-run-version";

/// 예약 작업 등록 실패 마커 파일 이름
pub const ERROR_LOG_FILE: &str = "task-scheduler-error-log.txt";

/// 마커 디렉토리 핸들
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleMarkers {
    dir: PathBuf,
}

impl LifecycleMarkers {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn version_path(&self) -> PathBuf {
        self.dir.join(LAST_RUN_VERSION_FILE)
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.dir.join(ERROR_LOG_FILE)
    }

    /// 버전 마커가 없거나 에러 로그가 있으면 `true`
    pub fn needs_first_run(&self) -> Result<bool, CoreError> {
        Ok(self.last_run_version()?.is_none() || self.has_error_log())
    }

    /// 마지막 실행 버전. 파일이 없으면 `None`.
    ///
    /// 내용을 숫자로 읽을 수 없으면 경고 후 `None` (다시 첫 실행으로 처리).
    pub fn last_run_version(&self) -> Result<Option<u32>, CoreError> {
        let path = self.version_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match content.trim().parse::<u32>() {
            Ok(version) => Ok(Some(version)),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "버전 마커 손상 — 첫 실행으로 처리"
                );
                Ok(None)
            }
        }
    }

    /// 버전 마커 기록 (임시 파일 → rename)
    pub fn write_last_run_version(&self, version: u32) -> Result<(), CoreError> {
        fs::create_dir_all(&self.dir)?;
        let target = self.version_path();
        let temp = self.dir.join(format!("{LAST_RUN_VERSION_FILE}.tmp"));
        fs::write(&temp, format!("{version}\n"))?;
        if let Err(e) = fs::rename(&temp, &target) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    pub fn has_error_log(&self) -> bool {
        self.error_log_path().exists()
    }

    /// 에러 로그 내용. 파일이 없으면 `None`.
    pub fn read_error_log(&self) -> Result<Option<String>, CoreError> {
        match fs::read_to_string(self.error_log_path()) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 에러 로그 기록 (기존 내용 덮어씀)
    pub fn write_error_log(&self, report: &str) -> Result<(), CoreError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.error_log_path(), report)?;
        Ok(())
    }

    /// 에러 로그 삭제. 지운 파일이 있으면 `true`.
    pub fn clear_error_log(&self) -> Result<bool, CoreError> {
        match fs::remove_file(self.error_log_path()) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
