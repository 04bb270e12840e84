//! 운영체제별 설정.
//!
//! 런처 실행 파일 위치, 클래스패스 구분자, 공유 시스템 경로,
//! 백그라운드 업데이트 기본 주기를 플랫폼마다 정의한다.
//! 테스트는 `Platform` 값을 직접 주입하여 다른 OS의 동작을 검증한다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 브랜드 이름 (로그/알림/작업 설명에 사용)
pub const APP_BRAND_NAME: &str = "Graviton";

const HOUR: u64 = 60 * 60;

/// 지원 운영체제
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Mac,
    Windows,
    Linux,
    Unknown,
}

impl Platform {
    /// 현재 빌드 대상 운영체제
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::Mac
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Unknown
        }
    }

    /// 클래스패스 문자열의 항목 구분자
    pub fn classpath_delimiter(self) -> char {
        match self {
            Platform::Windows => ';',
            _ => ':',
        }
    }

    /// 설치 디렉토리 기준 런처 실행 파일 경로. 알 수 없는 OS면 `None`.
    pub fn launcher_executable(self, install_dir: &Path) -> Option<PathBuf> {
        match self {
            Platform::Mac => Some(install_dir.join("MacOS").join("Graviton Browser")),
            Platform::Windows => Some(install_dir.join("GravitonBrowser.exe")),
            Platform::Linux => Some(install_dir.join("GravitonBrowser")),
            Platform::Unknown => None,
        }
    }

    /// 백그라운드 업데이트 작업 기본 주기.
    ///
    /// Windows 작업 스케줄러는 일 단위 미만 반복을 만들 수 없어 24시간,
    /// 나머지는 하루 네 번(6시간).
    pub fn default_update_frequency(self) -> Duration {
        match self {
            Platform::Windows => Duration::from_secs(24 * HOUR),
            _ => Duration::from_secs(6 * HOUR),
        }
    }

    /// 격리 실행 프로그램에 공유되는 시스템 실행 파일 디렉토리
    pub fn system_search_path(self) -> Vec<PathBuf> {
        match self {
            Platform::Windows => {
                let root = std::env::var_os("SystemRoot")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(r"C:\Windows"));
                vec![root.join("System32"), root]
            }
            Platform::Mac | Platform::Linux | Platform::Unknown => {
                vec![PathBuf::from("/usr/bin"), PathBuf::from("/bin")]
            }
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Mac => "macos",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
