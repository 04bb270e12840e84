//! 부트스트랩 환경 스냅샷.
//!
//! 프로세스 진입 시 환경 변수를 한 번만 읽어 명시적인 구조체로 만든다.
//! 격리 실행 요청은 환경 변수로만 전달되므로 URL이나 명령줄 인자로는 위조할 수 없다.
//! 이후 코드는 전역 환경을 다시 읽지 않고 이 값을 인자로 받는다.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

/// 격리 실행 클래스패스 변수
pub const RUN_CLASSPATH_VAR: &str = "GRAVITON_RUN_CP";
/// 격리 실행 진입점 변수
pub const RUN_ENTRY_POINT_VAR: &str = "GRAVITON_RUN_CLASSNAME";
/// 네이티브 설치 경로 (설치 프로그램의 부트스트래퍼가 설정)
pub const INSTALL_PATH_VAR: &str = "GRAVITON_PATH";
/// 현재 버전 (부트스트래퍼가 설정하는 정수)
pub const INSTALL_VERSION_VAR: &str = "GRAVITON_VERSION";

/// 격리 프로그램에 넘겨도 되는 최소 공유 환경 변수
const SHARED_BASE_VARS: &[&str] = &[
    "HOME",
    "USER",
    "LOGNAME",
    "LANG",
    "LC_ALL",
    "TZ",
    "TMPDIR",
    "TEMP",
    "TMP",
    "DISPLAY",
    "WAYLAND_DISPLAY",
    "XDG_RUNTIME_DIR",
    "USERPROFILE",
    "APPDATA",
    "LOCALAPPDATA",
    "SystemRoot",
    "SYSTEMROOT",
    "windir",
    "COMSPEC",
    "PATHEXT",
];

/// 다른 런처 인스턴스가 요청한 격리 실행
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolatedRunRequest {
    /// 플랫폼 구분자로 이어진 파일/디렉토리 목록
    pub classpath: String,
    /// 실행할 진입점 이름
    pub entry_point: String,
}

/// 네이티브 설치 정보
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallInfo {
    pub path: PathBuf,
    pub version: u32,
}

/// 프로세스 시작 시 한 번 캡처한 부트스트랩 입력
#[derive(Debug, Clone, Default)]
pub struct BootstrapEnv {
    /// 격리 실행 요청 (두 변수가 모두 비어 있지 않을 때만)
    pub isolated_run: Option<IsolatedRunRequest>,
    /// 설치 정보 (설치본으로 실행될 때만)
    pub install: Option<InstallInfo>,
    /// 격리 프로그램에 전달할 최소 공유 환경
    pub base_environment: Vec<(OsString, OsString)>,
}

impl BootstrapEnv {
    /// 현재 프로세스 환경에서 캡처
    pub fn from_process_env() -> Self {
        Self::from_vars(std::env::vars_os())
    }

    /// 임의의 변수 목록에서 캡처 (테스트용 주입 지점)
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let mut classpath = None;
        let mut entry_point = None;
        let mut install_path = None;
        let mut install_version = None;
        let mut base_environment = Vec::new();

        for (key, value) in vars {
            let key: OsString = key.into();
            let value: OsString = value.into();
            match key.to_str() {
                Some(RUN_CLASSPATH_VAR) => classpath = non_empty(&value),
                Some(RUN_ENTRY_POINT_VAR) => entry_point = non_empty(&value),
                Some(INSTALL_PATH_VAR) => install_path = non_empty(&value),
                Some(INSTALL_VERSION_VAR) => install_version = non_empty(&value),
                Some(name) if SHARED_BASE_VARS.contains(&name) => {
                    base_environment.push((key, value));
                }
                _ => {}
            }
        }

        let isolated_run = match (classpath, entry_point) {
            (Some(classpath), Some(entry_point)) => Some(IsolatedRunRequest {
                classpath,
                entry_point,
            }),
            _ => None,
        };

        let install = match (install_path, install_version) {
            (Some(path), Some(raw)) => match raw.trim().parse::<u32>() {
                Ok(version) => Some(InstallInfo {
                    path: PathBuf::from(path),
                    version,
                }),
                Err(e) => {
                    tracing::warn!(
                        value = %raw,
                        error = %e,
                        "{INSTALL_VERSION_VAR} 파싱 실패 — 무시"
                    );
                    None
                }
            },
            _ => None,
        };

        Self {
            isolated_run,
            install,
            base_environment,
        }
    }
}

fn non_empty(value: &OsStr) -> Option<String> {
    let s = value.to_string_lossy();
    if s.trim().is_empty() {
        None
    } else {
        Some(s.into_owned())
    }
}
