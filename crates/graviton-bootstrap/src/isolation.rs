//! 격리 실행.
//!
//! 다른 런처 인스턴스가 내려받은 프로그램을 런처 내부와 분리된 환경에서 실행한다.
//! 격리 경계는 프로세스다. 프로그램은 클래스패스 항목과 시스템 디렉토리만 `PATH`로 보고,
//! 최소 공유 환경 외에는 런처의 환경 변수(`GRAVITON_*`, 런처 `PATH` 등)를 물려받지 않는다.
//!
//! ## 실행 흐름
//! 1. 클래스패스 문자열을 플랫폼 구분자로 나누고 모든 항목의 존재를 확인
//! 2. 진입점 이름을 항목 순서대로 해석 (디렉토리 안의 실행 파일, 또는 stem이 같은 파일 항목)
//! 3. `main` 이름의 전용 스레드에서 `env_clear()` 후 프로그램 시작
//! 4. 호출자는 [`IsolatedExecution::wait`]로 프로그램 종료 코드를 받는다

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::thread::{self, JoinHandle};

use graviton_core::error::CoreError;
use graviton_core::platform::Platform;

/// 격리 실행 스레드 이름
pub const EXECUTION_THREAD_NAME: &str = "main";

/// 실행 준비가 실패해 프로그램을 시작하지 못했을 때의 종료 코드
pub const ABORTED_EXIT_CODE: i32 = 1;

/// 검증을 마친 격리 실행 컨텍스트
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    entries: Vec<PathBuf>,
    base_environment: Vec<(OsString, OsString)>,
    platform: Platform,
}

impl ExecutionContext {
    /// 클래스패스 항목 (입력 순서 유지)
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// 프로그램에 보이는 `PATH`: 디렉토리 항목 다음에 시스템 디렉토리
    pub fn search_path(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .entries
            .iter()
            .filter(|entry| entry.is_dir())
            .cloned()
            .collect();
        dirs.extend(self.platform.system_search_path());
        dirs
    }

    /// 진입점 이름을 실행 파일 경로로 해석.
    ///
    /// 컨텍스트 밖을 가리키는 이름(경로 구분자, `.`/`..`)은 거부한다.
    pub fn resolve_entry_point(&self, name: &str) -> Result<PathBuf, CoreError> {
        let not_found = || CoreError::EntryPointNotFound {
            name: name.to_string(),
        };
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(not_found());
        }

        let file_name = self.executable_file_name(name);
        for entry in &self.entries {
            let candidate = if entry.is_dir() {
                entry.join(&file_name)
            } else if entry.file_stem() == Some(OsStr::new(name)) {
                entry.clone()
            } else {
                continue;
            };
            if is_invocable(&candidate) {
                return Ok(candidate);
            }
        }
        Err(not_found())
    }

    fn executable_file_name(&self, name: &str) -> String {
        match self.platform {
            Platform::Windows => format!("{name}.exe"),
            _ => name.to_string(),
        }
    }
}

/// 격리 실행 컨텍스트 생성 및 실행기
#[derive(Debug, Clone, Copy)]
pub struct IsolatedExecutionLoader {
    platform: Platform,
}

impl Default for IsolatedExecutionLoader {
    fn default() -> Self {
        Self::new(Platform::current())
    }
}

impl IsolatedExecutionLoader {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    /// 클래스패스 문자열로 컨텍스트 생성.
    ///
    /// 존재하지 않는 항목이 하나라도 있으면 건너뛰지 않고 `ClasspathEntryNotFound`로 실패한다.
    /// 빈 구간(`a::b`, 끝 구분자)은 무시한다.
    pub fn build_context(
        &self,
        classpath: &str,
        base_environment: &[(OsString, OsString)],
    ) -> Result<ExecutionContext, CoreError> {
        let mut entries = Vec::new();
        for raw in classpath.split(self.platform.classpath_delimiter()) {
            if raw.is_empty() {
                continue;
            }
            let path = PathBuf::from(raw);
            if !path.exists() {
                return Err(CoreError::ClasspathEntryNotFound { path });
            }
            entries.push(path);
        }

        tracing::debug!(entries = entries.len(), "격리 실행 컨텍스트 생성");
        Ok(ExecutionContext {
            entries,
            base_environment: base_environment.to_vec(),
            platform: self.platform,
        })
    }

    /// 진입점을 해석하고 전용 스레드에서 프로그램 시작.
    ///
    /// 진입점 해석 실패는 즉시 `EntryPointNotFound`로 반환한다.
    /// 프로그램 자체의 시작/실행 실패는 [`IsolatedExecution::wait`]에서 그대로 드러난다.
    pub fn run<I, S>(
        &self,
        context: &ExecutionContext,
        entry_point: &str,
        arguments: I,
    ) -> Result<IsolatedExecution, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = context.resolve_entry_point(entry_point)?;
        let search_path = std::env::join_paths(context.search_path())
            .map_err(|e| CoreError::Internal(format!("PATH 구성 실패: {e}")))?;

        let mut command = Command::new(&program);
        command
            .args(arguments)
            .env_clear()
            .envs(context.base_environment.iter().map(|(k, v)| (k, v)))
            .env("PATH", search_path);

        let handle = thread::Builder::new()
            .name(EXECUTION_THREAD_NAME.to_string())
            .spawn(move || command.status())?;

        Ok(IsolatedExecution {
            program: Some(program),
            handle: Some(handle),
        })
    }
}

/// 실행 중인 (또는 시작하지 못한) 격리 프로그램
#[derive(Debug)]
pub struct IsolatedExecution {
    program: Option<PathBuf>,
    handle: Option<JoinHandle<io::Result<ExitStatus>>>,
}

impl IsolatedExecution {
    /// 준비 단계에서 실패해 아무것도 시작하지 않은 실행
    pub fn aborted() -> Self {
        Self {
            program: None,
            handle: None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.handle.is_none()
    }

    /// 실행 중인 프로그램 경로
    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }

    /// 프로그램 종료까지 대기 후 종료 코드 반환
    pub fn wait(self) -> Result<i32, CoreError> {
        let Some(handle) = self.handle else {
            return Ok(ABORTED_EXIT_CODE);
        };
        let status = handle
            .join()
            .map_err(|_| CoreError::Internal("격리 실행 스레드 패닉".to_string()))??;
        Ok(exit_code(status))
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    ABORTED_EXIT_CODE
}

#[cfg(unix)]
fn is_invocable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_invocable(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"))
}
