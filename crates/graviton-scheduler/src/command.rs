//! 네이티브 스케줄러 도구 실행 헬퍼.

use std::ffi::OsStr;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// 도구 실행 후 출력 수집. 실행 자체가 실패하면 사유 문자열.
pub(crate) fn run<I, S>(program: &Path, args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| format!("{} 실행 실패: {e}", program.display()))
}

/// 표준 입력으로 내용을 넘기며 실행
pub(crate) fn run_with_stdin<I, S>(program: &Path, args: I, input: &str) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("{} 실행 실패: {e}", program.display()))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .map_err(|e| format!("{} 입력 전달 실패: {e}", program.display()))?;
    }

    child
        .wait_with_output()
        .map_err(|e| format!("{} 대기 실패: {e}", program.display()))
}

/// 실패한 실행의 종료 코드와 stderr 요약
pub(crate) fn describe_failure(program: &Path, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("{} 종료 상태 {}", program.display(), output.status)
    } else {
        format!("{} 종료 상태 {}: {stderr}", program.display(), output.status)
    }
}
