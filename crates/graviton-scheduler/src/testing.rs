//! 테스트용 가짜 네이티브 도구.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// ETXTBSY
const TEXT_FILE_BUSY: i32 = 26;

/// 실행 가능한 `/bin/sh` 스크립트 작성. `--ready` 인자에는 바로 종료한다.
///
/// 다른 테스트 스레드의 fork가 쓰기 핸들을 물고 있으면 실행이 ETXTBSY로 실패하므로
/// 실행 가능해질 때까지 기다린 뒤 돌려준다.
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(
        &path,
        format!("#!/bin/sh\n[ \"$1\" = \"--ready\" ] && exit 0\n{body}"),
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

    for _ in 0..50 {
        match Command::new(&path).arg("--ready").status() {
            Err(e) if e.raw_os_error() == Some(TEXT_FILE_BUSY) => {
                std::thread::sleep(Duration::from_millis(20));
            }
            _ => break,
        }
    }
    path
}
