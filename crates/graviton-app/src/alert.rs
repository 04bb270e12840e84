//! 프로세스 전역 에러 보고.
//!
//! tracing 로그와 stderr, Windows에서는 네이티브 메시지 상자로 알린다.
//! 보고 도중 발생한 2차 실패(패닉 포함)는 삼킨다.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use graviton_core::error::render_chain;
use graviton_core::ports::error_reporter::ErrorReporter;

static LOGGING_READY: AtomicBool = AtomicBool::new(false);

/// 로깅 구독자 설치 이후 호출. 그 전에는 에러를 stderr로도 직접 쓴다.
pub fn mark_logging_ready() {
    LOGGING_READY.store(true, Ordering::Release);
}

/// 네이티브 알림을 포함한 에러 보고자
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeErrorReporter;

impl ErrorReporter for NativeErrorReporter {
    fn log_error(&self, context: &str, error: &(dyn std::error::Error + 'static)) {
        let report = render_chain(error);
        swallow(|| {
            tracing::error!(error = %report, "{context}");
            // 격리 실행 분기에서는 구독자가 없다
            if !LOGGING_READY.load(Ordering::Acquire) {
                eprintln!("{context}: {report}");
            }
        });
    }

    fn show_fatal_alert(&self, title: &str, detail: &str) {
        swallow(|| {
            tracing::error!(detail, "{title}");
            eprintln!("{title}\n{detail}");
            platform_alert(title, detail);
        });
    }
}

fn swallow(report: impl FnOnce()) {
    let _ = panic::catch_unwind(AssertUnwindSafe(report));
}

#[cfg(windows)]
fn platform_alert(title: &str, detail: &str) {
    use windows_sys::Win32::UI::WindowsAndMessaging::{MessageBoxW, MB_ICONERROR, MB_OK};

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    let title = wide(title);
    let text = wide(detail);
    // SAFETY: 두 버퍼 모두 NUL 종료 UTF-16이며 호출 동안 살아 있다
    unsafe {
        MessageBoxW(
            std::ptr::null_mut(),
            text.as_ptr(),
            title.as_ptr(),
            MB_OK | MB_ICONERROR,
        );
    }
}

#[cfg(not(windows))]
fn platform_alert(_title: &str, _detail: &str) {}
