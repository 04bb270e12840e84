//! # graviton-scheduler
//!
//! OS 네이티브 작업 스케줄러 어댑터.
//! 하나의 [`TaskScheduler`] 계약 뒤에 서로 호환되지 않는 세 가지 메커니즘을 둔다.
//!
//! - Linux: 사용자 crontab (`crontab -l` / `crontab -`)
//! - Windows: 작업 스케줄러 (`schtasks /XML`), 일 단위 반복만 지원
//! - macOS: launchd LaunchAgent plist (`StartInterval`)
//! - 미지원 플랫폼: `probe()`가 `None` (에러가 아닌 정상 결과)

mod command;
pub mod cron;
pub mod launchd;
pub mod memory;
#[cfg(all(test, unix))]
mod testing;
pub mod windows;

pub use cron::CronTaskScheduler;
pub use launchd::LaunchdTaskScheduler;
pub use memory::InMemoryTaskScheduler;
pub use windows::WindowsTaskScheduler;

use graviton_core::platform::Platform;
use graviton_core::ports::task_scheduler::TaskScheduler;
use std::sync::Arc;

/// 현재 플랫폼의 스케줄러 탐지. 지원 백엔드가 없으면 `None`.
pub fn probe() -> Option<Arc<dyn TaskScheduler>> {
    probe_for(Platform::current())
}

/// 지정한 플랫폼의 백엔드 탐지 (네이티브 도구가 PATH에 있어야 함)
pub fn probe_for(platform: Platform) -> Option<Arc<dyn TaskScheduler>> {
    let scheduler: Option<Arc<dyn TaskScheduler>> = match platform {
        Platform::Linux => CronTaskScheduler::detect().map(shared),
        Platform::Windows => WindowsTaskScheduler::detect().map(shared),
        Platform::Mac => LaunchdTaskScheduler::detect().map(shared),
        Platform::Unknown => None,
    };

    match &scheduler {
        Some(s) => tracing::debug!(%platform, backend = s.backend(), "작업 스케줄러 탐지"),
        None => tracing::debug!(%platform, "작업 스케줄러 미지원"),
    }
    scheduler
}

fn shared<S: TaskScheduler + 'static>(scheduler: S) -> Arc<dyn TaskScheduler> {
    Arc::new(scheduler)
}
