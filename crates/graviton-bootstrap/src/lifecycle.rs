//! 첫 실행 / 마지막 실행 라이프사이클.
//!
//! 시작 시 마커 파일로 첫 실행(또는 등록 재시도)을 감지하여 백그라운드 업데이트 작업을
//! OS 스케줄러에 등록하고, 제거 시 해제한다. 작업 예약은 최선 노력이다.
//!
//! ## 시작 점검 흐름 (백그라운드 스레드)
//! 1. 버전 마커가 없거나 에러 로그가 있으면 첫 실행
//! 2. 첫 실행이면 스케줄러 탐색 → 없으면 로그만 남기고 종료
//! 3. 등록 성공 시 에러 로그 삭제, 실패 시 에러 체인을 에러 로그에 기록
//! 4. 결과와 무관하게 현재 버전을 버전 마커에 기록

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use graviton_core::config::{LauncherConfig, BACKGROUND_UPDATE_FLAG};
use graviton_core::error::CoreError;
use graviton_core::models::task::ScheduledTaskDefinition;
use graviton_core::platform::Platform;
use graviton_core::ports::task_scheduler::TaskScheduler;

use crate::markers::LifecycleMarkers;

/// 네이티브 작업에 저장되는 설명
pub const TASK_DESCRIPTION: &str =
    "Graviton background upgrade task. If you disable this, Graviton Browser may become insecure.";

/// 시작 점검 스레드 이름
const STARTUP_THREAD_NAME: &str = "graviton-startup-checks";

/// 필요할 때마다 스케줄러 백엔드를 찾는 함수
pub type SchedulerProbe = Box<dyn Fn() -> Option<Arc<dyn TaskScheduler>> + Send + Sync>;

/// 항상 같은 백엔드를 돌려주는 probe
pub fn fixed_probe(scheduler: Arc<dyn TaskScheduler>) -> SchedulerProbe {
    Box::new(move || Some(Arc::clone(&scheduler)))
}

/// 스케줄러가 없는 OS를 흉내 내는 probe
pub fn no_scheduler() -> SchedulerProbe {
    Box::new(|| None::<Arc<dyn TaskScheduler>>)
}

/// 시작 점검 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupCheckOutcome {
    /// 이미 점검을 마친 설치 (스케줄러 호출 없음)
    AlreadyChecked,
    /// 설정에서 예약 작업이 꺼져 있음
    SchedulingDisabled,
    /// 이 OS에서 지원하는 스케줄러가 없음
    SchedulerUnavailable,
    /// 등록 성공
    Registered {
        backend: String,
        native_interval: Duration,
    },
    /// 등록 실패 (에러 로그 마커에 기록됨)
    RegistrationFailed { report: String },
}

/// 라이프사이클 관리자
pub struct LifecycleManager {
    install_dir: PathBuf,
    platform: Platform,
    task_name: String,
    frequency: Duration,
    scheduling_enabled: bool,
    markers: LifecycleMarkers,
    probe: SchedulerProbe,
}

impl LifecycleManager {
    /// 설치 디렉토리와 설정으로 생성. 마커는 `paths.state_dir`(없으면 설치 디렉토리)에 둔다.
    pub fn new(
        install_dir: impl Into<PathBuf>,
        platform: Platform,
        config: &LauncherConfig,
        probe: SchedulerProbe,
    ) -> Self {
        let install_dir = install_dir.into();
        let markers = LifecycleMarkers::new(config.state_dir(&install_dir));
        Self {
            install_dir,
            platform,
            task_name: config.scheduler.task_name.clone(),
            frequency: config.update_frequency(platform),
            scheduling_enabled: config.scheduler.enabled,
            markers,
            probe,
        }
    }

    pub fn markers(&self) -> &LifecycleMarkers {
        &self.markers
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// 설치된 런처를 `--background-update`로 주기 실행하는 작업 정의.
    /// 런처 위치를 모르는 OS면 `None`.
    pub fn task_definition(&self) -> Option<ScheduledTaskDefinition> {
        let executable = self.platform.launcher_executable(&self.install_dir)?;
        Some(
            ScheduledTaskDefinition::new(executable, self.frequency)
                .with_arguments([BACKGROUND_UPDATE_FLAG])
                .with_description(TASK_DESCRIPTION)
                .with_network_sensitive(true),
        )
    }

    /// 백그라운드 스레드에서 시작 점검 실행.
    ///
    /// 에러는 스레드 안에서 로그로 남기며, 결과는 join으로 받을 수 있다.
    pub fn on_startup(
        self: &Arc<Self>,
        current_version: u32,
    ) -> Result<JoinHandle<Result<StartupCheckOutcome, CoreError>>, CoreError> {
        let manager = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(STARTUP_THREAD_NAME.to_string())
            .spawn(move || {
                let result = manager.run_startup_checks(current_version);
                if let Err(e) = &result {
                    error!(error = %e.report_chain(), "백그라운드 시작 점검 실패");
                }
                result
            })?;
        Ok(handle)
    }

    /// 시작 점검 (호출 스레드에서 동기 실행)
    pub fn run_startup_checks(
        &self,
        current_version: u32,
    ) -> Result<StartupCheckOutcome, CoreError> {
        let outcome = if self.markers.needs_first_run()? {
            self.first_run()?
        } else {
            debug!(version = current_version, "시작 점검 완료된 설치");
            StartupCheckOutcome::AlreadyChecked
        };

        // 재시도 여부는 에러 로그만으로 결정되므로 버전은 항상 기록
        self.markers.write_last_run_version(current_version)?;
        Ok(outcome)
    }

    fn first_run(&self) -> Result<StartupCheckOutcome, CoreError> {
        if !self.scheduling_enabled {
            info!("첫 실행 — 설정에 따라 예약 작업 등록 생략");
            return Ok(StartupCheckOutcome::SchedulingDisabled);
        }
        info!("첫 실행 — 백그라운드 업데이트 작업 등록 시도");

        let Some(scheduler) = (self.probe)() else {
            info!(platform = %self.platform, "이 OS는 작업 예약을 지원하지 않음");
            return Ok(StartupCheckOutcome::SchedulerUnavailable);
        };
        let Some(definition) = self.task_definition() else {
            info!(platform = %self.platform, "런처 실행 파일 위치를 알 수 없음");
            return Ok(StartupCheckOutcome::SchedulerUnavailable);
        };

        match scheduler.register(&self.task_name, &definition) {
            Ok(()) => {
                if self.markers.clear_error_log()? {
                    debug!("이전 등록 실패 마커 삭제");
                }
                let native_interval = scheduler.native_interval(definition.frequency);
                info!(
                    task = %self.task_name,
                    backend = scheduler.backend(),
                    interval_secs = native_interval.as_secs(),
                    "백그라운드 작업 등록 성공"
                );
                Ok(StartupCheckOutcome::Registered {
                    backend: scheduler.backend().to_string(),
                    native_interval,
                })
            }
            Err(e) => {
                let report = e.report_chain();
                self.markers.write_error_log(&report)?;
                error!(
                    task = %self.task_name,
                    error = %report,
                    "백그라운드 작업 등록 실패 — 다음 시작 시 재시도"
                );
                Ok(StartupCheckOutcome::RegistrationFailed { report })
            }
        }
    }

    /// 제거 시 예약 작업 해제. 실패해도 제거 흐름을 막지 않도록 로그만 남긴다.
    pub fn on_uninstall(&self) {
        info!("제거 요청 — 예약 작업 해제");
        let Some(scheduler) = (self.probe)() else {
            info!(platform = %self.platform, "이 OS는 작업 예약을 지원하지 않음");
            return;
        };
        match scheduler.deregister(&self.task_name) {
            Ok(()) => info!(task = %self.task_name, "예약 작업 해제 완료"),
            Err(e) => warn!(error = %e.report_chain(), "예약 작업 해제 실패 — 무시"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use graviton_scheduler::InMemoryTaskScheduler;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    /// Linux 레이아웃의 가짜 설치 디렉토리
    fn install_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("GravitonBrowser"), "").unwrap();
        dir
    }

    fn manager_with(
        dir: &TempDir,
        config: &LauncherConfig,
        scheduler: &Arc<InMemoryTaskScheduler>,
    ) -> LifecycleManager {
        LifecycleManager::new(
            dir.path(),
            Platform::Linux,
            config,
            fixed_probe(scheduler.clone()),
        )
    }

    struct FailingDeregister;

    impl TaskScheduler for FailingDeregister {
        fn backend(&self) -> &str {
            "failing"
        }
        fn native_interval(&self, requested: Duration) -> Duration {
            requested
        }
        fn register(&self, _: &str, _: &ScheduledTaskDefinition) -> Result<(), CoreError> {
            Ok(())
        }
        fn deregister(&self, name: &str) -> Result<(), CoreError> {
            Err(CoreError::SchedulerDeregistration {
                task: name.to_string(),
                reason: "서비스 없음".to_string(),
            })
        }
    }

    #[test]
    fn definition_points_at_installed_launcher() {
        let dir = install_dir();
        let scheduler = Arc::new(InMemoryTaskScheduler::new());
        let manager = manager_with(&dir, &LauncherConfig::default_config(), &scheduler);
        let def = manager.task_definition().unwrap();
        assert_eq!(def.executable_path, dir.path().join("GravitonBrowser"));
        assert_eq!(def.arguments, vec![BACKGROUND_UPDATE_FLAG.to_string()]);
        assert_eq!(def.frequency, HOUR * 6);
        assert!(def.network_sensitive);
    }

    #[test]
    fn windows_default_frequency_is_one_day() {
        let manager = LifecycleManager::new(
            "C:\\Graviton",
            Platform::Windows,
            &LauncherConfig::default_config(),
            no_scheduler(),
        );
        assert_eq!(manager.task_definition().unwrap().frequency, HOUR * 24);
    }

    #[test]
    fn first_run_registers_and_records_version() {
        let dir = install_dir();
        let scheduler = Arc::new(InMemoryTaskScheduler::new());
        let manager = manager_with(&dir, &LauncherConfig::default_config(), &scheduler);

        let outcome = manager.run_startup_checks(5).unwrap();
        assert_matches!(
            outcome,
            StartupCheckOutcome::Registered { ref backend, .. } if backend == "memory"
        );
        assert!(scheduler.task("app.graviton.update").is_some());
        assert_eq!(manager.markers().last_run_version().unwrap(), Some(5));
        assert!(!manager.markers().has_error_log());
    }

    #[test]
    fn checked_install_never_probes() {
        let dir = install_dir();
        let probes = Arc::new(AtomicUsize::new(0));
        let counter = probes.clone();
        let manager = LifecycleManager::new(
            dir.path(),
            Platform::Linux,
            &LauncherConfig::default_config(),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                None::<Arc<dyn TaskScheduler>>
            }),
        );
        manager.markers().write_last_run_version(2).unwrap();

        assert_eq!(
            manager.run_startup_checks(3).unwrap(),
            StartupCheckOutcome::AlreadyChecked
        );
        assert_eq!(probes.load(Ordering::SeqCst), 0);
        assert_eq!(manager.markers().last_run_version().unwrap(), Some(3));
    }

    #[test]
    fn missing_scheduler_is_not_an_error() {
        let dir = install_dir();
        let manager = LifecycleManager::new(
            dir.path(),
            Platform::Linux,
            &LauncherConfig::default_config(),
            no_scheduler(),
        );
        assert_eq!(
            manager.run_startup_checks(1).unwrap(),
            StartupCheckOutcome::SchedulerUnavailable
        );
        assert_eq!(manager.markers().last_run_version().unwrap(), Some(1));
        assert!(!manager.markers().has_error_log());
    }

    #[test]
    fn unknown_platform_skips_registration() {
        let dir = install_dir();
        let scheduler = Arc::new(InMemoryTaskScheduler::new());
        let manager = LifecycleManager::new(
            dir.path(),
            Platform::Unknown,
            &LauncherConfig::default_config(),
            fixed_probe(scheduler.clone()),
        );
        assert_eq!(
            manager.run_startup_checks(1).unwrap(),
            StartupCheckOutcome::SchedulerUnavailable
        );
        assert_eq!(scheduler.register_calls(), 0);
    }

    #[test]
    fn disabled_scheduling_skips_registration() {
        let dir = install_dir();
        let scheduler = Arc::new(InMemoryTaskScheduler::new());
        let mut config = LauncherConfig::default_config();
        config.scheduler.enabled = false;
        let manager = manager_with(&dir, &config, &scheduler);
        assert_eq!(
            manager.run_startup_checks(1).unwrap(),
            StartupCheckOutcome::SchedulingDisabled
        );
        assert_eq!(scheduler.register_calls(), 0);
        assert_eq!(manager.markers().last_run_version().unwrap(), Some(1));
    }

    #[test]
    fn failure_is_persisted_then_retried() {
        let dir = install_dir();
        let scheduler = Arc::new(InMemoryTaskScheduler::new());
        let manager = manager_with(&dir, &LauncherConfig::default_config(), &scheduler);

        scheduler.set_registration_failure(Some("접근 거부"));
        let outcome = manager.run_startup_checks(1).unwrap();
        assert_matches!(
            outcome,
            StartupCheckOutcome::RegistrationFailed { ref report } if report.contains("접근 거부")
        );
        let log = manager.markers().read_error_log().unwrap().unwrap();
        assert!(log.contains("접근 거부"));
        assert_eq!(manager.markers().last_run_version().unwrap(), Some(1));

        scheduler.set_registration_failure(None);
        assert_matches!(
            manager.run_startup_checks(1).unwrap(),
            StartupCheckOutcome::Registered { .. }
        );
        assert_eq!(scheduler.register_calls(), 2);
        assert!(!manager.markers().has_error_log());
    }

    #[test]
    fn state_dir_override_holds_markers() {
        let dir = install_dir();
        let state = TempDir::new().unwrap();
        let scheduler = Arc::new(InMemoryTaskScheduler::new());
        let mut config = LauncherConfig::default_config();
        config.paths.state_dir = Some(state.path().to_path_buf());
        let manager = manager_with(&dir, &config, &scheduler);

        manager.run_startup_checks(9).unwrap();
        assert!(state.path().join(crate::markers::LAST_RUN_VERSION_FILE).exists());
        assert!(!dir.path().join(crate::markers::LAST_RUN_VERSION_FILE).exists());
    }

    #[test]
    fn on_startup_runs_in_background() {
        let dir = install_dir();
        let scheduler = Arc::new(InMemoryTaskScheduler::new());
        let manager = Arc::new(manager_with(
            &dir,
            &LauncherConfig::default_config(),
            &scheduler,
        ));
        let handle = manager.on_startup(4).unwrap();
        assert_eq!(handle.thread().name(), Some(STARTUP_THREAD_NAME));
        let outcome = handle.join().unwrap().unwrap();
        assert_matches!(outcome, StartupCheckOutcome::Registered { .. });
        assert_eq!(scheduler.register_calls(), 1);
    }

    #[test]
    fn uninstall_deregisters_known_task() {
        let dir = install_dir();
        let scheduler = Arc::new(InMemoryTaskScheduler::new());
        let manager = manager_with(&dir, &LauncherConfig::default_config(), &scheduler);
        manager.run_startup_checks(1).unwrap();

        manager.on_uninstall();
        assert_eq!(scheduler.deregister_calls(), 1);
        assert_eq!(scheduler.task_count(), 0);
    }

    #[test]
    fn uninstall_swallows_failures() {
        let manager = LifecycleManager::new(
            "/opt/graviton",
            Platform::Linux,
            &LauncherConfig::default_config(),
            fixed_probe(Arc::new(FailingDeregister)),
        );
        manager.on_uninstall();

        let without = LifecycleManager::new(
            "/opt/graviton",
            Platform::Linux,
            &LauncherConfig::default_config(),
            no_scheduler(),
        );
        without.on_uninstall();
    }
}
