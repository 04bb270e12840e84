//! # graviton-app
//!
//! Graviton 런처 바이너리 진입점.
//! 시작 분기 → (격리 실행 | 일반 시작) → 백그라운드 시작 점검.

mod alert;

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use graviton_bootstrap::dispatcher::{BootstrapDispatcher, DispatchOutcome};
use graviton_bootstrap::isolation::IsolatedExecutionLoader;
use graviton_bootstrap::lifecycle::LifecycleManager;
use graviton_core::config_manager::ConfigManager;
use graviton_core::models::bootstrap::BootstrapEnv;
use graviton_core::platform::{Platform, APP_BRAND_NAME};
use graviton_core::ports::error_reporter::ErrorReporter;

use crate::alert::NativeErrorReporter;

/// Graviton 브라우저 런처
#[derive(Parser, Debug)]
#[command(name = "graviton")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 백그라운드 업데이트 모드 (OS 예약 작업이 호출)
    #[arg(long)]
    background_update: bool,

    /// 예약 작업 해제 후 종료 (제거 프로그램이 호출)
    #[arg(long)]
    uninstall: bool,

    /// 로그 레벨 (trace, debug, info, warn, error). 없으면 설정 파일 값.
    #[arg(long, short = 'l')]
    log_level: Option<String>,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// 실행할 애플리케이션 좌표
    coordinates: Option<String>,
}

fn main() -> ExitCode {
    let env = BootstrapEnv::from_process_env();
    let reporter: Arc<dyn ErrorReporter> = Arc::new(NativeErrorReporter);

    // 로깅 초기화 전에 분기: 격리 실행 프로그램의 콘솔에 런처 로그를 섞지 않는다
    let dispatcher =
        BootstrapDispatcher::new(IsolatedExecutionLoader::default(), Arc::clone(&reporter));
    let arguments: Vec<OsString> = std::env::args_os().skip(1).collect();
    if let DispatchOutcome::HandledIsolatedExecution(execution) =
        dispatcher.dispatch(arguments, &env)
    {
        match execution.wait() {
            Ok(code) => std::process::exit(code),
            Err(e) => {
                reporter.log_error("격리 실행 프로그램 실패", &e);
                return ExitCode::FAILURE;
            }
        }
    }

    match run(&env) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error: &(dyn std::error::Error + 'static) = e.as_ref();
            reporter.log_error("시작 실패", error);
            reporter.show_fatal_alert(&format!("{APP_BRAND_NAME} 시작 실패"), &format!("{e:?}"));
            ExitCode::FAILURE
        }
    }
}

/// 일반 시작
fn run(env: &BootstrapEnv) -> Result<()> {
    let args = Args::parse();

    let config_manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    }
    .context("설정 로드 실패")?;
    let config = config_manager.get().clone();

    let log_level = args.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(log_level);

    let platform = Platform::current();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        %platform,
        config = %config_manager.config_path().display(),
        "{APP_BRAND_NAME} 런처 시작"
    );
    if let Err(e) = config_manager.ensure_saved() {
        warn!(error = %e, "기본 설정 파일 생성 실패");
    }

    if args.uninstall {
        let install_dir = match &env.install {
            Some(install) => install.path.clone(),
            None => executable_dir()?,
        };
        LifecycleManager::new(install_dir, platform, &config, Box::new(graviton_scheduler::probe))
            .on_uninstall();
        return Ok(());
    }

    let startup_checks = match &env.install {
        Some(install) => {
            let manager = Arc::new(LifecycleManager::new(
                install.path.clone(),
                platform,
                &config,
                Box::new(graviton_scheduler::probe),
            ));
            Some(manager.on_startup(install.version)?)
        }
        None => {
            debug!("설치본으로 실행되지 않음 — 시작 점검 생략");
            None
        }
    };

    if args.background_update {
        info!("백그라운드 업데이트 요청");
    } else if let Some(coordinates) = &args.coordinates {
        info!(%coordinates, "애플리케이션 실행 요청");
    } else {
        info!("대화형 셸 시작");
    }

    // 시작 점검은 백그라운드에서 진행되지만 프로세스 종료 전에는 마쳐야 한다
    if let Some(handle) = startup_checks {
        if handle.join().is_err() {
            warn!("시작 점검 스레드 패닉");
        }
    }
    Ok(())
}

/// tracing 초기화. `RUST_LOG`가 있으면 우선한다.
fn init_logging(level: &str) {
    let log_filter = format!(
        "graviton={level},graviton_core={level},graviton_scheduler={level},graviton_bootstrap={level}"
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();
    alert::mark_logging_ready();
}

/// 현재 실행 파일이 있는 디렉토리
fn executable_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("실행 파일 경로 확인 실패")?;
    exe.parent()
        .map(PathBuf::from)
        .context("실행 파일의 상위 디렉토리 없음")
}
