//! 시작 분기.
//!
//! 프로세스 진입 시 한 번 호출되어 이번 실행이 격리 실행 요청인지 결정한다.
//! 요청은 [`BootstrapEnv`]의 두 환경 변수로만 전달되며, 인자나 URL로는 만들 수 없다.
//! 격리 실행 준비 실패는 여기서 보고하고 삼킨다 (호스트가 조용히 죽지 않도록).

use std::ffi::OsString;
use std::sync::Arc;

use graviton_core::error::CoreError;
use graviton_core::models::bootstrap::{BootstrapEnv, IsolatedRunRequest};
use graviton_core::ports::error_reporter::ErrorReporter;

use crate::isolation::{IsolatedExecution, IsolatedExecutionLoader};

/// 분기 결과
#[derive(Debug)]
pub enum DispatchOutcome {
    /// 격리 실행을 처리함. 프로세스는 이 실행의 종료를 기다린 뒤 끝나야 한다.
    HandledIsolatedExecution(IsolatedExecution),
    /// 일반 CLI/GUI 시작으로 진행
    ProceedToInteractiveStartup,
}

/// 시작 분기기
pub struct BootstrapDispatcher {
    loader: IsolatedExecutionLoader,
    reporter: Arc<dyn ErrorReporter>,
}

impl BootstrapDispatcher {
    pub fn new(loader: IsolatedExecutionLoader, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { loader, reporter }
    }

    /// `arguments`는 실행 파일 이름을 제외한 원래 프로세스 인자
    pub fn dispatch(&self, arguments: Vec<OsString>, env: &BootstrapEnv) -> DispatchOutcome {
        let Some(request) = &env.isolated_run else {
            return DispatchOutcome::ProceedToInteractiveStartup;
        };

        match self.start_isolated(request, arguments, env) {
            Ok(execution) => DispatchOutcome::HandledIsolatedExecution(execution),
            Err(e) => {
                self.reporter.log_error("격리 실행 준비 실패", &e);
                DispatchOutcome::HandledIsolatedExecution(IsolatedExecution::aborted())
            }
        }
    }

    fn start_isolated(
        &self,
        request: &IsolatedRunRequest,
        arguments: Vec<OsString>,
        env: &BootstrapEnv,
    ) -> Result<IsolatedExecution, CoreError> {
        let context = self
            .loader
            .build_context(&request.classpath, &env.base_environment)?;
        self.loader.run(&context, &request.entry_point, arguments)
    }
}
