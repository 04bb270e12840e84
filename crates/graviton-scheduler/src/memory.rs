//! 인메모리 스케줄러.
//!
//! OS 스케줄러를 건드리지 않고 등록/해제 계약을 검증하기 위한 백엔드.
//! 일 단위 등 거친 단위를 흉내 낼 수 있고, 호출 횟수를 세며, 등록 실패를 주입할 수 있다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use graviton_core::error::CoreError;
use graviton_core::models::task::{round_up_to, ScheduledTaskDefinition};
use graviton_core::ports::task_scheduler::TaskScheduler;

/// 등록된 작업 (요청 정의 + 백엔드가 적용한 실제 간격)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredTask {
    pub definition: ScheduledTaskDefinition,
    pub native_interval: Duration,
}

/// 메모리에만 작업을 보관하는 스케줄러
pub struct InMemoryTaskScheduler {
    granularity: Duration,
    tasks: Mutex<HashMap<String, RegisteredTask>>,
    failure: Mutex<Option<String>>,
    register_calls: AtomicUsize,
    deregister_calls: AtomicUsize,
}

impl Default for InMemoryTaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTaskScheduler {
    /// 초 단위 간격을 그대로 쓰는 스케줄러
    pub fn new() -> Self {
        Self::with_granularity(Duration::from_secs(1))
    }

    /// 주어진 단위로만 반복할 수 있는 스케줄러 (예: 하루)
    pub fn with_granularity(granularity: Duration) -> Self {
        Self {
            granularity,
            tasks: Mutex::new(HashMap::new()),
            failure: Mutex::new(None),
            register_calls: AtomicUsize::new(0),
            deregister_calls: AtomicUsize::new(0),
        }
    }

    /// 이후 `register` 호출을 주어진 사유로 실패시킴. `None`이면 정상 동작.
    pub fn set_registration_failure(&self, reason: Option<&str>) {
        *self.failure.lock() = reason.map(str::to_string);
    }

    /// 이름으로 등록된 작업 조회
    pub fn task(&self, name: &str) -> Option<RegisteredTask> {
        self.tasks.lock().get(name).cloned()
    }

    /// 등록된 작업 수
    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn deregister_calls(&self) -> usize {
        self.deregister_calls.load(Ordering::SeqCst)
    }
}

impl TaskScheduler for InMemoryTaskScheduler {
    fn backend(&self) -> &str {
        "memory"
    }

    fn native_interval(&self, requested: Duration) -> Duration {
        round_up_to(requested, self.granularity)
    }

    fn register(&self, name: &str, definition: &ScheduledTaskDefinition) -> Result<(), CoreError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = self.failure.lock().clone() {
            return Err(CoreError::SchedulerRegistration {
                task: name.to_string(),
                reason,
            });
        }
        definition
            .validate()
            .map_err(|e| CoreError::SchedulerRegistration {
                task: name.to_string(),
                reason: e.to_string(),
            })?;

        let task = RegisteredTask {
            definition: definition.clone(),
            native_interval: self.native_interval(definition.frequency),
        };
        self.tasks.lock().insert(name.to_string(), task);
        Ok(())
    }

    fn deregister(&self, name: &str) -> Result<(), CoreError> {
        self.deregister_calls.fetch_add(1, Ordering::SeqCst);
        self.tasks.lock().remove(name);
        Ok(())
    }
}
