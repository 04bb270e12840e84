//! OS 작업 스케줄러 포트.
//!
//! cron, Windows 작업 스케줄러, launchd 등 서로 호환되지 않는 네이티브 스케줄러를
//! 하나의 계약으로 감싼다. 백엔드는 시작 시 OS 감지로 한 번 선택된다.

use std::time::Duration;

use crate::error::CoreError;
use crate::models::task::ScheduledTaskDefinition;

/// 네이티브 OS 작업 스케줄러 포트
pub trait TaskScheduler: Send + Sync {
    /// 백엔드 이름 (cron, windows, launchd, memory)
    fn backend(&self) -> &str;

    /// 요청 주기를 이 백엔드가 표현할 수 있는 가장 가까운 값으로 올림
    fn native_interval(&self, requested: Duration) -> Duration;

    /// 작업 등록 (upsert).
    ///
    /// 같은 이름으로 다시 호출하면 이전 정의를 대체한다. "이미 존재" 에러는 없다.
    /// 실패 시 `CoreError::SchedulerRegistration`. 호출자가 재시도 마커로 남긴다.
    fn register(&self, name: &str, definition: &ScheduledTaskDefinition) -> Result<(), CoreError>;

    /// 작업 해제. 존재하지 않는 이름도 조용히 성공한다.
    fn deregister(&self, name: &str) -> Result<(), CoreError>;
}
