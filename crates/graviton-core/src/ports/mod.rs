//! 포트 인터페이스 (trait).
//!
//! 각 어댑터 crate가 이 trait들을 구현하며,
//! `graviton-app`에서 `Arc<dyn T>`로 와이어링한다.
//!
//! 스케줄러 호출은 백그라운드 스레드에서 블로킹으로 수행되므로 동기 trait이다.

pub mod error_reporter;
pub mod task_scheduler;
