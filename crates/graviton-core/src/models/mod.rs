//! 도메인 모델.

pub mod bootstrap;
pub mod task;
