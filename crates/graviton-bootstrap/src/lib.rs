//! # graviton-bootstrap
//!
//! 프로세스 시작 시 한 번 실행되는 부트스트랩 레이어.
//!
//! - [`dispatcher`] — 격리 실행 요청인지, 일반 시작인지 결정
//! - [`isolation`] — 클래스패스 검증과 격리 프로세스 실행
//! - [`markers`] — `last-run-version` / 에러 로그 마커 파일
//! - [`lifecycle`] — 첫 실행 시 예약 작업 등록, 제거 시 해제

pub mod dispatcher;
pub mod isolation;
pub mod lifecycle;
pub mod markers;
