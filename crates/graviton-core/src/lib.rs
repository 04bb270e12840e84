//! # graviton-core
//!
//! Graviton 런처 도메인 모델, 포트(trait) 정의, 에러 타입.
//! 부트스트랩/스케줄러/앱 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`] — 예약 작업 정의, 부트스트랩 환경 스냅샷
//! - [`ports`] — OS 작업 스케줄러, 에러 보고 채널 포트
//! - [`error`] — 핵심 에러 타입 (thiserror)
//! - [`platform`] — 운영체제별 경로/구분자/기본값
//! - [`config`] — 런처 설정 구조체
//! - [`config_manager`] — 설정 파일 관리 (로드/저장)

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod platform;
pub mod ports;
