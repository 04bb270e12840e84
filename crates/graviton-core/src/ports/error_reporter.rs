//! 에러 보고 채널 포트.
//!
//! 구조화 로그와 (한 OS에서는) 네이티브 치명적 오류 알림창.
//! 구현은 보고 중 발생한 2차 실패를 삼켜야 한다.

/// 프로세스 전역 에러 보고 채널
pub trait ErrorReporter: Send + Sync {
    /// 에러 기록
    fn log_error(&self, context: &str, error: &(dyn std::error::Error + 'static));

    /// 치명적 시작 실패 알림 (네이티브 알림창은 지원 OS에서만)
    fn show_fatal_alert(&self, title: &str, detail: &str);
}
