//! macOS launchd 백엔드 — `~/Library/LaunchAgents/<이름>.plist`.
//!
//! `StartInterval`(초)로 임의 간격을 그대로 표현한다.
//! 등록: 기존 plist unload → 덮어쓰기 → `launchctl load -w`.
//! 해제: plist가 없으면 성공, 있으면 unload 후 삭제.
//! launchd에는 네트워크 조건 키가 없어 `network_sensitive`는 무시한다.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use graviton_core::error::CoreError;
use graviton_core::models::task::{round_up_to, ScheduledTaskDefinition};
use graviton_core::ports::task_scheduler::TaskScheduler;

use crate::command;

const SECOND: Duration = Duration::from_secs(1);

/// launchctl + LaunchAgents 기반 스케줄러
pub struct LaunchdTaskScheduler {
    launchctl: PathBuf,
    agents_dir: PathBuf,
}

impl LaunchdTaskScheduler {
    pub fn new(launchctl: impl Into<PathBuf>, agents_dir: impl Into<PathBuf>) -> Self {
        Self {
            launchctl: launchctl.into(),
            agents_dir: agents_dir.into(),
        }
    }

    /// PATH의 `launchctl`과 사용자 LaunchAgents 디렉토리
    pub fn detect() -> Option<Self> {
        let launchctl = which::which("launchctl").ok()?;
        let home = BaseDirs::new()?.home_dir().to_path_buf();
        Some(Self::new(
            launchctl,
            home.join("Library").join("LaunchAgents"),
        ))
    }

    /// 작업 이름에 해당하는 plist 경로
    pub fn plist_path(&self, name: &str) -> PathBuf {
        self.agents_dir.join(format!("{name}.plist"))
    }

    /// plist XML 생성
    pub fn generate_plist(name: &str, definition: &ScheduledTaskDefinition) -> String {
        let interval = round_up_to(definition.frequency, SECOND).as_secs();
        let mut program_arguments = format!(
            "        <string>{}</string>\n",
            escape_xml(&definition.executable_path.to_string_lossy())
        );
        for arg in &definition.arguments {
            program_arguments.push_str(&format!("        <string>{}</string>\n", escape_xml(arg)));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<!-- {comment} -->
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
{program_arguments}    </array>
    <key>StartInterval</key>
    <integer>{interval}</integer>
    <key>RunAtLoad</key>
    <false/>
    <key>ProcessType</key>
    <string>Background</string>
</dict>
</plist>
"#,
            comment = definition.description.replace("--", "- -"),
            label = escape_xml(name),
        )
    }

    fn launchctl(&self, action: &str, plist: &Path) -> Result<(), String> {
        let output = command::run(&self.launchctl, [OsStr::new(action), plist.as_os_str()])?;
        if output.status.success() {
            Ok(())
        } else {
            Err(command::describe_failure(&self.launchctl, &output))
        }
    }
}

impl TaskScheduler for LaunchdTaskScheduler {
    fn backend(&self) -> &str {
        "launchd"
    }

    fn native_interval(&self, requested: Duration) -> Duration {
        round_up_to(requested, SECOND)
    }

    fn register(&self, name: &str, definition: &ScheduledTaskDefinition) -> Result<(), CoreError> {
        let fail = |reason: String| CoreError::SchedulerRegistration {
            task: name.to_string(),
            reason,
        };
        definition.validate().map_err(|e| fail(e.to_string()))?;

        fs::create_dir_all(&self.agents_dir).map_err(|e| {
            fail(format!(
                "LaunchAgents 디렉토리 생성 실패: {}: {e}",
                self.agents_dir.display()
            ))
        })?;

        let path = self.plist_path(name);
        if path.exists() {
            // 이전 정의를 내려야 새 plist가 반영된다
            if let Err(e) = self.launchctl("unload", &path) {
                tracing::debug!(task = name, error = %e, "기존 작업 unload 실패 — 계속 진행");
            }
        }

        fs::write(&path, Self::generate_plist(name, definition))
            .map_err(|e| fail(format!("plist 파일 작성 실패: {}: {e}", path.display())))?;

        let output = command::run(
            &self.launchctl,
            [OsStr::new("load"), OsStr::new("-w"), path.as_os_str()],
        )
        .map_err(fail)?;
        if !output.status.success() {
            return Err(fail(command::describe_failure(&self.launchctl, &output)));
        }

        tracing::info!(task = name, plist = %path.display(), "launchd 작업 등록");
        Ok(())
    }

    fn deregister(&self, name: &str) -> Result<(), CoreError> {
        let path = self.plist_path(name);
        if !path.exists() {
            tracing::debug!(task = name, "plist 없음 — 해제 생략");
            return Ok(());
        }

        if let Err(e) = self.launchctl("unload", &path) {
            tracing::debug!(task = name, error = %e, "launchctl unload 실패 — plist 삭제는 계속");
        }

        fs::remove_file(&path).map_err(|e| CoreError::SchedulerDeregistration {
            task: name.to_string(),
            reason: format!("plist 삭제 실패: {}: {e}", path.display()),
        })?;

        tracing::info!(task = name, "launchd 작업 해제");
        Ok(())
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
