//! Windows 작업 스케줄러 백엔드 — `schtasks /XML`.
//!
//! 작업 XML을 UTF-16으로 임시 파일에 쓰고 `schtasks /Create /F`로 등록한다.
//! `/F`가 같은 이름의 기존 작업을 덮어쓰므로 등록은 upsert다.
//!
//! `CalendarTrigger/ScheduleByDay`는 일 단위 반복만 표현할 수 있어
//! 하루 미만 주기는 하루로 올림한다. `network_sensitive`는
//! `RunOnlyIfNetworkAvailable` 설정으로 옮긴다.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use graviton_core::error::CoreError;
use graviton_core::models::task::{round_up_to, ScheduledTaskDefinition};
use graviton_core::ports::task_scheduler::TaskScheduler;

use crate::command;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// `schtasks.exe` 기반 스케줄러
pub struct WindowsTaskScheduler {
    schtasks: PathBuf,
}

impl WindowsTaskScheduler {
    pub fn new(schtasks: impl Into<PathBuf>) -> Self {
        Self {
            schtasks: schtasks.into(),
        }
    }

    /// PATH에서 `schtasks` 탐색
    pub fn detect() -> Option<Self> {
        which::which("schtasks").ok().map(Self::new)
    }

    /// 작업 스케줄러 등록용 XML
    pub fn render_task_xml(definition: &ScheduledTaskDefinition) -> String {
        let days = round_up_to(definition.frequency, DAY).as_secs() / DAY.as_secs();
        let start = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S");
        let arguments = definition
            .arguments
            .iter()
            .map(|a| quote_argument(a))
            .collect::<Vec<_>>()
            .join(" ");

        format!(
            r#"<?xml version="1.0" encoding="UTF-16"?>
<Task version="1.2" xmlns="http://schemas.microsoft.com/windows/2004/02/mit/task">
  <RegistrationInfo>
    <Description>{description}</Description>
  </RegistrationInfo>
  <Triggers>
    <CalendarTrigger>
      <StartBoundary>{start}</StartBoundary>
      <Enabled>true</Enabled>
      <ScheduleByDay>
        <DaysInterval>{days}</DaysInterval>
      </ScheduleByDay>
    </CalendarTrigger>
  </Triggers>
  <Settings>
    <MultipleInstancesPolicy>IgnoreNew</MultipleInstancesPolicy>
    <DisallowStartIfOnBatteries>false</DisallowStartIfOnBatteries>
    <StopIfGoingOnBatteries>false</StopIfGoingOnBatteries>
    <StartWhenAvailable>true</StartWhenAvailable>
    <RunOnlyIfNetworkAvailable>{network}</RunOnlyIfNetworkAvailable>
    <Enabled>true</Enabled>
  </Settings>
  <Actions Context="Author">
    <Exec>
      <Command>{command}</Command>
      <Arguments>{arguments}</Arguments>
    </Exec>
  </Actions>
</Task>
"#,
            description = escape_xml(&definition.description),
            start = start,
            days = days,
            network = definition.network_sensitive,
            command = escape_xml(&definition.executable_path.to_string_lossy()),
            arguments = escape_xml(&arguments),
        )
    }

    fn xml_path(name: &str) -> PathBuf {
        let safe: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '_' })
            .collect();
        std::env::temp_dir().join(format!("{safe}-{}.xml", std::process::id()))
    }

    fn task_exists(&self, name: &str) -> Result<bool, String> {
        let output = command::run(&self.schtasks, ["/Query", "/TN", name])?;
        Ok(output.status.success())
    }

    fn create_from_xml(&self, name: &str, xml_path: &Path) -> Result<(), String> {
        let output = command::run(
            &self.schtasks,
            [
                OsStr::new("/Create"),
                OsStr::new("/TN"),
                OsStr::new(name),
                OsStr::new("/XML"),
                xml_path.as_os_str(),
                OsStr::new("/F"),
            ],
        )?;
        if output.status.success() {
            Ok(())
        } else {
            Err(command::describe_failure(&self.schtasks, &output))
        }
    }
}

impl TaskScheduler for WindowsTaskScheduler {
    fn backend(&self) -> &str {
        "windows"
    }

    fn native_interval(&self, requested: Duration) -> Duration {
        round_up_to(requested, DAY)
    }

    fn register(&self, name: &str, definition: &ScheduledTaskDefinition) -> Result<(), CoreError> {
        let fail = |reason: String| CoreError::SchedulerRegistration {
            task: name.to_string(),
            reason,
        };
        definition.validate().map_err(|e| fail(e.to_string()))?;

        let xml = Self::render_task_xml(definition);
        let xml_path = Self::xml_path(name);
        fs::write(&xml_path, encode_utf16_with_bom(&xml))
            .map_err(|e| fail(format!("작업 XML 작성 실패: {}: {e}", xml_path.display())))?;

        let result = self.create_from_xml(name, &xml_path);
        if let Err(e) = fs::remove_file(&xml_path) {
            tracing::debug!(path = %xml_path.display(), error = %e, "작업 XML 임시 파일 삭제 실패");
        }
        result.map_err(fail)?;

        tracing::info!(
            task = name,
            interval_secs = self.native_interval(definition.frequency).as_secs(),
            "Windows 예약 작업 등록"
        );
        Ok(())
    }

    fn deregister(&self, name: &str) -> Result<(), CoreError> {
        let fail = |reason: String| CoreError::SchedulerDeregistration {
            task: name.to_string(),
            reason,
        };
        if !self.task_exists(name).map_err(fail)? {
            tracing::debug!(task = name, "예약 작업 없음 — 해제 생략");
            return Ok(());
        }
        let output = command::run(&self.schtasks, ["/Delete", "/TN", name, "/F"]).map_err(fail)?;
        if !output.status.success() {
            return Err(fail(command::describe_failure(&self.schtasks, &output)));
        }
        tracing::info!(task = name, "Windows 예약 작업 해제");
        Ok(())
    }
}

/// `schtasks`는 XML 선언과 실제 인코딩이 일치해야 한다 (BOM 포함 UTF-16LE)
fn encode_utf16_with_bom(text: &str) -> Vec<u8> {
    std::iter::once(0xFEFF_u16)
        .chain(text.encode_utf16())
        .flat_map(u16::to_le_bytes)
        .collect()
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Windows 명령줄 인자 인용 (CommandLineToArgvW 규칙)
fn quote_argument(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains([' ', '\t', '"']) {
        return arg.to_string();
    }
    let mut out = String::from("\"");
    let mut backslashes = 0usize;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                out.extend(std::iter::repeat('\\').take(backslashes * 2 + 1));
                out.push('"');
                backslashes = 0;
            }
            c => {
                out.extend(std::iter::repeat('\\').take(backslashes));
                out.push(c);
                backslashes = 0;
            }
        }
    }
    out.extend(std::iter::repeat('\\').take(backslashes * 2));
    out.push('"');
    out
}
