//! Linux cron 백엔드 — 사용자 crontab.
//!
//! 작업마다 crontab 한 줄을 쓰고 줄 끝에 `# graviton-task:<이름>` 태그를 붙인다.
//! 등록은 같은 태그의 줄을 교체하고, 해제는 태그 줄을 지운다.
//!
//! cron은 시 단위까지만 고르게 반복할 수 있다:
//! - 24시간 미만: 올림한 시간 수를 다시 24의 약수로 올림 (`0 */N * * *`)
//! - 24시간 이상: 일 단위로 올림. 매일 자정에 실행하되 명령 앞의 셸 가드가
//!   에포크 일수가 D의 배수인 날만 통과시킨다. 일(day-of-month) 필드의 `*/D`는
//!   매달 1일에 다시 시작해 간격이 D일보다 짧아질 수 있으므로 쓰지 않는다.
//!
//! 네트워크 조건은 cron에 없으므로 `network_sensitive`는 무시한다.

use std::path::PathBuf;
use std::time::Duration;

use graviton_core::error::CoreError;
use graviton_core::models::task::{round_up_to, ScheduledTaskDefinition};
use graviton_core::ports::task_scheduler::TaskScheduler;

use crate::command;

const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// 작업 줄 식별 태그
const TAG_PREFIX: &str = "# graviton-task:";

/// 24의 약수 (시간 단위 반복이 하루 경계에서도 고른 값)
const DAY_DIVISORS: [u64; 8] = [1, 2, 3, 4, 6, 8, 12, 24];

/// crontab 기반 스케줄러
pub struct CronTaskScheduler {
    crontab: PathBuf,
}

impl CronTaskScheduler {
    pub fn new(crontab: impl Into<PathBuf>) -> Self {
        Self {
            crontab: crontab.into(),
        }
    }

    /// PATH에서 `crontab` 탐색
    pub fn detect() -> Option<Self> {
        which::which("crontab").ok().map(Self::new)
    }

    /// 반복 주기 → cron 스케줄 필드 5개
    pub fn schedule_expression(interval: Duration) -> String {
        let interval = Self::round_interval(interval);
        let hours = interval.as_secs() / HOUR.as_secs();
        match hours {
            1 => "0 * * * *".to_string(),
            h if h < 24 => format!("0 */{h} * * *"),
            _ => "0 0 * * *".to_string(),
        }
    }

    /// 이틀 이상 주기의 실행일 가드. 하루 주기 이하면 `None`.
    ///
    /// 실행 시각을 가장 가까운 UTC 자정으로 반올림한 에포크 일수를 쓴다.
    /// 현지 자정이 서머타임으로 한 시간 움직여도 같은 날로 계산된다.
    /// crontab에서 `%`는 줄바꿈이므로 `\%`로 적는다.
    pub fn day_guard(interval: Duration) -> Option<String> {
        let days = Self::round_interval(interval).as_secs() / DAY.as_secs();
        (days >= 2).then(|| {
            format!(
                r"[ $(( ($(date +\%s) + 43200) / 86400 \% {days} )) -eq 0 ] &&"
            )
        })
    }

    /// 작업 정의 → 태그가 붙은 crontab 한 줄
    pub fn render_entry(name: &str, definition: &ScheduledTaskDefinition) -> String {
        let mut line = Self::schedule_expression(definition.frequency);
        line.push(' ');
        if let Some(guard) = Self::day_guard(definition.frequency) {
            line.push_str(&guard);
            line.push(' ');
        }
        line.push_str(&shell_quote(&definition.executable_path.to_string_lossy()));
        for arg in &definition.arguments {
            line.push(' ');
            line.push_str(&shell_quote(arg));
        }
        line.push(' ');
        line.push_str(TAG_PREFIX);
        line.push_str(name);
        line
    }

    fn round_interval(requested: Duration) -> Duration {
        let hours = round_up_to(requested, HOUR).as_secs() / HOUR.as_secs();
        if hours < 24 {
            let even = DAY_DIVISORS
                .iter()
                .copied()
                .find(|d| *d >= hours)
                .unwrap_or(24);
            HOUR * even as u32
        } else {
            round_up_to(requested, DAY)
        }
    }

    fn read_crontab(&self) -> Result<String, String> {
        let output = command::run(&self.crontab, ["-l"])?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        // 사용자 crontab이 아직 없으면 빈 목록
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("no crontab") {
            return Ok(String::new());
        }
        Err(command::describe_failure(&self.crontab, &output))
    }

    fn write_crontab(&self, content: &str) -> Result<(), String> {
        let output = command::run_with_stdin(&self.crontab, ["-"], content)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(command::describe_failure(&self.crontab, &output))
        }
    }
}

impl TaskScheduler for CronTaskScheduler {
    fn backend(&self) -> &str {
        "cron"
    }

    fn native_interval(&self, requested: Duration) -> Duration {
        Self::round_interval(requested)
    }

    fn register(&self, name: &str, definition: &ScheduledTaskDefinition) -> Result<(), CoreError> {
        let fail = |reason: String| CoreError::SchedulerRegistration {
            task: name.to_string(),
            reason,
        };
        definition.validate().map_err(|e| fail(e.to_string()))?;

        let existing = self.read_crontab().map_err(fail)?;
        let entry = Self::render_entry(name, definition);
        let updated = upsert_entry(&existing, name, &entry);
        self.write_crontab(&updated).map_err(fail)?;

        tracing::info!(task = name, entry = %entry, "crontab 작업 등록");
        Ok(())
    }

    fn deregister(&self, name: &str) -> Result<(), CoreError> {
        let fail = |reason: String| CoreError::SchedulerDeregistration {
            task: name.to_string(),
            reason,
        };
        let existing = self.read_crontab().map_err(fail)?;
        let (updated, removed) = remove_entry(&existing, name);
        if !removed {
            tracing::debug!(task = name, "crontab에 작업 없음 — 해제 생략");
            return Ok(());
        }
        self.write_crontab(&updated).map_err(fail)?;
        tracing::info!(task = name, "crontab 작업 해제");
        Ok(())
    }
}

/// 같은 이름의 태그 줄을 모두 지우고 새 줄을 끝에 추가
pub fn upsert_entry(existing: &str, name: &str, entry: &str) -> String {
    let (mut kept, _) = remove_entry(existing, name);
    kept.push_str(entry);
    kept.push('\n');
    kept
}

/// 같은 이름의 태그 줄 제거. 지운 줄이 있으면 `true`.
pub fn remove_entry(existing: &str, name: &str) -> (String, bool) {
    let mut out = String::with_capacity(existing.len());
    let mut removed = false;
    for line in existing.lines() {
        if tagged_name(line) == Some(name) {
            removed = true;
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    (out, removed)
}

fn tagged_name(line: &str) -> Option<&str> {
    let idx = line.rfind(TAG_PREFIX)?;
    Some(line[idx + TAG_PREFIX.len()..].trim_end())
}

/// POSIX 셸 작은따옴표 인용
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const TAG_LINE: &str = "0 */6 * * * new # graviton-task:app.graviton.update";

    #[test]
    fn rounds_up_to_even_hour_steps() {
        let s = CronTaskScheduler::new("/usr/bin/crontab");
        assert_eq!(s.native_interval(Duration::from_secs(60)), HOUR);
        assert_eq!(s.native_interval(HOUR * 5), HOUR * 6);
        assert_eq!(s.native_interval(HOUR * 6), HOUR * 6);
        assert_eq!(s.native_interval(HOUR * 13), DAY);
        assert_eq!(s.native_interval(HOUR * 20), DAY);
        assert_eq!(s.native_interval(HOUR * 30), DAY * 2);
    }

    #[test]
    fn native_interval_never_below_request() {
        let s = CronTaskScheduler::new("/usr/bin/crontab");
        for minutes in [1u64, 59, 61, 119, 300, 421, 1439, 1441, 4000] {
            let requested = Duration::from_secs(minutes * 60);
            assert!(s.native_interval(requested) >= requested, "{minutes}분");
        }
    }

    #[test]
    fn schedule_expressions() {
        assert_eq!(CronTaskScheduler::schedule_expression(HOUR), "0 * * * *");
        assert_eq!(
            CronTaskScheduler::schedule_expression(HOUR * 6),
            "0 */6 * * *"
        );
        assert_eq!(
            CronTaskScheduler::schedule_expression(HOUR * 20),
            "0 0 * * *"
        );
        assert_eq!(CronTaskScheduler::schedule_expression(DAY * 3), "0 0 * * *");
        assert_eq!(CronTaskScheduler::schedule_expression(DAY * 40), "0 0 * * *");
    }

    #[test]
    fn multi_day_uses_epoch_day_guard() {
        assert_eq!(CronTaskScheduler::day_guard(HOUR * 6), None);
        assert_eq!(CronTaskScheduler::day_guard(HOUR * 20), None);
        assert_eq!(
            CronTaskScheduler::day_guard(HOUR * 30).as_deref(),
            Some(r"[ $(( ($(date +\%s) + 43200) / 86400 \% 2 )) -eq 0 ] &&")
        );
        let guard = CronTaskScheduler::day_guard(DAY * 40).unwrap();
        assert!(guard.contains(r"\% 40 "));
    }

    #[test]
    fn entry_quotes_arguments_and_tags_name() {
        let def = ScheduledTaskDefinition::new("/opt/My App/GravitonBrowser", HOUR * 6)
            .with_arguments(["--background-update", "it's"]);
        let entry = CronTaskScheduler::render_entry("app.graviton.update", &def);
        assert_eq!(
            entry,
            concat!(
                r"0 */6 * * * '/opt/My App/GravitonBrowser' '--background-update' 'it'\''s'",
                " # graviton-task:app.graviton.update"
            )
        );
    }

    #[test]
    fn multi_day_entry_puts_guard_before_command() {
        let def = ScheduledTaskDefinition::new("/opt/graviton/GravitonBrowser", DAY * 2);
        let entry = CronTaskScheduler::render_entry("u", &def);
        assert!(entry.starts_with(r"0 0 * * * [ $(( ($(date +\%s)"));
        assert!(entry.ends_with(r"-eq 0 ] && '/opt/graviton/GravitonBrowser' # graviton-task:u"));
    }

    #[test]
    fn upsert_replaces_existing_line() {
        let existing = concat!(
            "MAILTO=me\n",
            "0 1 * * * backup # graviton-task:app.graviton.update\n",
            "5 * * * * other\n"
        );
        let updated = upsert_entry(existing, "app.graviton.update", TAG_LINE);
        assert_eq!(updated, format!("MAILTO=me\n5 * * * * other\n{TAG_LINE}\n"));
        let again = upsert_entry(&updated, "app.graviton.update", TAG_LINE);
        assert_eq!(again, updated);
    }

    #[test]
    fn remove_only_matches_exact_name() {
        let existing = "0 * * * * a # graviton-task:x.update\n0 * * * * b # graviton-task:update\n";
        let (updated, removed) = remove_entry(existing, "update");
        assert!(removed);
        assert_eq!(updated, "0 * * * * a # graviton-task:x.update\n");

        let (unchanged, removed) = remove_entry(&updated, "missing");
        assert!(!removed);
        assert_eq!(unchanged, updated);
    }

    #[cfg(unix)]
    mod with_fake_crontab {
        use super::*;
        use crate::testing::write_script;
        use std::path::Path;
        use std::process::Command;
        use tempfile::TempDir;

        /// `-l`은 파일 내용, `-`는 표준 입력으로 파일 교체. 파일이 없으면 "no crontab".
        fn fake_crontab(dir: &Path) -> (CronTaskScheduler, PathBuf) {
            let tab = dir.join("tab");
            let body = format!(
                r#"TAB='{}'
case "$1" in
  -l) [ -f "$TAB" ] || {{ echo "no crontab for tester" >&2; exit 1; }}; cat "$TAB" ;;
  -) cat > "$TAB" ;;
  *) exit 2 ;;
esac
"#,
                tab.display()
            );
            let crontab = write_script(dir, "crontab", &body);
            (CronTaskScheduler::new(crontab), tab)
        }

        fn definition(dir: &Path, frequency: Duration) -> ScheduledTaskDefinition {
            let exe = dir.join("GravitonBrowser");
            std::fs::write(&exe, "").unwrap();
            ScheduledTaskDefinition::new(exe, frequency).with_arguments(["--background-update"])
        }

        #[test]
        fn deregister_without_crontab_is_ok() {
            let dir = TempDir::new().unwrap();
            let (scheduler, tab) = fake_crontab(dir.path());

            assert!(scheduler.deregister("never.registered").is_ok());
            assert!(!tab.exists());
        }

        #[test]
        fn register_twice_keeps_latest_entry_only() {
            let dir = TempDir::new().unwrap();
            let (scheduler, tab) = fake_crontab(dir.path());
            std::fs::write(&tab, "MAILTO=me\n").unwrap();

            scheduler
                .register("t", &definition(dir.path(), HOUR * 12))
                .unwrap();
            let latest = definition(dir.path(), HOUR * 6);
            scheduler.register("t", &latest).unwrap();

            let content = std::fs::read_to_string(&tab).unwrap();
            let expected = format!(
                "MAILTO=me\n{}\n",
                CronTaskScheduler::render_entry("t", &latest)
            );
            assert_eq!(content, expected);
            assert!(content.contains("0 */6 * * * "));
        }

        #[test]
        fn first_register_creates_crontab() {
            let dir = TempDir::new().unwrap();
            let (scheduler, tab) = fake_crontab(dir.path());

            scheduler
                .register("t", &definition(dir.path(), HOUR * 12))
                .unwrap();
            let content = std::fs::read_to_string(&tab).unwrap();
            assert_eq!(content.lines().count(), 1);
            assert!(content.starts_with("0 */12 * * * "));
        }

        #[test]
        fn deregister_removes_only_tagged_line() {
            let dir = TempDir::new().unwrap();
            let (scheduler, tab) = fake_crontab(dir.path());
            std::fs::write(&tab, "5 * * * * other\n").unwrap();

            scheduler
                .register("t", &definition(dir.path(), HOUR * 6))
                .unwrap();
            scheduler.deregister("t").unwrap();
            assert_eq!(std::fs::read_to_string(&tab).unwrap(), "5 * * * * other\n");

            scheduler.deregister("t").unwrap();
            assert_eq!(std::fs::read_to_string(&tab).unwrap(), "5 * * * * other\n");
        }

        #[test]
        fn crontab_failure_is_registration_error() {
            let dir = TempDir::new().unwrap();
            let crontab = write_script(
                dir.path(),
                "crontab",
                "echo \"crontab: permission denied\" >&2\nexit 1\n",
            );
            let scheduler = CronTaskScheduler::new(crontab);

            let result = scheduler.register("t", &definition(dir.path(), HOUR * 6));
            assert_matches!(
                result,
                Err(CoreError::SchedulerRegistration { reason, .. })
                    if reason.contains("permission denied")
            );
        }

        /// 매일 자정 실행을 흉내 내어 가드를 통과한 날만 모은다
        fn guarded_days(guard: &str, utc_offsets_hours: impl Fn(u64) -> i64) -> Vec<u64> {
            let bin = TempDir::new().unwrap();
            write_script(bin.path(), "date", "echo \"$FAKE_NOW\"\n");
            // cron은 `\%`를 `%`로 바꿔 셸에 넘긴다
            let script = format!("{} echo fired", guard.replace(r"\%", "%"));

            let base_day = 20_000u64;
            (0..60)
                .filter(|day| {
                    // 현지 자정 = UTC 자정 - 오프셋
                    let now = ((base_day + day) * 86_400) as i64 - utc_offsets_hours(*day) * 3600;
                    let output = Command::new("/bin/sh")
                        .arg("-c")
                        .arg(&script)
                        .env("PATH", format!("{}:/bin:/usr/bin", bin.path().display()))
                        .env("FAKE_NOW", now.to_string())
                        .output()
                        .unwrap();
                    String::from_utf8_lossy(&output.stdout).trim() == "fired"
                })
                .collect()
        }

        #[test]
        fn two_day_guard_never_fires_on_consecutive_days() {
            let guard = CronTaskScheduler::day_guard(DAY * 2).unwrap();

            // 서머타임 전환: 30일째부터 오프셋 한 시간 이동
            let zones: [fn(u64) -> i64; 3] = [
                |d| if d < 30 { 0 } else { 1 },
                |d| if d < 30 { -5 } else { -4 },
                |d| if d < 30 { 9 } else { 10 },
            ];
            for offsets in zones {
                let days = guarded_days(&guard, offsets);
                assert!(days.len() >= 29, "{days:?}");
                for pair in days.windows(2) {
                    assert_eq!(pair[1] - pair[0], 2, "{days:?}");
                }
            }
        }
    }
}
