//! Manager configuration.
//!
//! Environment variables:
//! - `ADMITQ_DEFAULT_WINDOW`: window for queues without an override (default: 1)
//! - `ADMITQ_QUEUE_WINDOWS`: per-queue windows, `name=n,name2=m`
//! - `ADMITQ_POLL_INTERVAL_MS`: dispatch backoff when nothing was admitted (default: 100)
//! - `ADMITQ_RECOVERY`: `fail-open` or `fail-closed` (default: fail-open)
//! - `ADMITQ_SNAPSHOT_ENABLED`: periodic snapshots (default: true)
//! - `ADMITQ_SNAPSHOT_INTERVAL_MS`: snapshot tick (default: 5000)
//! - `ADMITQ_SNAPSHOT_MIN_CHANGES`: mutations before a queue is rewritten (default: 1)
//! - `ADMITQ_SNAPSHOT_DIR`: snapshot directory for the file store (default: ./snapshots)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::queue::types::FxHashMap;
use tracing::warn;

/// What to do when a stored snapshot cannot be imported at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryPolicy {
    /// Log a warning and start the queue empty.
    #[default]
    FailOpen,
    /// Refuse to start.
    FailClosed,
}

impl FromStr for RecoveryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-open" | "open" => Ok(RecoveryPolicy::FailOpen),
            "fail-closed" | "closed" => Ok(RecoveryPolicy::FailClosed),
            other => Err(format!("unknown recovery policy: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub enabled: bool,
    pub interval: Duration,
    /// Mutations a queue must accumulate before it is rewritten.
    pub min_changes: u64,
    pub dir: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(5),
            min_changes: 1,
            dir: PathBuf::from("./snapshots"),
        }
    }
}

impl SnapshotConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_bool("ADMITQ_SNAPSHOT_ENABLED").unwrap_or(defaults.enabled),
            interval: env_millis("ADMITQ_SNAPSHOT_INTERVAL_MS").unwrap_or(defaults.interval),
            min_changes: env_parse("ADMITQ_SNAPSHOT_MIN_CHANGES").unwrap_or(defaults.min_changes),
            dir: std::env::var("ADMITQ_SNAPSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.dir),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Window for lazily created queues without an override.
    pub default_window: i64,
    pub queue_windows: FxHashMap<String, i64>,
    /// Dispatch backoff after a pass that admitted nothing.
    pub poll_interval: Duration,
    pub recovery: RecoveryPolicy,
    pub snapshot: SnapshotConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            default_window: 1,
            queue_windows: FxHashMap::default(),
            poll_interval: Duration::from_millis(100),
            recovery: RecoveryPolicy::default(),
            snapshot: SnapshotConfig::default(),
        }
    }
}

impl ManagerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_window: env_parse("ADMITQ_DEFAULT_WINDOW").unwrap_or(defaults.default_window),
            queue_windows: std::env::var("ADMITQ_QUEUE_WINDOWS")
                .map(|v| parse_queue_windows(&v))
                .unwrap_or_default(),
            poll_interval: env_millis("ADMITQ_POLL_INTERVAL_MS").unwrap_or(defaults.poll_interval),
            recovery: env_parse("ADMITQ_RECOVERY").unwrap_or(defaults.recovery),
            snapshot: SnapshotConfig::from_env(),
        }
    }

    pub fn with_window(mut self, queue: impl Into<String>, window: i64) -> Self {
        self.queue_windows.insert(queue.into(), window);
        self
    }

    /// Replace zero durations with their defaults.
    ///
    /// A zero poll interval would spin the dispatch loop and a zero snapshot
    /// interval cannot drive a timer.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.poll_interval.is_zero() {
            warn!(
                default_ms = defaults.poll_interval.as_millis() as u64,
                "Poll interval is zero, using default"
            );
            self.poll_interval = defaults.poll_interval;
        }
        if self.snapshot.interval.is_zero() {
            warn!(
                default_ms = defaults.snapshot.interval.as_millis() as u64,
                "Snapshot interval is zero, using default"
            );
            self.snapshot.interval = defaults.snapshot.interval;
        }
        self
    }

    /// Window a newly created queue starts with.
    pub fn window_for(&self, queue: &str) -> i64 {
        self.queue_windows
            .get(queue)
            .copied()
            .unwrap_or(self.default_window)
    }
}

/// Parse `name=n,name2=m`. Malformed entries are skipped with a warning.
pub fn parse_queue_windows(raw: &str) -> FxHashMap<String, i64> {
    let mut windows = FxHashMap::default();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match part.split_once('=') {
            Some((name, n)) if !name.trim().is_empty() => match n.trim().parse::<i64>() {
                Ok(window) => {
                    windows.insert(name.trim().to_string(), window);
                }
                Err(_) => warn!(entry = %part, "Ignoring queue window with invalid size"),
            },
            _ => warn!(entry = %part, "Ignoring malformed queue window entry"),
        }
    }
    windows
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %raw, "Invalid value, using default");
            None
        }
    }
}

/// Positive millisecond duration; zero counts as invalid.
fn env_millis(name: &str) -> Option<Duration> {
    match env_parse::<u64>(name)? {
        0 => {
            warn!(var = name, "Zero duration is not allowed, using default");
            None
        }
        ms => Some(Duration::from_millis(ms)),
    }
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.to_lowercase() == "true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_queue_windows() {
        let windows = parse_queue_windows("build=4, deploy=1,,bad,x=y");
        assert_eq!(windows.len(), 2);
        assert_eq!(windows.get("build"), Some(&4));
        assert_eq!(windows.get("deploy"), Some(&1));
    }

    #[test]
    fn test_window_for_falls_back_to_default() {
        let config = ManagerConfig {
            default_window: 3,
            ..Default::default()
        }
        .with_window("deploy", 1);
        assert_eq!(config.window_for("deploy"), 1);
        assert_eq!(config.window_for("other"), 3);
    }

    #[test]
    fn test_validated_replaces_zero_durations() {
        let mut config = ManagerConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        config.snapshot.interval = Duration::ZERO;

        let config = config.validated();
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.snapshot.interval, Duration::from_secs(5));

        let custom = ManagerConfig {
            poll_interval: Duration::from_millis(7),
            ..Default::default()
        }
        .validated();
        assert_eq!(custom.poll_interval, Duration::from_millis(7));
    }

    #[test]
    fn test_env_millis_rejects_zero() {
        std::env::set_var("ADMITQ_TEST_ZERO_MS", "0");
        std::env::set_var("ADMITQ_TEST_SOME_MS", "250");
        assert_eq!(env_millis("ADMITQ_TEST_ZERO_MS"), None);
        assert_eq!(env_millis("ADMITQ_TEST_SOME_MS"), Some(Duration::from_millis(250)));
        assert_eq!(env_millis("ADMITQ_TEST_UNSET_MS"), None);
    }

    #[test]
    fn test_recovery_policy_from_str() {
        assert_eq!("fail-open".parse::<RecoveryPolicy>(), Ok(RecoveryPolicy::FailOpen));
        assert_eq!("Fail-Closed".parse::<RecoveryPolicy>(), Ok(RecoveryPolicy::FailClosed));
        assert!("maybe".parse::<RecoveryPolicy>().is_err());
    }
}
