//! Progress and diagnostics sinks.
//!
//! Matchers report staged status messages through a [`MatchListener`].
//! Listeners are purely observational: nothing they do feeds back into the
//! search.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stage a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Stage {
    Initializing,
    Blocking,
    Scoring,
    Matching,
    Training,
    Finalizing,
    Failed,
    Completed,
    Evaluation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initializing => "initializing",
            Self::Blocking => "blocking",
            Self::Scoring => "scoring",
            Self::Matching => "matching",
            Self::Training => "training",
            Self::Finalizing => "finalizing",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Evaluation => "evaluation",
        };
        f.write_str(s)
    }
}

/// Severity of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Level {
    Critical,
    Warning,
    Info,
}

/// Receiver of status messages from a running matcher.
pub trait MatchListener {
    /// Receives one message.
    fn message(&self, stage: Stage, level: Level, message: &str);

    /// Reports informational progress.
    fn update_status(&self, stage: Stage, message: &str) {
        self.message(stage, Level::Info, message);
    }
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl MatchListener for NoopListener {
    fn message(&self, _stage: Stage, _level: Level, _message: &str) {}
}

/// Forwards messages to `tracing` at a matching level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl MatchListener for TracingListener {
    fn message(&self, stage: Stage, level: Level, message: &str) {
        match level {
            Level::Critical => tracing::error!(%stage, "{message}"),
            Level::Warning => tracing::warn!(%stage, "{message}"),
            Level::Info => tracing::info!(%stage, "{message}"),
        }
    }
}

/// A message captured by [`RecordingListener`].
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub stage: Stage,
    pub level: Level,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Collects every message it receives.
#[derive(Debug, Default)]
pub struct RecordingListener {
    messages: Mutex<Vec<StatusMessage>>,
}

impl RecordingListener {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the messages received so far.
    #[must_use]
    pub fn messages(&self) -> Vec<StatusMessage> {
        match self.messages.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages at the given level.
    #[must_use]
    pub fn at_level(&self, level: Level) -> Vec<StatusMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.level == level)
            .collect()
    }
}

impl MatchListener for RecordingListener {
    fn message(&self, stage: Stage, level: Level, message: &str) {
        let entry = StatusMessage {
            stage,
            level,
            message: message.to_string(),
            at: Utc::now(),
        };
        match self.messages.lock() {
            Ok(mut guard) => guard.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_listener_keeps_order_and_levels() {
        let rec = RecordingListener::new();
        rec.update_status(Stage::Matching, "first");
        rec.message(Stage::Matching, Level::Warning, "second");
        let all = rec.messages();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].message, "first");
        assert_eq!(all[0].level, Level::Info);
        assert_eq!(rec.at_level(Level::Warning)[0].message, "second");
    }

    #[test]
    fn noop_and_tracing_listeners_accept_messages() {
        NoopListener.update_status(Stage::Matching, "ignored");
        TracingListener.message(Stage::Failed, Level::Critical, "logged");
    }

    #[test]
    fn stage_display_is_snake_case() {
        assert_eq!(Stage::Matching.to_string(), "matching");
        let json = serde_json::to_string(&Stage::Finalizing).unwrap();
        assert_eq!(json, "\"finalizing\"");
    }
}
