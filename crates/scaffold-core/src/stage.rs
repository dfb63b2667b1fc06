//! Pipeline stage machine
//!
//! A run moves strictly forward through
//! `Pending → Acquired → Inventoried → Aggregated → Planned → Emitted → Reported`.
//! There is no retry edge: a failed run keeps the last stage it completed.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StageError;

/// Stage a run has completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Nothing done yet
    Pending,
    /// Repository is available locally
    Acquired,
    /// File summaries are built
    Inventoried,
    /// Project model is built
    Aggregated,
    /// Test plans are built
    Planned,
    /// Test files are rendered
    Emitted,
    /// Report and files are written
    Reported,
}

impl Stage {
    /// Every stage in order
    pub const ALL: [Stage; 7] = [
        Stage::Pending,
        Stage::Acquired,
        Stage::Inventoried,
        Stage::Aggregated,
        Stage::Planned,
        Stage::Emitted,
        Stage::Reported,
    ];

    /// Lowercase name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Acquired => "acquired",
            Stage::Inventoried => "inventoried",
            Stage::Aggregated => "aggregated",
            Stage::Planned => "planned",
            Stage::Emitted => "emitted",
            Stage::Reported => "reported",
        }
    }

    /// Whether no further transition exists
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        *self == Stage::Reported
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stages reachable from `from`
#[must_use]
pub fn allowed_transitions(from: Stage) -> Vec<Stage> {
    use Stage::*;
    match from {
        Pending => vec![Acquired],
        Acquired => vec![Inventoried],
        Inventoried => vec![Aggregated],
        Aggregated => vec![Planned],
        Planned => vec![Emitted],
        Emitted => vec![Reported],
        Reported => vec![],
    }
}

/// Check a transition
///
/// # Errors
/// [`StageError`] when `to` is not reachable from `from`
pub fn validate_transition(from: Stage, to: Stage) -> Result<(), StageError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StageError { from, to })
    }
}

/// Current stage of a run and when each stage was reached
#[derive(Debug, Clone, Serialize)]
pub struct StageTracker {
    current: Stage,
    history: Vec<(Stage, DateTime<Utc>)>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    /// Tracker at [`Stage::Pending`]
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Stage::Pending,
            history: vec![(Stage::Pending, Utc::now())],
        }
    }

    /// Last completed stage
    #[inline]
    #[must_use]
    pub fn current(&self) -> Stage {
        self.current
    }

    /// Stages reached with timestamps, oldest first
    #[inline]
    #[must_use]
    pub fn history(&self) -> &[(Stage, DateTime<Utc>)] {
        &self.history
    }

    /// When the run started
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.history.first().map_or_else(Utc::now, |(_, at)| *at)
    }

    /// Move to `to`
    ///
    /// # Errors
    /// [`StageError`] on an illegal transition; the tracker is unchanged
    pub fn advance(&mut self, to: Stage) -> Result<(), StageError> {
        validate_transition(self.current, to)?;
        debug!(from = %self.current, to = %to, "stage completed");
        self.current = to;
        self.history.push((to, Utc::now()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_next_stage_is_reachable() {
        for pair in Stage::ALL.windows(2) {
            assert!(validate_transition(pair[0], pair[1]).is_ok());
        }
        for from in Stage::ALL {
            for to in Stage::ALL {
                let forward = Stage::ALL.iter().position(|s| *s == to) == Stage::ALL.iter().position(|s| *s == from).map(|i| i + 1);
                assert_eq!(validate_transition(from, to).is_ok(), forward, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn tracker_rejects_skips_and_retries() {
        let mut tracker = StageTracker::new();
        tracker.advance(Stage::Acquired).unwrap();
        assert_eq!(
            tracker.advance(Stage::Planned),
            Err(StageError {
                from: Stage::Acquired,
                to: Stage::Planned
            })
        );
        assert_eq!(tracker.advance(Stage::Acquired).unwrap_err().to, Stage::Acquired);
        assert_eq!(tracker.current(), Stage::Acquired);
        assert_eq!(tracker.history().len(), 2);
        assert!(!tracker.current().is_terminal());
    }
}
