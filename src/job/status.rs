//! Job status and the legal transitions between statuses.

use serde::{Deserialize, Serialize};

/// Pipeline status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Submitted, waiting for the worker.
    #[default]
    Queued,
    /// Document analysis is running.
    Extracting,
    /// Script generation and chunking are running.
    Scripting,
    /// Speech synthesis is running.
    SynthesizingAudio,
    /// Audio is being copied to the sync location.
    Delivering,
    /// Finished successfully.
    Done,
    /// Finished with an error.
    Failed,
}

impl JobStatus {
    /// Every status, in pipeline order.
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Queued,
        JobStatus::Extracting,
        JobStatus::Scripting,
        JobStatus::SynthesizingAudio,
        JobStatus::Delivering,
        JobStatus::Done,
        JobStatus::Failed,
    ];

    /// Statuses a job can still leave.
    pub const ACTIVE: [JobStatus; 5] = [
        JobStatus::Queued,
        JobStatus::Extracting,
        JobStatus::Scripting,
        JobStatus::SynthesizingAudio,
        JobStatus::Delivering,
    ];

    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Extracting => "extracting",
            JobStatus::Scripting => "scripting",
            JobStatus::SynthesizingAudio => "synthesizing_audio",
            JobStatus::Delivering => "delivering",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no outgoing transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// Statuses reachable from this one in a single step.
    pub fn allowed_next(&self) -> &'static [JobStatus] {
        match self {
            JobStatus::Queued => &[JobStatus::Extracting, JobStatus::Failed],
            JobStatus::Extracting => &[JobStatus::Scripting, JobStatus::Failed],
            // Done directly when audio is disabled.
            JobStatus::Scripting => &[
                JobStatus::SynthesizingAudio,
                JobStatus::Done,
                JobStatus::Failed,
            ],
            JobStatus::SynthesizingAudio => &[JobStatus::Delivering, JobStatus::Failed],
            JobStatus::Delivering => &[JobStatus::Done, JobStatus::Failed],
            JobStatus::Done | JobStatus::Failed => &[],
        }
    }

    /// Whether `next` is a legal successor of this status.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        self.allowed_next().contains(&next)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        JobStatus::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown job status: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses_have_no_successors() {
        for status in JobStatus::ALL {
            assert_eq!(status.is_terminal(), status.allowed_next().is_empty());
        }
    }

    #[test]
    fn test_parse_round_trips_names() {
        for status in JobStatus::ALL {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("tts".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_active_excludes_terminal() {
        assert!(JobStatus::ACTIVE.iter().all(|s| !s.is_terminal()));
        assert_eq!(JobStatus::ACTIVE.len() + 2, JobStatus::ALL.len());
    }
}
