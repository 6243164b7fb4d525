//! Punishment lifecycle: pending -> evaluation -> completed, with reject
//! sending an item back to pending.
//!
//! Everything here is a pure transformation. Persisting the result is up to
//! [`crate::mood::MoodRepository`].

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{EvaluationDetails, Mood, MoodEntry, Punishment, PunishmentRecord, PunishmentStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Invalid punishment action '{0}' (expected submit, approve or reject)")]
    InvalidAction(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunishmentAction {
    Submit,
    Approve,
    Reject,
}

impl FromStr for PunishmentAction {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "submit" => Ok(PunishmentAction::Submit),
            "approve" => Ok(PunishmentAction::Approve),
            "reject" => Ok(PunishmentAction::Reject),
            _ => Err(LifecycleError::InvalidAction(s.to_string())),
        }
    }
}

impl fmt::Display for PunishmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PunishmentAction::Submit => "submit",
            PunishmentAction::Approve => "approve",
            PunishmentAction::Reject => "reject",
        })
    }
}

/// Compute the next state of a punishment for `action`
pub fn apply_action(punishment: &Punishment, action: PunishmentAction) -> Punishment {
    let status = match action {
        PunishmentAction::Submit => PunishmentStatus::Evaluation,
        PunishmentAction::Approve => PunishmentStatus::Completed,
        PunishmentAction::Reject => PunishmentStatus::Pending,
    };
    Punishment { status, ..punishment.clone() }
}

/// Submit for evaluation, recording what was learned.
/// Blank learnings clear any previous details.
pub fn submit_with_learnings(punishment: &Punishment, learnings: Option<&str>) -> Punishment {
    let mut next = apply_action(punishment, PunishmentAction::Submit);
    next.evaluation_details = learnings
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| EvaluationDetails { learnings: l.to_string() });
    next
}

/// Checkbox behaviour: completed items go back to pending, anything else is approved
pub fn toggle(punishment: &Punishment) -> Punishment {
    if punishment.completed() {
        apply_action(punishment, PunishmentAction::Reject)
    } else {
        apply_action(punishment, PunishmentAction::Approve)
    }
}

/// Derived completion of a parent entry.
///
/// An entry without punishments keeps whatever flag it was stored with.
pub fn derive_entry_completion(punishments: &[Punishment], stored: bool) -> bool {
    if punishments.is_empty() {
        return stored;
    }
    punishments.iter().all(Punishment::completed)
}

/// Bucket for a stored punishment. The completed flag dominates the status field.
pub fn classify(record: &PunishmentRecord) -> PunishmentStatus {
    if record.completed {
        PunishmentStatus::Completed
    } else {
        record.status.unwrap_or_default()
    }
}

/// A punishment together with the entry it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPunishment {
    pub entry_id: String,
    pub mood: Mood,
    pub event: String,
    pub created_at: String,
    pub punishment: Punishment,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PunishmentBuckets {
    pub pending: Vec<TrackedPunishment>,
    pub evaluation: Vec<TrackedPunishment>,
    pub completed: Vec<TrackedPunishment>,
}

impl PunishmentBuckets {
    pub fn bucket(&self, status: PunishmentStatus) -> &[TrackedPunishment] {
        match status {
            PunishmentStatus::Pending => &self.pending,
            PunishmentStatus::Evaluation => &self.evaluation,
            PunishmentStatus::Completed => &self.completed,
        }
    }

    pub fn stats(&self) -> PunishmentStats {
        PunishmentStats {
            total: self.pending.len() + self.evaluation.len() + self.completed.len(),
            pending: self.pending.len(),
            in_evaluation: self.evaluation.len(),
            completed: self.completed.len(),
        }
    }
}

/// Split every punishment of every entry into exactly one bucket
pub fn partition<'a>(entries: impl IntoIterator<Item = &'a MoodEntry>) -> PunishmentBuckets {
    let mut buckets = PunishmentBuckets::default();
    for entry in entries {
        for punishment in entry.punishments() {
            let tracked = TrackedPunishment {
                entry_id: entry.id.clone(),
                mood: entry.mood,
                event: entry.event.clone(),
                created_at: entry.created_at.clone(),
                punishment: punishment.clone(),
            };
            match punishment.status {
                PunishmentStatus::Pending => buckets.pending.push(tracked),
                PunishmentStatus::Evaluation => buckets.evaluation.push(tracked),
                PunishmentStatus::Completed => buckets.completed.push(tracked),
            }
        }
    }
    buckets
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PunishmentStats {
    pub total: usize,
    pub pending: usize,
    pub in_evaluation: usize,
    pub completed: usize,
}

impl PunishmentStats {
    /// Completed share as a rounded percentage, 0 when there is nothing to do
    pub fn completion_rate(&self) -> u8 {
        crate::utils::rounded_percent(self.completed, self.total)
    }

    /// Everything that is not completed yet, evaluation included
    pub fn outstanding(&self) -> usize {
        self.total - self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_status(status: PunishmentStatus) -> Punishment {
        Punishment { status, ..Punishment::new("0", "apologize") }
    }

    fn all_states() -> Vec<Punishment> {
        vec![
            with_status(PunishmentStatus::Pending),
            with_status(PunishmentStatus::Evaluation),
            with_status(PunishmentStatus::Completed),
        ]
    }

    #[test]
    fn submit_moves_to_evaluation() {
        let next = apply_action(&Punishment::new("0", "apologize"), PunishmentAction::Submit);
        assert_eq!(next.status, PunishmentStatus::Evaluation);
        assert!(!next.completed());
    }

    #[test]
    fn approve_always_completes() {
        for p in all_states() {
            let next = apply_action(&p, PunishmentAction::Approve);
            assert!(next.completed());
            assert_eq!(next.status, PunishmentStatus::Completed);
        }
    }

    #[test]
    fn reject_always_returns_to_pending() {
        for p in all_states() {
            let next = apply_action(&p, PunishmentAction::Reject);
            assert!(!next.completed());
            assert_eq!(next.status, PunishmentStatus::Pending);
        }
    }

    #[test]
    fn approve_is_idempotent() {
        for p in all_states() {
            let once = apply_action(&p, PunishmentAction::Approve);
            assert_eq!(apply_action(&once, PunishmentAction::Approve), once);
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert_eq!(
            "forgive".parse::<PunishmentAction>(),
            Err(LifecycleError::InvalidAction("forgive".to_string()))
        );
        assert_eq!(" Approve ".parse::<PunishmentAction>(), Ok(PunishmentAction::Approve));
    }

    #[test]
    fn learnings_are_kept_only_when_present() {
        let p = Punishment::new("0", "apologize");
        let next = submit_with_learnings(&p, Some("  listen first "));
        assert_eq!(next.status, PunishmentStatus::Evaluation);
        assert_eq!(next.evaluation_details.unwrap().learnings, "listen first");
        assert!(submit_with_learnings(&p, Some("   ")).evaluation_details.is_none());
    }

    #[test]
    fn toggle_flips_completion() {
        let p = Punishment::new("0", "apologize");
        let done = toggle(&p);
        assert!(done.completed());
        assert_eq!(toggle(&done).status, PunishmentStatus::Pending);
    }

    #[test]
    fn entry_completion_requires_every_punishment() {
        let done = with_status(PunishmentStatus::Completed);
        let waiting = with_status(PunishmentStatus::Evaluation);
        assert!(derive_entry_completion(&[done.clone(), done.clone()], false));
        assert!(!derive_entry_completion(&[done, waiting], true));
    }

    #[test]
    fn entry_without_punishments_keeps_stored_flag() {
        assert!(!derive_entry_completion(&[], false));
        assert!(derive_entry_completion(&[], true));
    }

    #[test]
    fn classify_defaults_missing_status_to_pending() {
        let record = PunishmentRecord {
            id: "0".into(),
            text: "apologize".into(),
            completed: false,
            status: None,
            evaluation_details: None,
        };
        assert_eq!(classify(&record), PunishmentStatus::Pending);
        let stale = PunishmentRecord { completed: true, status: Some(PunishmentStatus::Evaluation), ..record };
        assert_eq!(classify(&stale), PunishmentStatus::Completed);
    }

    #[test]
    fn partition_is_disjoint_and_exhaustive() {
        let entry = MoodEntry {
            id: "e1".into(),
            created_at: "2026-03-01T10:00:00Z".into(),
            mood: Mood::Mad,
            event: "forgot anniversary".into(),
            description: None,
            punishments: Some(all_states()),
            completed: Some(false),
            user_id: None,
        };
        let empty = MoodEntry { id: "e2".into(), punishments: None, ..entry.clone() };
        let buckets = partition([&entry, &empty]);
        let stats = buckets.stats();
        assert_eq!(stats.total, 3);
        assert_eq!((stats.pending, stats.in_evaluation, stats.completed), (1, 1, 1));
        assert_eq!(stats.outstanding(), 2);
        assert_eq!(stats.completion_rate(), 33);
        assert!(buckets.completed.iter().all(|t| t.punishment.completed()));
        assert_eq!(buckets.bucket(PunishmentStatus::Evaluation)[0].entry_id, "e1");
    }
}
