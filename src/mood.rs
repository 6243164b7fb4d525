//! Mood entry repository: inserts with graceful schema degradation and the
//! punishment workflow on top of [`crate::lifecycle`].

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::inflight::InFlight;
use crate::lifecycle::{self, PunishmentAction, PunishmentBuckets};
use crate::models::{Mood, MoodEntry, NewMoodEntry, Punishment};
use crate::store::{Collection, OrderBy, Record, Store, StoreError};

#[derive(Debug, Error)]
pub enum MoodError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Failed to decode mood entry: {0}")]
    DecodeError(#[from] serde_json::Error),
    #[error("What happened? Event text cannot be empty")]
    EmptyEvent,
    #[error("Punishment '{punishment_id}' not found on entry '{entry_id}'")]
    PunishmentNotFound { entry_id: String, punishment_id: String },
}

/// Optional columns of a mood entry insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryField {
    Description,
    Punishments,
    Completed,
}

impl EntryField {
    pub fn column(&self) -> &'static str {
        match self {
            EntryField::Description => "description",
            EntryField::Punishments => "punishments",
            EntryField::Completed => "completed",
        }
    }
}

/// Optional field sets tried in order when inserting; mood and event are always sent
pub const INSERT_LADDER: &[&[EntryField]] = &[
    &[EntryField::Description, EntryField::Punishments, EntryField::Completed],
    &[EntryField::Description, EntryField::Punishments],
    &[EntryField::Description],
    &[],
];

/// Next rung after a schema error on `column` at `step`, if any rung drops it
fn next_rung(step: usize, column: &str) -> Option<usize> {
    let carried = INSERT_LADDER[step].iter().any(|f| f.column() == column);
    if !carried {
        return None;
    }
    (step + 1..INSERT_LADDER.len()).find(|&i| INSERT_LADDER[i].iter().all(|f| f.column() != column))
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    pub entry: MoodEntry,
    /// Supplied fields the store could not keep
    pub dropped: Vec<EntryField>,
    /// Punishments were persisted, so punishment views should reload
    pub refresh_punishments: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PunishmentUpdate {
    Applied { punishment: Punishment, entry_completed: bool },
    /// A request for the same punishment was still running
    Suppressed,
}

fn punishment_key(entry_id: &str, punishment_id: &str) -> String {
    format!("{}/{}", entry_id, punishment_id)
}

fn decode_entry(row: Record) -> Result<MoodEntry, serde_json::Error> {
    serde_json::from_value(Value::Object(row))
}

pub struct MoodRepository<'a, S: Store + ?Sized> {
    store: &'a S,
    entries: Vec<MoodEntry>,
    in_flight: InFlight,
}

impl<'a, S: Store + ?Sized> MoodRepository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self::with_in_flight(store, InFlight::new())
    }

    /// Share the in-flight set with a view that disables controls while busy
    pub fn with_in_flight(store: &'a S, in_flight: InFlight) -> Self {
        Self {
            store,
            entries: Vec::new(),
            in_flight,
        }
    }

    /// Create the repository and fetch the collection once
    pub fn load(store: &'a S) -> Result<Self, MoodError> {
        let mut repo = Self::new(store);
        repo.refresh()?;
        Ok(repo)
    }

    /// Newest first
    pub fn entries(&self) -> &[MoodEntry] {
        &self.entries
    }

    pub fn entry(&self, id: &str) -> Option<&MoodEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entries_with_mood(&self, mood: Mood) -> impl Iterator<Item = &MoodEntry> {
        self.entries.iter().filter(move |e| e.mood == mood)
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Replace the cache with the store's current rows. Rows that do not decode are skipped.
    pub fn refresh(&mut self) -> Result<(), MoodError> {
        let rows = self
            .store
            .select(Collection::MoodEntries, Some(OrderBy::desc("created_at")))?;
        self.entries = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.get("id").and_then(Value::as_str).unwrap_or("?").to_string();
                decode_entry(row)
                    .map_err(|e| warn!(%id, "skipping unreadable mood entry: {}", e))
                    .ok()
            })
            .collect();
        debug!(entries = self.entries.len(), "mood entries refreshed");
        Ok(())
    }

    /// Refresh after a write that already succeeded; a failed read only leaves the cache stale
    fn resync(&mut self) {
        if let Err(e) = self.refresh() {
            error!("Error fetching entries: {}", e);
        }
    }

    /// Insert a new entry, dropping optional fields the store does not know
    pub fn create_entry(&mut self, new: NewMoodEntry) -> Result<CreateOutcome, MoodError> {
        if new.event.trim().is_empty() {
            return Err(MoodError::EmptyEvent);
        }

        let description = new
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let punishments: Vec<Punishment> = new
            .punishments
            .iter()
            .filter(|text| !text.trim().is_empty())
            .enumerate()
            .map(|(i, text)| Punishment::new(i.to_string(), text.as_str()))
            .collect();

        let mut step = 0;
        let mut completed_rejected = false;
        let row = loop {
            let fields = INSERT_LADDER[step];
            let mut record = Record::new();
            record.insert("mood".into(), Value::from(new.mood.as_str()));
            record.insert("event".into(), Value::from(new.event.as_str()));
            for field in fields {
                match field {
                    EntryField::Description => {
                        if let Some(d) = &description {
                            record.insert(field.column().into(), Value::from(d.as_str()));
                        }
                    }
                    EntryField::Punishments => {
                        if !punishments.is_empty() {
                            record.insert(field.column().into(), serde_json::to_value(&punishments)?);
                        }
                    }
                    EntryField::Completed => {
                        record.insert(field.column().into(), Value::Bool(false));
                    }
                }
            }

            match self.store.insert(Collection::MoodEntries, record) {
                Ok(row) => break row,
                Err(e) => match e.schema_field().and_then(|column| next_rung(step, column)) {
                    Some(next) => {
                        warn!(step, error = %e, "entry insert rejected, retrying with fewer fields");
                        completed_rejected |= e.schema_field() == Some(EntryField::Completed.column());
                        step = next;
                    }
                    None => {
                        error!("Failed to add entry: {}", e);
                        return Err(e.into());
                    }
                },
            }
        };

        let kept = INSERT_LADDER[step];
        let mut dropped = Vec::new();
        if description.is_some() && !kept.contains(&EntryField::Description) {
            dropped.push(EntryField::Description);
        }
        if !punishments.is_empty() && !kept.contains(&EntryField::Punishments) {
            dropped.push(EntryField::Punishments);
        }
        // Only a loss when the store named it; otherwise the column default applies
        if completed_rejected {
            dropped.push(EntryField::Completed);
        }
        let refresh_punishments = !punishments.is_empty() && kept.contains(&EntryField::Punishments);

        let entry = decode_entry(row)?;
        info!(id = %entry.id, mood = entry.mood.as_str(), ?dropped, "mood entry created");
        self.resync();

        Ok(CreateOutcome {
            entry,
            dropped,
            refresh_punishments,
        })
    }

    /// Persist a punishment list and the completion derived from it in one update
    pub fn update_punishments(&mut self, entry_id: &str, punishments: &[Punishment]) -> Result<bool, MoodError> {
        let stored = self.entry(entry_id).is_some_and(MoodEntry::is_completed);
        let completed = lifecycle::derive_entry_completion(punishments, stored);
        self.write_punishments(entry_id, punishments, completed)?;
        Ok(completed)
    }

    fn write_punishments(&mut self, entry_id: &str, punishments: &[Punishment], completed: bool) -> Result<(), MoodError> {
        let mut changes = Record::new();
        changes.insert("punishments".into(), serde_json::to_value(punishments)?);
        changes.insert("completed".into(), Value::Bool(completed));

        let mut result = self.store.update(Collection::MoodEntries, entry_id, changes.clone());
        if let Err(e) = &result {
            if e.schema_field() == Some(EntryField::Completed.column()) {
                warn!(%entry_id, "store has no completed column, writing punishments only");
                changes.remove(EntryField::Completed.column());
                result = self.store.update(Collection::MoodEntries, entry_id, changes);
            }
        }
        if let Err(e) = result {
            error!("Error updating punishment: {}", e);
            return Err(e.into());
        }
        debug!(%entry_id, completed, "punishments updated");
        self.resync();
        Ok(())
    }

    /// Run `action` on one punishment and persist the result
    pub fn apply_action(&mut self, entry_id: &str, punishment_id: &str, action: PunishmentAction) -> Result<PunishmentUpdate, MoodError> {
        self.mutate_punishment(entry_id, punishment_id, |p| lifecycle::apply_action(p, action))
    }

    /// Send a punishment for evaluation together with what was learned
    pub fn submit_for_evaluation(&mut self, entry_id: &str, punishment_id: &str, learnings: Option<&str>) -> Result<PunishmentUpdate, MoodError> {
        self.mutate_punishment(entry_id, punishment_id, |p| lifecycle::submit_with_learnings(p, learnings))
    }

    pub fn toggle_punishment(&mut self, entry_id: &str, punishment_id: &str) -> Result<PunishmentUpdate, MoodError> {
        self.mutate_punishment(entry_id, punishment_id, lifecycle::toggle)
    }

    fn mutate_punishment(
        &mut self,
        entry_id: &str,
        punishment_id: &str,
        change: impl FnOnce(&Punishment) -> Punishment,
    ) -> Result<PunishmentUpdate, MoodError> {
        let Some(_ticket) = self.in_flight.try_acquire(punishment_key(entry_id, punishment_id)) else {
            debug!(%entry_id, %punishment_id, "punishment update already in flight");
            return Ok(PunishmentUpdate::Suppressed);
        };

        // Work from the stored row, not the possibly stale cache
        let current = match self.store.select_by_id(Collection::MoodEntries, entry_id) {
            Ok(row) => decode_entry(row)?,
            Err(e) => {
                if e.is_not_found() {
                    self.resync();
                }
                return Err(e.into());
            }
        };
        let stored = current.is_completed();

        let mut punishments = match current.punishments {
            Some(p) if !p.is_empty() => p,
            _ => {
                error!("Entry {} not found or has no punishments", entry_id);
                self.resync();
                return Err(StoreError::NotFound {
                    collection: Collection::MoodEntries,
                    id: entry_id.to_string(),
                }
                .into());
            }
        };

        let Some(index) = punishments.iter().position(|p| p.id == punishment_id) else {
            self.resync();
            return Err(MoodError::PunishmentNotFound {
                entry_id: entry_id.to_string(),
                punishment_id: punishment_id.to_string(),
            });
        };

        punishments[index] = change(&punishments[index]);
        let completed = lifecycle::derive_entry_completion(&punishments, stored);
        self.write_punishments(entry_id, &punishments, completed)?;

        Ok(PunishmentUpdate::Applied {
            punishment: punishments.swap_remove(index),
            entry_completed: completed,
        })
    }

    /// Punishments of every cached entry, split by lifecycle state
    pub fn punishment_board(&self) -> PunishmentBuckets {
        lifecycle::partition(self.entries.iter().filter(|e| !e.punishments().is_empty()))
    }
}
