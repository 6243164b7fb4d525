//! Relationship board repository: events in three columns, each with a task
//! checklist and a completion percentage derived from it.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::models::{Board, Column, RelationshipEvent, Task};
use crate::store::{Collection, OrderBy, Record, Store, StoreError};
use crate::utils;

#[derive(Debug, Error)]
pub enum RelationshipError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Failed to decode relationship event: {0}")]
    DecodeError(#[from] serde_json::Error),
    #[error("Event title cannot be empty")]
    EmptyTitle,
    #[error("Event '{0}' is not on the board")]
    EventNotFound(String),
    #[error("Task '{task_id}' not found on event '{event_id}'")]
    TaskNotFound { event_id: String, task_id: String },
}

/// `round(100 * completed / total)`, 0 for an empty checklist
pub fn completion_percentage(tasks: &[Task]) -> u8 {
    let done = tasks.iter().filter(|t| t.completed).count();
    utils::rounded_percent(done, tasks.len())
}

fn decode_event(row: Record) -> Result<RelationshipEvent, serde_json::Error> {
    serde_json::from_value(Value::Object(row))
}

/// Fields written by [`RelationshipRepository::update_event`]
fn event_changes(event: &RelationshipEvent) -> Result<Record, serde_json::Error> {
    let mut changes = Record::new();
    changes.insert("title".into(), Value::from(event.title.as_str()));
    // An absent description is left out, so tables without the column still accept updates
    if let Some(description) = event.description.as_deref() {
        changes.insert("description".into(), Value::from(description));
    }
    changes.insert("tasks".into(), serde_json::to_value(&event.tasks)?);
    changes.insert("completionPercentage".into(), Value::from(event.completion_percentage));
    Ok(changes)
}

pub struct RelationshipRepository<'a, S: Store + ?Sized> {
    store: &'a S,
    board: Board,
}

impl<'a, S: Store + ?Sized> RelationshipRepository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            board: Board::default(),
        }
    }

    pub fn load(store: &'a S) -> Result<Self, RelationshipError> {
        let mut repo = Self::new(store);
        repo.refresh()?;
        Ok(repo)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn event(&self, id: &str) -> Option<&RelationshipEvent> {
        self.board.find(id)
    }

    pub fn refresh(&mut self) -> Result<(), RelationshipError> {
        let rows = self
            .store
            .select(Collection::RelationshipEvents, Some(OrderBy::asc("createdAt")))?;
        let events = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.get("id").and_then(Value::as_str).unwrap_or("?").to_string();
                decode_event(row)
                    .map_err(|e| warn!(%id, "skipping unreadable relationship event: {}", e))
                    .ok()
            })
            .collect();
        self.board = Board::from_events(events);
        debug!(events = self.board.len(), "relationship board refreshed");
        Ok(())
    }

    /// Create an event with an empty checklist at the bottom of `column`
    pub fn add_event(&mut self, title: &str, description: Option<&str>, column: Column) -> Result<RelationshipEvent, RelationshipError> {
        if title.trim().is_empty() {
            return Err(RelationshipError::EmptyTitle);
        }

        let mut record = Record::new();
        record.insert("title".into(), Value::from(title));
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            record.insert("description".into(), Value::from(description));
        }
        record.insert("tasks".into(), Value::Array(Vec::new()));
        record.insert("completionPercentage".into(), Value::from(0));
        record.insert("createdAt".into(), Value::from(utils::now_timestamp()));
        record.insert("columnId".into(), Value::from(column.as_str()));

        let row = self.store.insert(Collection::RelationshipEvents, record).map_err(|e| {
            error!("Error adding event: {}", e);
            e
        })?;
        let event = decode_event(row)?;
        info!(id = %event.id, column = column.as_str(), "relationship event created");
        self.board.column_mut(event.column_id).push(event.clone());
        Ok(event)
    }

    /// Persist title, description and checklist; the percentage is recomputed first
    pub fn update_event(&mut self, mut event: RelationshipEvent) -> Result<RelationshipEvent, RelationshipError> {
        event.completion_percentage = completion_percentage(&event.tasks);

        if let Err(e) = self
            .store
            .update(Collection::RelationshipEvents, &event.id, event_changes(&event)?)
        {
            error!("Error updating event: {}", e);
            return Err(e.into());
        }

        self.patch_local(&event);
        Ok(event)
    }

    fn patch_local(&mut self, event: &RelationshipEvent) {
        if let Some((column, index)) = self.board.locate(&event.id) {
            let slot = &mut self.board.column_mut(column)[index];
            // Column membership only changes through move_event
            *slot = RelationshipEvent {
                column_id: slot.column_id,
                ..event.clone()
            };
        }
    }

    /// Delete an event. Returns `false` when the id is on no column.
    pub fn delete_event(&mut self, id: &str) -> Result<bool, RelationshipError> {
        let Some((column, _)) = self.board.locate(id) else {
            return Ok(false);
        };

        if let Err(e) = self.store.delete(Collection::RelationshipEvents, id) {
            error!("Error deleting event: {}", e);
            return Err(e.into());
        }

        self.board.column_mut(column).retain(|e| e.id != id);
        info!(%id, "relationship event deleted");
        Ok(true)
    }

    /// Move an event between (or within) columns and persist its new column.
    ///
    /// Local state changes before the write and is not rolled back if the write fails.
    pub fn move_event(&mut self, id: &str, from: Column, to: Column, index: usize) -> Result<bool, RelationshipError> {
        let Some(position) = self.board.column(from).iter().position(|e| e.id == id) else {
            return Ok(false);
        };
        if from == to && position == index {
            return Ok(false);
        }

        let mut event = self.board.column_mut(from).remove(position);
        event.column_id = to;
        let destination = self.board.column_mut(to);
        let index = index.min(destination.len());
        destination.insert(index, event);

        let mut changes = Record::new();
        changes.insert("columnId".into(), Value::from(to.as_str()));
        if let Err(e) = self.store.update(Collection::RelationshipEvents, id, changes) {
            warn!(%id, "column move not persisted: {}", e);
            return Err(e.into());
        }
        debug!(%id, from = from.as_str(), to = to.as_str(), index, "event moved");
        Ok(true)
    }

    /// Append a task to an event's checklist. Blank descriptions are ignored.
    pub fn add_task(&mut self, event_id: &str, description: &str) -> Result<Option<Task>, RelationshipError> {
        if description.trim().is_empty() {
            return Ok(None);
        }
        let mut event = self
            .event(event_id)
            .cloned()
            .ok_or_else(|| RelationshipError::EventNotFound(event_id.to_string()))?;

        let task = Task::new(description);
        event.tasks.push(task.clone());
        self.update_event(event)?;
        Ok(Some(task))
    }

    /// Flip a task, updating the board before the write goes out.
    ///
    /// If the write fails the board keeps the new state until the next refresh.
    pub fn toggle_task(&mut self, event_id: &str, task_id: &str) -> Result<RelationshipEvent, RelationshipError> {
        let (column, index) = self
            .board
            .locate(event_id)
            .ok_or_else(|| RelationshipError::EventNotFound(event_id.to_string()))?;

        let event = &mut self.board.column_mut(column)[index];
        let task = event
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| RelationshipError::TaskNotFound {
                event_id: event_id.to_string(),
                task_id: task_id.to_string(),
            })?;
        task.completed = !task.completed;
        event.completion_percentage = completion_percentage(&event.tasks);
        let event = event.clone();

        if let Err(e) = self
            .store
            .update(Collection::RelationshipEvents, &event.id, event_changes(&event)?)
        {
            warn!(id = %event.id, "task toggle not persisted: {}", e);
            return Err(e.into());
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks(done: &[bool]) -> Vec<Task> {
        done.iter()
            .map(|&completed| Task { completed, ..Task::new("t") })
            .collect()
    }

    #[test]
    fn percentage_of_empty_checklist_is_zero() {
        assert_eq!(completion_percentage(&[]), 0);
    }

    #[test]
    fn percentage_rounds_to_nearest() {
        assert_eq!(completion_percentage(&tasks(&[true, false, false])), 33);
        assert_eq!(completion_percentage(&tasks(&[true, true, false])), 67);
        assert_eq!(completion_percentage(&tasks(&[true, true])), 100);
    }
}
