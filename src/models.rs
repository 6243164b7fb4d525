use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown {kind} '{value}'")]
pub struct ParseKindError {
    kind: &'static str,
    value: String,
}

/// Mood category of an entry, in dashboard order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Pissed,
    Mad,
    Counting,
}

impl Mood {
    pub const ALL: [Mood; 3] = [Mood::Pissed, Mood::Mad, Mood::Counting];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Pissed => "pissed",
            Mood::Mad => "mad",
            Mood::Counting => "counting",
        }
    }

    /// Human label shown on boards and dashboards
    pub fn label(&self) -> &'static str {
        match self {
            Mood::Pissed => "Pissed",
            Mood::Mad => "Really MAD",
            Mood::Counting => "Count ur days",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Mood {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pissed" => Ok(Mood::Pissed),
            "mad" => Ok(Mood::Mad),
            "counting" => Ok(Mood::Counting),
            other => Err(ParseKindError { kind: "mood", value: other.to_string() }),
        }
    }
}

/// Lifecycle state of a punishment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PunishmentStatus {
    #[default]
    Pending,
    Evaluation,
    Completed,
}

impl PunishmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PunishmentStatus::Pending => "pending",
            PunishmentStatus::Evaluation => "evaluation",
            PunishmentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for PunishmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationDetails {
    pub learnings: String,
}

/// Punishment as it is stored: two flags that may disagree.
///
/// Only used at the storage boundary; everything else works on [`Punishment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PunishmentRecord {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PunishmentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_details: Option<EvaluationDetails>,
}

/// A self-assigned remediation task attached to a mood entry.
///
/// `id` is only unique within the parent entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PunishmentRecord", into = "PunishmentRecord")]
pub struct Punishment {
    pub id: String,
    pub text: String,
    pub status: PunishmentStatus,
    pub evaluation_details: Option<EvaluationDetails>,
}

impl Punishment {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            status: PunishmentStatus::Pending,
            evaluation_details: None,
        }
    }

    pub fn completed(&self) -> bool {
        self.status == PunishmentStatus::Completed
    }
}

impl From<PunishmentRecord> for Punishment {
    fn from(record: PunishmentRecord) -> Self {
        let status = crate::lifecycle::classify(&record);
        Self {
            id: record.id,
            text: record.text,
            status,
            evaluation_details: record.evaluation_details,
        }
    }
}

impl From<Punishment> for PunishmentRecord {
    fn from(p: Punishment) -> Self {
        Self {
            completed: p.completed(),
            id: p.id,
            text: p.text,
            status: Some(p.status),
            evaluation_details: p.evaluation_details,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub id: String,
    pub created_at: String, // RFC 3339, assigned by the store
    pub mood: Mood,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub punishments: Option<Vec<Punishment>>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl MoodEntry {
    pub fn punishments(&self) -> &[Punishment] {
        self.punishments.as_deref().unwrap_or(&[])
    }

    pub fn is_completed(&self) -> bool {
        self.completed.unwrap_or(false)
    }
}

/// Input for a new mood entry, before the store assigns id and timestamp
#[derive(Debug, Clone)]
pub struct NewMoodEntry {
    pub mood: Mood,
    pub event: String,
    pub description: Option<String>,
    pub punishments: Vec<String>,
}

impl NewMoodEntry {
    pub fn new(mood: Mood, event: impl Into<String>) -> Self {
        Self {
            mood,
            event: event.into(),
            description: None,
            punishments: Vec::new(),
        }
    }
}

/// Relationship board column, in board order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    #[serde(rename = "mad")]
    Mad,
    #[serde(rename = "ultraMad")]
    UltraMad,
    #[serde(rename = "uDead")]
    UDead,
}

impl Column {
    pub const ALL: [Column; 3] = [Column::Mad, Column::UltraMad, Column::UDead];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Mad => "mad",
            Column::UltraMad => "ultraMad",
            Column::UDead => "uDead",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Column::Mad => "Mad",
            Column::UltraMad => "Ultra Mad",
            Column::UDead => "U Dead",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Column {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_' && *c != ' ')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "mad" => Ok(Column::Mad),
            "ultramad" => Ok(Column::UltraMad),
            "udead" => Ok(Column::UDead),
            _ => Err(ParseKindError { kind: "column", value: s.to_string() }),
        }
    }
}

/// Checklist item on a relationship event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.into(),
            completed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipEvent {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub completion_percentage: u8,
    pub created_at: String,
    pub column_id: Column,
}

/// Relationship events split into their columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Board {
    pub mad: Vec<RelationshipEvent>,
    pub ultra_mad: Vec<RelationshipEvent>,
    pub u_dead: Vec<RelationshipEvent>,
}

impl Board {
    pub fn from_events(events: Vec<RelationshipEvent>) -> Self {
        let mut board = Board::default();
        for event in events {
            board.column_mut(event.column_id).push(event);
        }
        board
    }

    pub fn column(&self, column: Column) -> &[RelationshipEvent] {
        match column {
            Column::Mad => &self.mad,
            Column::UltraMad => &self.ultra_mad,
            Column::UDead => &self.u_dead,
        }
    }

    pub fn column_mut(&mut self, column: Column) -> &mut Vec<RelationshipEvent> {
        match column {
            Column::Mad => &mut self.mad,
            Column::UltraMad => &mut self.ultra_mad,
            Column::UDead => &mut self.u_dead,
        }
    }

    /// Find which column holds the event with `id`
    pub fn locate(&self, id: &str) -> Option<(Column, usize)> {
        Column::ALL.into_iter().find_map(|column| {
            self.column(column)
                .iter()
                .position(|e| e.id == id)
                .map(|index| (column, index))
        })
    }

    pub fn find(&self, id: &str) -> Option<&RelationshipEvent> {
        self.locate(id).map(|(column, index)| &self.column(column)[index])
    }

    pub fn events(&self) -> impl Iterator<Item = &RelationshipEvent> {
        self.mad.iter().chain(self.ultra_mad.iter()).chain(self.u_dead.iter())
    }

    pub fn len(&self) -> usize {
        self.mad.len() + self.ultra_mad.len() + self.u_dead.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
