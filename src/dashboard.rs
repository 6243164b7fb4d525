//! Dashboard aggregates over a snapshot of entries or events.

use std::fmt;

use crate::models::{Column, Mood, MoodEntry, RelationshipEvent};
use crate::utils;

/// Events in the task-completion breakdown
const TASK_BREAKDOWN_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodStatus {
    Chill,
    Concerned,
    Critical,
}

impl MoodStatus {
    pub fn advice(&self) -> &'static str {
        match self {
            MoodStatus::Chill => "Everything seems to be going smoothly! Keep that positive energy flowing.",
            MoodStatus::Concerned => "Might be time for some self-care. Consider a warm bath or your favorite comfort food.",
            MoodStatus::Critical => "Things are looking pretty intense! Might be time to talk to someone or take a mental health day.",
        }
    }
}

impl fmt::Display for MoodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MoodStatus::Chill => "Chill",
            MoodStatus::Concerned => "Concerned",
            MoodStatus::Critical => "Critical",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipStatus {
    Good,
    Concerning,
    Critical,
}

impl RelationshipStatus {
    pub fn advice(&self) -> &'static str {
        match self {
            RelationshipStatus::Good => "Relationship looking healthy! Keep up the great communication.",
            RelationshipStatus::Concerning => "Might be time for a heart-to-heart. Consider a nice dinner and open conversation.",
            RelationshipStatus::Critical => "Better start sleeping with one eye open. Seriously though, professional counseling might help!",
        }
    }
}

impl fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RelationshipStatus::Good => "Good",
            RelationshipStatus::Concerning => "Concerning",
            RelationshipStatus::Critical => "Critical",
        })
    }
}

/// Shared thresholds: severe share > 30% is critical; elevated share > 40%
/// or severe share > 10% is the middle level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Low,
    Middle,
    High,
}

fn level(elevated: usize, severe: usize, total: usize) -> Level {
    if total == 0 {
        return Level::Low;
    }
    let share = |n: usize| n as f64 / total as f64 * 100.0;
    if share(severe) > 30.0 {
        Level::High
    } else if share(elevated) > 40.0 || share(severe) > 10.0 {
        Level::Middle
    } else {
        Level::Low
    }
}

/// Index of the largest count; ties go to the earliest index
fn argmax(counts: &[usize]) -> usize {
    let mut best = 0;
    for (i, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = i;
        }
    }
    best
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoodCounts {
    pub pissed: usize,
    pub mad: usize,
    pub counting: usize,
}

impl MoodCounts {
    pub fn get(&self, mood: Mood) -> usize {
        match mood {
            Mood::Pissed => self.pissed,
            Mood::Mad => self.mad,
            Mood::Counting => self.counting,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoodMetrics {
    pub total: usize,
    pub by_mood: MoodCounts,
    /// Most recent first
    pub recent: Vec<MoodEntry>,
    pub status: MoodStatus,
}

impl MoodMetrics {
    pub fn compute(entries: &[MoodEntry], recent_limit: usize) -> Self {
        let mut by_mood = MoodCounts::default();
        for entry in entries {
            match entry.mood {
                Mood::Pissed => by_mood.pissed += 1,
                Mood::Mad => by_mood.mad += 1,
                Mood::Counting => by_mood.counting += 1,
            }
        }

        let mut recent: Vec<MoodEntry> = entries.to_vec();
        // Unparseable timestamps sort last
        recent.sort_by(|a, b| {
            utils::parse_timestamp(&b.created_at).cmp(&utils::parse_timestamp(&a.created_at))
        });
        recent.truncate(recent_limit);

        let total = entries.len();
        let status = match level(by_mood.mad, by_mood.counting, total) {
            Level::Low => MoodStatus::Chill,
            Level::Middle => MoodStatus::Concerned,
            Level::High => MoodStatus::Critical,
        };

        Self { total, by_mood, recent, status }
    }

    /// Mood with the most entries; ties go to the earlier of pissed, mad, counting
    pub fn most_common(&self) -> Mood {
        let counts = Mood::ALL.map(|m| self.by_mood.get(m));
        Mood::ALL[argmax(&counts)]
    }

    /// Share of "count ur days" entries, rounded percent
    pub fn critical_share(&self) -> u8 {
        utils::rounded_percent(self.by_mood.counting, self.total)
    }

    pub fn share(&self, mood: Mood) -> u8 {
        utils::rounded_percent(self.by_mood.get(mood), self.total)
    }

    pub fn advice(&self) -> &'static str {
        self.status.advice()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnCounts {
    pub mad: usize,
    pub ultra_mad: usize,
    pub u_dead: usize,
}

impl ColumnCounts {
    pub fn get(&self, column: Column) -> usize {
        match column {
            Column::Mad => self.mad,
            Column::UltraMad => self.ultra_mad,
            Column::UDead => self.u_dead,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCompletion {
    pub title: String,
    pub completion: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipMetrics {
    pub total: usize,
    pub by_column: ColumnCounts,
    pub average_completion: u8,
    pub task_completion_by_event: Vec<TaskCompletion>,
    pub status: RelationshipStatus,
}

impl RelationshipMetrics {
    pub fn compute<'a>(events: impl IntoIterator<Item = &'a RelationshipEvent>) -> Self {
        let mut by_column = ColumnCounts::default();
        let mut completion_sum = 0usize;
        let mut total = 0usize;
        let mut task_completion_by_event = Vec::new();

        for event in events {
            total += 1;
            completion_sum += usize::from(event.completion_percentage);
            match event.column_id {
                Column::Mad => by_column.mad += 1,
                Column::UltraMad => by_column.ultra_mad += 1,
                Column::UDead => by_column.u_dead += 1,
            }
            if !event.tasks.is_empty() && task_completion_by_event.len() < TASK_BREAKDOWN_LIMIT {
                task_completion_by_event.push(TaskCompletion {
                    title: event.title.clone(),
                    completion: event.completion_percentage,
                });
            }
        }

        // Mean of percentages, rounded half up
        let average_completion = if total == 0 {
            0
        } else {
            ((2 * completion_sum + total) / (2 * total)) as u8
        };

        let status = match level(by_column.ultra_mad, by_column.u_dead, total) {
            Level::Low => RelationshipStatus::Good,
            Level::Middle => RelationshipStatus::Concerning,
            Level::High => RelationshipStatus::Critical,
        };

        Self {
            total,
            by_column,
            average_completion,
            task_completion_by_event,
            status,
        }
    }

    /// Column with the most events; ties go to the earlier of mad, ultraMad, uDead
    pub fn most_common(&self) -> Column {
        let counts = Column::ALL.map(|c| self.by_column.get(c));
        Column::ALL[argmax(&counts)]
    }

    pub fn critical_share(&self) -> u8 {
        utils::rounded_percent(self.by_column.u_dead, self.total)
    }

    pub fn advice(&self) -> &'static str {
        self.status.advice()
    }
}
