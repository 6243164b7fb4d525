use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::dashboard::{MoodMetrics, RelationshipMetrics};
use crate::lifecycle::{LifecycleError, PunishmentAction};
use crate::models::{Column, Mood, NewMoodEntry, PunishmentStatus};
use crate::mood::{MoodError, MoodRepository, PunishmentUpdate};
use crate::relationship::{RelationshipError, RelationshipRepository};
use crate::store::Store;
use crate::utils::format_date;

#[derive(Parser)]
#[command(name = "moodtrack")]
#[command(about = "Mood entries, punishments and relationship boards")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log a new mood entry
    AddEntry {
        /// What happened?
        event: String,
        /// pissed, mad or counting
        #[arg(long, default_value = "counting")]
        mood: Mood,
        /// Longer description
        #[arg(long)]
        description: Option<String>,
        /// Punishment to attach (repeatable)
        #[arg(long = "punishment")]
        punishments: Vec<String>,
    },
    /// List mood entries, newest first
    Entries {
        /// Only show one mood
        #[arg(long)]
        mood: Option<Mood>,
    },
    /// Show punishments grouped by state
    Punishments,
    /// Submit, approve or reject a punishment
    Review {
        entry_id: String,
        punishment_id: String,
        /// submit, approve or reject
        action: String,
        /// What you learned (with submit)
        #[arg(long)]
        learnings: Option<String>,
    },
    /// Tick or untick a punishment
    TogglePunishment {
        entry_id: String,
        punishment_id: String,
    },
    /// Mood dashboard (default if no subcommand)
    Dashboard,
    /// Add a relationship event to a column
    AddEvent {
        title: String,
        /// mad, ultra-mad or u-dead
        #[arg(long, default_value = "mad")]
        column: Column,
        #[arg(long)]
        description: Option<String>,
    },
    /// Show the relationship board
    Board,
    /// Change an event's title or description
    UpdateEvent {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Move an event to another column
    MoveEvent {
        id: String,
        #[arg(long)]
        to: Column,
        /// Position in the destination column (defaults to the bottom)
        #[arg(long)]
        index: Option<usize>,
    },
    /// Delete a relationship event
    DeleteEvent { id: String },
    /// Add a task to an event's checklist
    AddTask { event_id: String, description: String },
    /// Tick or untick a task
    ToggleTask { event_id: String, task_id: String },
    /// Relationship dashboard
    RelationshipDashboard,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    MoodError(#[from] MoodError),
    #[error(transparent)]
    RelationshipError(#[from] RelationshipError),
    #[error(transparent)]
    LifecycleError(#[from] LifecycleError),
    #[error("Event '{0}' not found")]
    EventNotFound(String),
}

/// Handle the add-entry command
pub fn handle_add_entry<S: Store>(
    event: String,
    mood: Mood,
    description: Option<String>,
    punishments: Vec<String>,
    store: &S,
) -> Result<(), CliError> {
    let mut repo = MoodRepository::new(store);
    let new = NewMoodEntry {
        mood,
        event,
        description,
        punishments,
    };
    let outcome = repo.create_entry(new)?;

    println!("Entry created successfully (ID: {})", outcome.entry.id);
    for field in &outcome.dropped {
        println!("  note: '{}' is not supported by this database and was not saved", field.column());
    }
    if outcome.refresh_punishments {
        println!("  {} punishment(s) waiting", outcome.entry.punishments().len());
    }
    Ok(())
}

/// Handle the entries command
pub fn handle_entries<S: Store>(mood: Option<Mood>, store: &S) -> Result<(), CliError> {
    let repo = MoodRepository::load(store)?;
    for shown in Mood::ALL.into_iter().filter(|m| mood.is_none_or(|only| only == *m)) {
        println!("== {} ==", shown);
        for entry in repo.entries_with_mood(shown) {
            let done = if entry.is_completed() { " [done]" } else { "" };
            println!("  {}  {}  {}{}", format_date(&entry.created_at), entry.id, entry.event, done);
            if let Some(description) = &entry.description {
                println!("      {}", description);
            }
            for p in entry.punishments() {
                let mark = if p.completed() { "x" } else { " " };
                println!("      [{}] {}: {}", mark, p.id, p.text);
            }
        }
    }
    Ok(())
}

/// Handle the punishments command
pub fn handle_punishments<S: Store>(store: &S) -> Result<(), CliError> {
    let repo = MoodRepository::load(store)?;
    let buckets = repo.punishment_board();
    let stats = buckets.stats();

    println!(
        "Punishments: {} total, {} pending, {} in evaluation, {} completed ({}%)",
        stats.total,
        stats.pending,
        stats.in_evaluation,
        stats.completed,
        stats.completion_rate()
    );
    for status in [PunishmentStatus::Pending, PunishmentStatus::Evaluation, PunishmentStatus::Completed] {
        println!("== {} ==", status);
        for tracked in buckets.bucket(status) {
            println!(
                "  {} / {}  {}  (for \"{}\", {})",
                tracked.entry_id,
                tracked.punishment.id,
                tracked.punishment.text,
                tracked.event,
                tracked.mood
            );
            if let Some(details) = &tracked.punishment.evaluation_details {
                println!("      learnings: {}", details.learnings);
            }
        }
    }
    Ok(())
}

fn report_update(update: PunishmentUpdate) {
    match update {
        PunishmentUpdate::Applied { punishment, entry_completed } => {
            println!("Punishment '{}' is now {}", punishment.text, punishment.status);
            if entry_completed {
                println!("All punishments for this entry are done!");
            }
        }
        PunishmentUpdate::Suppressed => {
            println!("An update for this punishment is already in progress");
        }
    }
}

/// Handle the review command
pub fn handle_review<S: Store>(
    entry_id: String,
    punishment_id: String,
    action: String,
    learnings: Option<String>,
    store: &S,
) -> Result<(), CliError> {
    let action: PunishmentAction = action.parse()?;
    let mut repo = MoodRepository::new(store);
    let update = match action {
        PunishmentAction::Submit => {
            repo.submit_for_evaluation(&entry_id, &punishment_id, learnings.as_deref())?
        }
        other => repo.apply_action(&entry_id, &punishment_id, other)?,
    };
    report_update(update);
    Ok(())
}

/// Handle the toggle-punishment command
pub fn handle_toggle_punishment<S: Store>(entry_id: String, punishment_id: String, store: &S) -> Result<(), CliError> {
    let mut repo = MoodRepository::new(store);
    report_update(repo.toggle_punishment(&entry_id, &punishment_id)?);
    Ok(())
}

/// Handle the dashboard command
pub fn handle_dashboard<S: Store>(recent_limit: usize, store: &S) -> Result<(), CliError> {
    let repo = MoodRepository::load(store)?;
    let metrics = MoodMetrics::compute(repo.entries(), recent_limit);

    println!("Mood Dashboard");
    println!("  Total events:     {}", metrics.total);
    println!("  Most common mood: {}", metrics.most_common());
    println!("  Critical events:  {}% of total", metrics.critical_share());
    println!("  Status:           {}", metrics.status);
    for mood in Mood::ALL {
        println!("    {:<14} {:>4} ({}%)", mood.label(), metrics.by_mood.get(mood), metrics.share(mood));
    }
    if !metrics.recent.is_empty() {
        println!("  Recent:");
        for entry in &metrics.recent {
            println!("    {}  {}  {}", format_date(&entry.created_at), entry.mood, entry.event);
        }
    }
    println!();
    println!("{}", metrics.advice());
    Ok(())
}

/// Handle the add-event command
pub fn handle_add_event<S: Store>(title: String, column: Column, description: Option<String>, store: &S) -> Result<(), CliError> {
    let mut repo = RelationshipRepository::new(store);
    let event = repo.add_event(&title, description.as_deref(), column)?;
    println!("Event created successfully (ID: {}) in {}", event.id, event.column_id);
    Ok(())
}

/// Handle the board command
pub fn handle_board<S: Store>(store: &S) -> Result<(), CliError> {
    let repo = RelationshipRepository::load(store)?;
    for column in Column::ALL {
        println!("== {} ==", column);
        for event in repo.board().column(column) {
            let done = event.tasks.iter().filter(|t| t.completed).count();
            println!(
                "  {}  {}  {}%  tasks {}/{}  created {}",
                event.id,
                event.title,
                event.completion_percentage,
                done,
                event.tasks.len(),
                format_date(&event.created_at)
            );
            if let Some(description) = &event.description {
                println!("      {}", description);
            }
            for task in &event.tasks {
                let mark = if task.completed { "x" } else { " " };
                println!("      [{}] {}  {}", mark, task.id, task.description);
            }
        }
    }
    Ok(())
}

/// Handle the update-event command
pub fn handle_update_event<S: Store>(id: String, title: Option<String>, description: Option<String>, store: &S) -> Result<(), CliError> {
    let mut repo = RelationshipRepository::load(store)?;
    let mut event = repo.event(&id).cloned().ok_or_else(|| CliError::EventNotFound(id.clone()))?;
    if let Some(title) = title {
        event.title = title;
    }
    if description.is_some() {
        event.description = description;
    }
    let event = repo.update_event(event)?;
    println!("Event '{}' updated", event.title);
    Ok(())
}

/// Handle the move-event command
pub fn handle_move_event<S: Store>(id: String, to: Column, index: Option<usize>, store: &S) -> Result<(), CliError> {
    let mut repo = RelationshipRepository::load(store)?;
    let (from, _) = repo.board().locate(&id).ok_or_else(|| CliError::EventNotFound(id.clone()))?;
    let index = index.unwrap_or_else(|| repo.board().column(to).len());
    if repo.move_event(&id, from, to, index)? {
        println!("Moved event {} from {} to {}", id, from, to);
    } else {
        println!("Event {} is already there", id);
    }
    Ok(())
}

/// Handle the delete-event command
pub fn handle_delete_event<S: Store>(id: String, store: &S) -> Result<(), CliError> {
    let mut repo = RelationshipRepository::load(store)?;
    if repo.delete_event(&id)? {
        println!("Event {} deleted", id);
    } else {
        println!("Event {} not found, nothing deleted", id);
    }
    Ok(())
}

/// Handle the add-task command
pub fn handle_add_task<S: Store>(event_id: String, description: String, store: &S) -> Result<(), CliError> {
    let mut repo = RelationshipRepository::load(store)?;
    match repo.add_task(&event_id, &description)? {
        Some(task) => println!("Task created successfully (ID: {})", task.id),
        None => println!("Task description is empty, nothing added"),
    }
    Ok(())
}

/// Handle the toggle-task command
pub fn handle_toggle_task<S: Store>(event_id: String, task_id: String, store: &S) -> Result<(), CliError> {
    let mut repo = RelationshipRepository::load(store)?;
    let event = repo.toggle_task(&event_id, &task_id)?;
    println!("'{}' is {}% complete", event.title, event.completion_percentage);
    Ok(())
}

/// Handle the relationship-dashboard command
pub fn handle_relationship_dashboard<S: Store>(store: &S) -> Result<(), CliError> {
    let repo = RelationshipRepository::load(store)?;
    let metrics = RelationshipMetrics::compute(repo.board().events());

    println!("Relationship Dashboard");
    println!("  Total events:       {}", metrics.total);
    println!("  Average completion: {}%", metrics.average_completion);
    println!("  Highest category:   {}", metrics.most_common());
    println!("  Status:             {}", metrics.status);
    for column in Column::ALL {
        println!("    {:<10} {:>4}", column.label(), metrics.by_column.get(column));
    }
    if metrics.task_completion_by_event.is_empty() {
        println!("  No tasks created yet");
    } else {
        println!("  Task completion:");
        for item in &metrics.task_completion_by_event {
            println!("    {:<30} {:>3}%", item.title, item.completion);
        }
    }
    println!();
    println!("{}", metrics.advice());
    Ok(())
}
