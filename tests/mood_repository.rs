mod common;

use moodtrack::inflight::InFlight;
use moodtrack::lifecycle::PunishmentAction;
use moodtrack::models::{Mood, NewMoodEntry, PunishmentStatus};
use moodtrack::mood::{EntryField, MoodError, MoodRepository, PunishmentUpdate};
use moodtrack::store::{Collection, Provision, Record, Store, StoreError};

use common::{FlakyStore, store};

fn anniversary() -> NewMoodEntry {
    NewMoodEntry {
        mood: Mood::Mad,
        event: "forgot anniversary".to_string(),
        description: Some("again".to_string()),
        punishments: vec!["apologize".to_string(), "buy flowers".to_string()],
    }
}

fn applied_status(update: PunishmentUpdate) -> (PunishmentStatus, bool) {
    match update {
        PunishmentUpdate::Applied { punishment, entry_completed } => (punishment.status, entry_completed),
        PunishmentUpdate::Suppressed => panic!("update was suppressed"),
    }
}

#[test]
fn full_schema_keeps_every_field() {
    let store = store(Provision::Full);
    let mut repo = MoodRepository::new(&store);

    let outcome = repo.create_entry(anniversary()).unwrap();
    assert!(outcome.dropped.is_empty());
    assert!(outcome.refresh_punishments);
    assert_eq!(outcome.entry.description.as_deref(), Some("again"));
    assert_eq!(outcome.entry.completed, Some(false));

    let ids: Vec<_> = outcome.entry.punishments().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["0", "1"]);
    assert_eq!(repo.entries().len(), 1);
}

#[test]
fn store_without_punishments_still_keeps_description() {
    let store = store(Provision::Only(vec!["description".into(), "completed".into()]));
    let mut repo = MoodRepository::new(&store);

    let outcome = repo.create_entry(anniversary()).unwrap();
    assert_eq!(outcome.entry.description.as_deref(), Some("again"));
    assert!(outcome.entry.punishments.is_none());
    assert_eq!(outcome.dropped, vec![EntryField::Punishments]);
    assert!(!outcome.refresh_punishments);
    // The column exists, so the stored default is not reported as lost
    assert_eq!(outcome.entry.completed, Some(false));
}

#[test]
fn store_without_completed_keeps_punishments() {
    let store = store(Provision::Only(vec!["description".into(), "punishments".into()]));
    let mut repo = MoodRepository::new(&store);

    let outcome = repo.create_entry(anniversary()).unwrap();
    assert_eq!(outcome.dropped, vec![EntryField::Completed]);
    assert!(outcome.refresh_punishments);
    assert_eq!(outcome.entry.description.as_deref(), Some("again"));
    assert_eq!(outcome.entry.completed, None);
    let texts: Vec<_> = outcome.entry.punishments().iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts, ["apologize", "buy flowers"]);

    // Reviews still persist on a table without the completed column
    let entry_id = outcome.entry.id;
    repo.apply_action(&entry_id, "0", PunishmentAction::Approve).unwrap();
    let last = repo.apply_action(&entry_id, "1", PunishmentAction::Approve).unwrap();
    assert_eq!(applied_status(last), (PunishmentStatus::Completed, true));

    let row = store.select_by_id(Collection::MoodEntries, &entry_id).unwrap();
    assert_eq!(row["punishments"][1]["status"], serde_json::json!("completed"));
    assert!(!row.contains_key("completed"));
}

#[test]
fn store_without_optional_columns_keeps_mood_and_event() {
    let store = store(Provision::Legacy);
    let mut repo = MoodRepository::new(&store);

    let outcome = repo.create_entry(anniversary()).unwrap();
    assert_eq!(outcome.entry.mood, Mood::Mad);
    assert_eq!(outcome.entry.event, "forgot anniversary");
    assert!(outcome.entry.description.is_none());
    assert_eq!(
        outcome.dropped,
        vec![EntryField::Description, EntryField::Punishments, EntryField::Completed]
    );
    assert_eq!(repo.entries().len(), 1);
}

#[test]
fn optional_fields_without_values_are_not_sent() {
    // No description or punishments given, so their missing columns never matter
    let store = store(Provision::Only(vec!["completed".into()]));
    let mut repo = MoodRepository::new(&store);

    let outcome = repo.create_entry(NewMoodEntry::new(Mood::Pissed, "cold coffee")).unwrap();
    assert!(outcome.dropped.is_empty());
    assert_eq!(outcome.entry.completed, Some(false));
}

#[test]
fn blank_punishments_are_dropped_and_renumbered() {
    let store = store(Provision::Full);
    let mut repo = MoodRepository::new(&store);
    let mut new = NewMoodEntry::new(Mood::Counting, "left me on read");
    new.punishments = vec!["".into(), "  ".into(), "write a poem".into()];

    let outcome = repo.create_entry(new).unwrap();
    let punishments = outcome.entry.punishments();
    assert_eq!(punishments.len(), 1);
    assert_eq!(punishments[0].id, "0");
    assert_eq!(punishments[0].text, "write a poem");
}

#[test]
fn blank_event_is_rejected_before_any_insert() {
    let store = FlakyStore::new(Provision::Full);
    let mut repo = MoodRepository::new(&store);

    let err = repo.create_entry(NewMoodEntry::new(Mood::Mad, "   ")).unwrap_err();
    assert!(matches!(err, MoodError::EmptyEvent));
    assert_eq!(store.inserts.get(), 0);
}

#[test]
fn generic_store_failure_is_surfaced_without_retry() {
    let store = FlakyStore::new(Provision::Full);
    store.fail_inserts.set(true);
    let mut repo = MoodRepository::new(&store);

    let err = repo.create_entry(anniversary()).unwrap_err();
    assert!(matches!(err, MoodError::StoreError(StoreError::Backend(_))));
    assert_eq!(store.inserts.get(), 1);
    assert!(store.inner.select(Collection::MoodEntries, None).unwrap().is_empty());
}

#[test]
fn punishment_workflow_end_to_end() {
    let store = store(Provision::Full);
    let mut repo = MoodRepository::new(&store);
    let entry = repo.create_entry(anniversary()).unwrap().entry;

    for p in entry.punishments() {
        assert_eq!(p.status, PunishmentStatus::Pending);
        assert!(!p.completed());
    }

    let submitted = repo.apply_action(&entry.id, "0", PunishmentAction::Submit).unwrap();
    assert_eq!(applied_status(submitted), (PunishmentStatus::Evaluation, false));

    let approved = repo.apply_action(&entry.id, "0", PunishmentAction::Approve).unwrap();
    assert_eq!(applied_status(approved), (PunishmentStatus::Completed, false));
    assert!(!repo.entry(&entry.id).unwrap().is_completed());

    let last = repo.apply_action(&entry.id, "1", PunishmentAction::Approve).unwrap();
    assert_eq!(applied_status(last), (PunishmentStatus::Completed, true));
    assert!(repo.entry(&entry.id).unwrap().is_completed());

    // Rejecting one again reopens the entry
    let rejected = repo.apply_action(&entry.id, "1", PunishmentAction::Reject).unwrap();
    assert_eq!(applied_status(rejected), (PunishmentStatus::Pending, false));
    assert!(!repo.entry(&entry.id).unwrap().is_completed());
}

#[test]
fn submit_records_learnings() {
    let store = store(Provision::Full);
    let mut repo = MoodRepository::new(&store);
    let entry = repo.create_entry(anniversary()).unwrap().entry;

    repo.submit_for_evaluation(&entry.id, "1", Some("roses, not lilies")).unwrap();

    let stored = repo.entry(&entry.id).unwrap();
    let flowers = &stored.punishments()[1];
    assert_eq!(flowers.status, PunishmentStatus::Evaluation);
    assert_eq!(flowers.evaluation_details.as_ref().unwrap().learnings, "roses, not lilies");

    let buckets = repo.punishment_board();
    assert_eq!(buckets.evaluation.len(), 1);
    assert_eq!(buckets.pending.len(), 1);
    assert_eq!(buckets.stats().total, 2);
}

#[test]
fn toggle_completes_and_reopens() {
    let store = store(Provision::Full);
    let mut repo = MoodRepository::new(&store);
    let mut new = NewMoodEntry::new(Mood::Pissed, "ate my fries");
    new.punishments = vec!["buy fries".into()];
    let entry = repo.create_entry(new).unwrap().entry;

    assert_eq!(applied_status(repo.toggle_punishment(&entry.id, "0").unwrap()), (PunishmentStatus::Completed, true));
    assert_eq!(applied_status(repo.toggle_punishment(&entry.id, "0").unwrap()), (PunishmentStatus::Pending, false));
}

#[test]
fn in_flight_punishment_is_suppressed() {
    let store = store(Provision::Full);
    let in_flight = InFlight::new();
    let mut repo = MoodRepository::with_in_flight(&store, in_flight.clone());
    let entry = repo.create_entry(anniversary()).unwrap().entry;

    let ticket = in_flight.try_acquire(format!("{}/0", entry.id)).unwrap();
    let update = repo.apply_action(&entry.id, "0", PunishmentAction::Approve).unwrap();
    assert_eq!(update, PunishmentUpdate::Suppressed);
    assert_eq!(repo.entry(&entry.id).unwrap().punishments()[0].status, PunishmentStatus::Pending);

    // The other punishment of the same entry is unaffected
    assert!(matches!(
        repo.apply_action(&entry.id, "1", PunishmentAction::Submit).unwrap(),
        PunishmentUpdate::Applied { .. }
    ));

    drop(ticket);
    assert!(matches!(
        repo.apply_action(&entry.id, "0", PunishmentAction::Approve).unwrap(),
        PunishmentUpdate::Applied { .. }
    ));
    assert!(in_flight.is_empty());
}

#[test]
fn failed_update_releases_the_lock_and_keeps_store_state() {
    let store = FlakyStore::new(Provision::Full);
    let mut repo = MoodRepository::new(&store);
    let entry = repo.create_entry(anniversary()).unwrap().entry;

    store.fail_updates.set(true);
    let err = repo.apply_action(&entry.id, "0", PunishmentAction::Approve).unwrap_err();
    assert!(matches!(err, MoodError::StoreError(StoreError::Backend(_))));
    assert!(repo.in_flight().is_empty());

    repo.refresh().unwrap();
    assert_eq!(repo.entry(&entry.id).unwrap().punishments()[0].status, PunishmentStatus::Pending);
}

#[test]
fn missing_entry_and_punishment_are_reported() {
    let store = store(Provision::Full);
    let mut repo = MoodRepository::new(&store);
    let entry = repo.create_entry(anniversary()).unwrap().entry;

    let err = repo.apply_action("no-such-entry", "0", PunishmentAction::Submit).unwrap_err();
    assert!(matches!(err, MoodError::StoreError(ref e) if e.is_not_found()));

    let err = repo.apply_action(&entry.id, "7", PunishmentAction::Submit).unwrap_err();
    assert!(matches!(err, MoodError::PunishmentNotFound { .. }));

    let plain = repo.create_entry(NewMoodEntry::new(Mood::Mad, "no punishments")).unwrap().entry;
    let err = repo.apply_action(&plain.id, "0", PunishmentAction::Submit).unwrap_err();
    assert!(matches!(err, MoodError::StoreError(ref e) if e.is_not_found()));
}

#[test]
fn update_punishments_writes_derived_completion() {
    let store = store(Provision::Full);
    let mut repo = MoodRepository::load(&store).unwrap();
    let entry = repo.create_entry(anniversary()).unwrap().entry;

    let mut punishments = entry.punishments().to_vec();
    for p in &mut punishments {
        p.status = PunishmentStatus::Completed;
    }
    assert!(repo.update_punishments(&entry.id, &punishments).unwrap());

    let row = store.select_by_id(Collection::MoodEntries, &entry.id).unwrap();
    assert_eq!(row["completed"], serde_json::json!(true));
    assert_eq!(row["punishments"][1]["status"], serde_json::json!("completed"));
    assert_eq!(row["punishments"][1]["completed"], serde_json::json!(true));
}

#[test]
fn entries_are_cached_newest_first() {
    let store = store(Provision::Full);
    for (event, at) in [("older", "2026-01-01T08:00:00Z"), ("newer", "2026-02-01T08:00:00Z")] {
        let mut record = Record::new();
        record.insert("mood".into(), "pissed".into());
        record.insert("event".into(), event.into());
        record.insert("created_at".into(), at.into());
        store.insert(Collection::MoodEntries, record).unwrap();
    }
    let repo = MoodRepository::load(&store).unwrap();
    let events: Vec<_> = repo.entries().iter().map(|e| e.event.as_str()).collect();
    assert_eq!(events, ["newer", "older"]);
    assert_eq!(repo.entries_with_mood(Mood::Pissed).count(), 2);
    assert_eq!(repo.entries_with_mood(Mood::Counting).count(), 0);
}

#[test]
fn unreadable_rows_are_skipped_on_refresh() {
    let store = store(Provision::Full);
    let mut repo = MoodRepository::new(&store);
    repo.create_entry(NewMoodEntry::new(Mood::Mad, "took the last slice")).unwrap();

    let mut foreign = Record::new();
    foreign.insert("mood".into(), "sulking".into());
    foreign.insert("event".into(), "written by a newer client".into());
    store.insert(Collection::MoodEntries, foreign).unwrap();

    repo.refresh().unwrap();
    let events: Vec<_> = repo.entries().iter().map(|e| e.event.as_str()).collect();
    assert_eq!(events, ["took the last slice"]);
    assert_eq!(MoodRepository::load(&store).unwrap().entries().len(), 1);
}
