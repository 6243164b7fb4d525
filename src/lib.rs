pub mod cli;
pub mod config;
pub mod dashboard;
pub mod inflight;
pub mod lifecycle;
pub mod models;
pub mod mood;
pub mod relationship;
pub mod store;
pub mod utils;

pub use config::Config;
pub use models::{Board, Column, Mood, MoodEntry, Punishment, PunishmentStatus, RelationshipEvent, Task};
pub use mood::MoodRepository;
pub use relationship::RelationshipRepository;
pub use store::{SqliteStore, Store};
pub use utils::Profile;
