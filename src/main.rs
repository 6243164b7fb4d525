use clap::Parser;
use color_eyre::Result;
use moodtrack::{Config, Profile, SqliteStore, cli::{self, Cli, Commands}};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev {
        Profile::Dev
    } else {
        Profile::Prod
    };

    let config = match &cli.config {
        Some(path) => Config::load_from(&moodtrack::utils::expand_path(path), profile)?,
        None => Config::load_with_profile(profile)?,
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let db_path = config.get_database_path();
    let store = SqliteStore::open(
        db_path.to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?,
        &config.owner,
        &config.provision(),
    )?;

    // Dispatch to appropriate command handler
    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::AddEntry { event, mood, description, punishments } => {
            cli::handle_add_entry(event, mood, description, punishments, &store)?;
        }
        Commands::Entries { mood } => cli::handle_entries(mood, &store)?,
        Commands::Punishments => cli::handle_punishments(&store)?,
        Commands::Review { entry_id, punishment_id, action, learnings } => {
            cli::handle_review(entry_id, punishment_id, action, learnings, &store)?;
        }
        Commands::TogglePunishment { entry_id, punishment_id } => {
            cli::handle_toggle_punishment(entry_id, punishment_id, &store)?;
        }
        Commands::Dashboard => cli::handle_dashboard(config.recent_entries_limit, &store)?,
        Commands::AddEvent { title, column, description } => {
            cli::handle_add_event(title, column, description, &store)?;
        }
        Commands::Board => cli::handle_board(&store)?,
        Commands::UpdateEvent { id, title, description } => {
            cli::handle_update_event(id, title, description, &store)?;
        }
        Commands::MoveEvent { id, to, index } => cli::handle_move_event(id, to, index, &store)?,
        Commands::DeleteEvent { id } => cli::handle_delete_event(id, &store)?,
        Commands::AddTask { event_id, description } => cli::handle_add_task(event_id, description, &store)?,
        Commands::ToggleTask { event_id, task_id } => cli::handle_toggle_task(event_id, task_id, &store)?,
        Commands::RelationshipDashboard => cli::handle_relationship_dashboard(&store)?,
    }

    Ok(())
}
