use chrono::{DateTime, Utc};
use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(&self) -> &'static str {
        match self {
            Profile::Dev => "moodtrack-dev",
            Profile::Prod => "moodtrack",
        }
    }
}

/// Get the configuration directory path
/// If profile is Dev, uses "moodtrack-dev" instead of "moodtrack"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "moodtrack", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "moodtrack", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Current time as an RFC 3339 string, the format every stored timestamp uses
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Parse a stored timestamp; `None` for anything that is not RFC 3339
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Short date for list output, falls back to the raw string
pub fn format_date(value: &str) -> String {
    parse_timestamp(value)
        .map(|dt| dt.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| value.to_string())
}

/// `round(100 * part / whole)` with halves rounding up; 0 when `whole` is 0
pub fn rounded_percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole) as u64;
    let whole = whole as u64;
    ((200 * part + whole) / (2 * whole)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounded_percent_matches_task_examples() {
        assert_eq!(rounded_percent(0, 0), 0);
        assert_eq!(rounded_percent(1, 3), 33);
        assert_eq!(rounded_percent(2, 3), 67);
        assert_eq!(rounded_percent(1, 2), 50);
        assert_eq!(rounded_percent(1, 8), 13);
        assert_eq!(rounded_percent(4, 4), 100);
    }

    #[test]
    fn timestamps_round_trip_through_parse() {
        let now = now_timestamp();
        assert!(parse_timestamp(&now).is_some());
        assert!(parse_timestamp("yesterday").is_none());
        assert_eq!(format_date("2026-02-14T09:30:00Z"), "Feb 14, 2026");
    }
}
