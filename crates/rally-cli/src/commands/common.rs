use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rally_core::config::default_cache_file_name;
use rally_core::models::{
    Court, EloHistoryRecord, Match, MatchEvent, Player, Session, SessionPlayer, SessionSetting,
};
use rally_core::sync::SkipReason;
use rally_core::{StorageConfig, StorageCoordinator, SyncReport};

use crate::error::CliError;

pub fn default_cache_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rally")
        .join(default_cache_file_name())
}

/// `--cache-path` wins over `RALLY_CACHE_PATH`, which wins over the data dir.
pub fn resolve_storage_config(cli_cache_path: Option<PathBuf>) -> Result<StorageConfig, CliError> {
    let mut config = StorageConfig::from_env(default_cache_path())?;
    if let Some(path) = cli_cache_path {
        config.cache_path = path;
    }
    Ok(config)
}

pub async fn open_coordinator(config: &StorageConfig) -> Result<StorageCoordinator, CliError> {
    Ok(StorageCoordinator::open(config).await?)
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

pub fn format_report_line(report: &SyncReport) -> String {
    if let Some(reason) = report.skipped {
        let why = match reason {
            SkipReason::RemoteUnavailable => "remote unavailable",
            SkipReason::NotRemoteCapable => "local only",
        };
        return format!("{}: skipped ({why})", report.collection);
    }
    format!(
        "{}: {} inserted, {} updated, {} deleted, {} duplicates, {} failed",
        report.collection,
        report.inserted,
        report.updated,
        report.deleted,
        report.duplicates,
        report.failures.len()
    )
}

/// Message for a write that did not fully reach the remote.
pub fn sync_notice(report: Option<&SyncReport>) -> Option<String> {
    match report {
        None => Some("Saved locally; remote mirror is not running".to_string()),
        Some(report) if report.skipped.is_some() => {
            Some("Saved locally; remote store unavailable".to_string())
        }
        Some(report) if !report.failures.is_empty() => Some(format!(
            "Saved locally; {} remote operation(s) failed and will be retried",
            report.failures.len()
        )),
        Some(_) => None,
    }
}

/// One-line human rendering of a record for `rally list`.
pub trait ListLine {
    fn list_line(&self) -> String;
}

impl ListLine for Player {
    fn list_line(&self) -> String {
        format!(
            "{}  {}  rating {:.0}  {}W/{}L",
            self.id, self.name, self.rating.current, self.stats.wins, self.stats.losses
        )
    }
}

impl ListLine for Session {
    fn list_line(&self) -> String {
        let state = self
            .ended_at
            .map_or_else(|| "open".to_string(), |at| format!("ended {}", format_timestamp(at)));
        format!(
            "{}  {}  {} court(s)  {state}",
            self.id, self.name, self.court_count
        )
    }
}

impl ListLine for SessionPlayer {
    fn list_line(&self) -> String {
        format!(
            "{}  {}  session {}  {} played",
            self.id, self.player_name, self.session_id, self.stats.matches_played
        )
    }
}

impl ListLine for Match {
    fn list_line(&self) -> String {
        let state = if self.cancelled_at.is_some() {
            "cancelled".to_string()
        } else if self.completed_at.is_some() {
            format!(
                "{}-{}",
                self.team1.score.unwrap_or_default(),
                self.team2.score.unwrap_or_default()
            )
        } else {
            "in progress".to_string()
        };
        format!(
            "{}  court {}  {} & {} vs {} & {}  {state}",
            self.id,
            self.court_number,
            self.team1.player_names[0],
            self.team1.player_names[1],
            self.team2.player_names[0],
            self.team2.player_names[1]
        )
    }
}

impl ListLine for EloHistoryRecord {
    fn list_line(&self) -> String {
        format!(
            "{}  {}  {:.0} -> {:.0} ({:+.0})",
            self.id, self.player_name, self.rating_before, self.rating_after, self.rating_change
        )
    }
}

impl ListLine for Court {
    fn list_line(&self) -> String {
        let label = self
            .name
            .clone()
            .unwrap_or_else(|| format!("Court {}", self.court_number));
        let availability = if self.is_available { "free" } else { "busy" };
        format!("{}  {label}  {availability}", self.id)
    }
}

impl ListLine for MatchEvent {
    fn list_line(&self) -> String {
        format!(
            "{}  {}  match {}  {}",
            self.id,
            self.event_type,
            self.match_id,
            format_timestamp(self.created_at)
        )
    }
}

impl ListLine for SessionSetting {
    fn list_line(&self) -> String {
        format!("{}  {} = {}", self.id, self.key, self.value)
    }
}
