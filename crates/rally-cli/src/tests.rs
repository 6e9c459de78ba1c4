use std::path::PathBuf;

use clap::Parser;
use pretty_assertions::assert_eq;
use rally_core::models::{Court, Player, Session};
use rally_core::sync::SkipReason;
use rally_core::{ClientState, CollectionKind, HealthReport, StorageConfig, SyncReport};
use tempfile::tempdir;

use crate::cli::{Cli, Commands, CompletionShell, SessionCommands};
use crate::commands::common::{format_report_line, open_coordinator, resolve_storage_config, sync_notice};
use crate::commands::completions::render_completions;
use crate::commands::list::first_entries;
use crate::commands::player::run_player_add;
use crate::commands::session::{run_session_end, run_session_start, session_courts};
use crate::commands::status::{format_status_lines, CollectionCount, StatusItem};
use crate::error::CliError;

#[test]
fn list_accepts_collection_keys_with_dashes() {
    let cli = Cli::try_parse_from(["rally", "list", "session-players", "--json"]).unwrap();
    match cli.command {
        Some(Commands::List {
            collection,
            limit,
            json,
        }) => {
            assert_eq!(collection, CollectionKind::SessionPlayers);
            assert_eq!(limit, 20);
            assert!(json);
        }
        _ => panic!("expected list command"),
    }
}

#[test]
fn unknown_collection_is_rejected() {
    assert!(Cli::try_parse_from(["rally", "list", "teams"]).is_err());
}

#[test]
fn cache_path_flag_is_global() {
    let cli = Cli::try_parse_from(["rally", "session", "end", "abc", "--cache-path", "/tmp/r.db"])
        .unwrap();
    assert_eq!(cli.cache_path, Some(PathBuf::from("/tmp/r.db")));
    assert!(matches!(
        cli.command,
        Some(Commands::Session {
            command: SessionCommands::End { .. }
        })
    ));
}

#[test]
fn cli_cache_path_overrides_environment() {
    let config = resolve_storage_config(Some(PathBuf::from("/tmp/override.db"))).unwrap();
    assert_eq!(config.cache_path, PathBuf::from("/tmp/override.db"));
}

#[test]
fn completions_name_the_binary() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("rally"));
}

#[test]
fn report_line_describes_counts_and_skips() {
    let mut report = SyncReport::new(CollectionKind::Players);
    report.inserted = 2;
    report.updated = 1;
    assert_eq!(
        format_report_line(&report),
        "players: 2 inserted, 1 updated, 0 deleted, 0 duplicates, 0 failed"
    );

    let skipped = SyncReport::skipped(CollectionKind::Courts, SkipReason::RemoteUnavailable);
    assert_eq!(format_report_line(&skipped), "courts: skipped (remote unavailable)");
}

#[test]
fn sync_notice_is_silent_for_clean_reports() {
    let clean = SyncReport::new(CollectionKind::Players);
    assert_eq!(sync_notice(Some(&clean)), None);

    let skipped = SyncReport::skipped(CollectionKind::Players, SkipReason::RemoteUnavailable);
    assert!(sync_notice(Some(&skipped)).unwrap().contains("unavailable"));
    assert!(sync_notice(None).is_some());
}

#[test]
fn status_lines_show_health_and_counts() {
    let status = StatusItem {
        health: HealthReport {
            remote_active: false,
            remote_disabled: true,
            client_state: ClientState::Uninitialized,
            last_error: Some("RALLY_REMOTE_URL and RALLY_REMOTE_KEY are not set".to_string()),
            consecutive_transport_errors: 0,
            cache_path: Some(PathBuf::from("/tmp/rally.db")),
        },
        collections: vec![CollectionCount {
            collection: CollectionKind::Players,
            entries: 3,
        }],
    };

    assert_eq!(
        format_status_lines(&status),
        vec![
            "remote: disabled (uninitialized)".to_string(),
            "last error: RALLY_REMOTE_URL and RALLY_REMOTE_KEY are not set".to_string(),
            "cache: /tmp/rally.db".to_string(),
            "players: 3".to_string(),
        ]
    );
}

#[test]
fn session_courts_are_numbered_from_one() {
    let courts = session_courts("session-1", 3);
    let numbers: Vec<u32> = courts.iter().map(|court| court.court_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert!(courts.iter().all(|court| court.session_id == "session-1"));
}

#[test]
fn first_entries_respects_limit() {
    assert_eq!(first_entries(vec![1, 2, 3], 2), vec![1, 2]);
    assert_eq!(first_entries(vec![1], 5), vec![1]);
}

#[tokio::test(flavor = "multi_thread")]
async fn player_add_persists_to_cache_without_remote() {
    let dir = tempdir().unwrap();
    let config = StorageConfig::local(dir.path().join("rally.db"));

    {
        let coordinator = open_coordinator(&config).await.unwrap();
        run_player_add(&coordinator, "  Ana ", Some("ana@example.com"))
            .await
            .unwrap();
        assert!(matches!(
            run_player_add(&coordinator, "   ", None).await,
            Err(CliError::EmptyPlayerName)
        ));
    }

    let coordinator = open_coordinator(&config).await.unwrap();
    let players: Vec<Player> = coordinator.initialize::<Player>().await.read();
    assert_eq!(players.len(), 1);
    assert_eq!(players[0].name, "Ana");
    assert_eq!(players[0].email.as_deref(), Some("ana@example.com"));
}

#[tokio::test(flavor = "multi_thread")]
async fn session_start_and_end_round_trip() {
    let dir = tempdir().unwrap();
    let config = StorageConfig::local(dir.path().join("rally.db"));
    let coordinator = open_coordinator(&config).await.unwrap();

    run_session_start(&coordinator, "Tuesday", 2).await.unwrap();

    let sessions: Vec<Session> = coordinator.initialize::<Session>().await.read();
    assert_eq!(sessions.len(), 1);
    let session_id = sessions[0].id.clone();
    let courts: Vec<Court> = coordinator.initialize::<Court>().await.read();
    assert_eq!(courts.len(), 2);
    assert!(courts.iter().all(|court| court.session_id == session_id));

    run_session_end(&coordinator, &session_id).await.unwrap();
    let ended = coordinator.initialize::<Session>().await.read();
    assert!(!ended[0].is_open());

    assert!(matches!(
        run_session_end(&coordinator, &session_id).await,
        Err(CliError::SessionAlreadyEnded(_))
    ));
    assert!(matches!(
        run_session_end(&coordinator, "missing").await,
        Err(CliError::SessionNotFound(_))
    ));
}
