use chrono::Utc;
use rally_core::models::{Court, Session};
use rally_core::util::normalize_text_option;
use rally_core::StorageCoordinator;

use crate::commands::common::sync_notice;
use crate::error::CliError;

/// Open a session and register one court per `courts`.
pub async fn run_session_start(
    coordinator: &StorageCoordinator,
    name: &str,
    courts: u32,
) -> Result<(), CliError> {
    let name = normalize_text_option(Some(name.to_string())).ok_or(CliError::EmptySessionName)?;
    let session = Session::new(name, courts);
    let local_id = session.id.clone();
    let court_count = session.court_count;

    let sessions = coordinator.initialize::<Session>().await;
    let report = sessions.insert(session).await.synced().await;
    if let Some(notice) = sync_notice(report.as_ref()) {
        eprintln!("{notice}");
    }
    let session_id = sessions.get(&local_id).map_or(local_id, |session| session.id);

    let court_collection = coordinator.initialize::<Court>().await;
    let new_courts = session_courts(&session_id, court_count);
    let report = court_collection
        .update(move |current| current.iter().cloned().chain(new_courts).collect())
        .await
        .synced()
        .await;
    if let Some(notice) = sync_notice(report.as_ref()) {
        eprintln!("{notice}");
    }

    println!("{session_id}");
    Ok(())
}

pub async fn run_session_end(coordinator: &StorageCoordinator, id: &str) -> Result<(), CliError> {
    let sessions = coordinator.initialize::<Session>().await;
    let session = sessions
        .get(id)
        .ok_or_else(|| CliError::SessionNotFound(id.to_string()))?;
    if !session.is_open() {
        return Err(CliError::SessionAlreadyEnded(session.id));
    }

    let receipt = sessions
        .patch(&session.id, |session| session.end(Utc::now()))
        .await
        .ok_or_else(|| CliError::SessionNotFound(id.to_string()))?;
    if let Some(notice) = sync_notice(receipt.synced().await.as_ref()) {
        eprintln!("{notice}");
    }

    println!("Ended session {}", session.id);
    Ok(())
}

pub fn session_courts(session_id: &str, count: u32) -> Vec<Court> {
    (1..=count)
        .map(|number| Court::new(session_id, number))
        .collect()
}
