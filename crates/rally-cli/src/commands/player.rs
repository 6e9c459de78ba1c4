use rally_core::models::Player;
use rally_core::util::normalize_text_option;
use rally_core::StorageCoordinator;

use crate::commands::common::sync_notice;
use crate::error::CliError;

pub async fn run_player_add(
    coordinator: &StorageCoordinator,
    name: &str,
    email: Option<&str>,
) -> Result<(), CliError> {
    let name = normalize_text_option(Some(name.to_string())).ok_or(CliError::EmptyPlayerName)?;
    let mut player = Player::new(name);
    if let Some(email) = normalize_text_option(email.map(str::to_string)) {
        player = player.with_email(email);
    }
    let local_id = player.id.clone();

    let players = coordinator.initialize::<Player>().await;
    let report = players.insert(player).await.synced().await;
    if let Some(notice) = sync_notice(report.as_ref()) {
        eprintln!("{notice}");
    }

    let id = players.get(&local_id).map_or(local_id, |player| player.id);
    println!("{id}");
    Ok(())
}
