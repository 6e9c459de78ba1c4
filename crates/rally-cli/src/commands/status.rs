use rally_core::{CollectionKind, HealthReport, StorageCoordinator};
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct CollectionCount {
    pub collection: CollectionKind,
    pub entries: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusItem {
    pub health: HealthReport,
    pub collections: Vec<CollectionCount>,
}

pub async fn run_status(coordinator: &StorageCoordinator, as_json: bool) -> Result<(), CliError> {
    let mut collections = Vec::with_capacity(CollectionKind::ALL.len());
    for kind in CollectionKind::ALL {
        let entries = with_entity!(kind, T => coordinator.initialize::<T>().await.len());
        collections.push(CollectionCount {
            collection: kind,
            entries,
        });
    }

    let status = StatusItem {
        health: coordinator.health(),
        collections,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        for line in format_status_lines(&status) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_status_lines(status: &StatusItem) -> Vec<String> {
    let health = &status.health;
    let remote = if health.remote_active {
        "active"
    } else if health.remote_disabled {
        "disabled"
    } else {
        "unavailable"
    };

    let mut lines = vec![format!("remote: {remote} ({})", health.client_state)];
    if let Some(error) = &health.last_error {
        lines.push(format!("last error: {error}"));
    }
    if health.consecutive_transport_errors > 0 {
        lines.push(format!(
            "transport errors in a row: {}",
            health.consecutive_transport_errors
        ));
    }
    if let Some(path) = &health.cache_path {
        lines.push(format!("cache: {}", path.display()));
    }
    lines.extend(
        status
            .collections
            .iter()
            .map(|count| format!("{}: {}", count.collection, count.entries)),
    );
    lines
}
