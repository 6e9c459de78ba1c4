use rally_core::sync::SkipReason;
use rally_core::{CollectionKind, StorageCoordinator, SyncReport};

use crate::commands::common::format_report_line;
use crate::error::CliError;

pub async fn run_resync(
    coordinator: &StorageCoordinator,
    only: Option<CollectionKind>,
) -> Result<(), CliError> {
    let kinds = only.map_or_else(|| CollectionKind::ALL.to_vec(), |kind| vec![kind]);

    for kind in kinds {
        let report = with_entity!(kind, T => coordinator.initialize::<T>().await.resync().await)
            .unwrap_or_else(|| SyncReport::skipped(kind, SkipReason::NotRemoteCapable));
        println!("{}", format_report_line(&report));
    }
    Ok(())
}
