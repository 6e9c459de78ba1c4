use rally_core::{CollectionKind, Entity, StorageCoordinator};

use crate::commands::common::ListLine;
use crate::error::CliError;

pub async fn run_list(
    coordinator: &StorageCoordinator,
    kind: CollectionKind,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    with_entity!(kind, T => print_collection::<T>(coordinator, limit, as_json).await)
}

async fn print_collection<T: Entity + ListLine>(
    coordinator: &StorageCoordinator,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let items = first_entries(coordinator.initialize::<T>().await.read(), limit);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        println!("No {} found.", T::KIND);
    } else {
        for item in &items {
            println!("{}", item.list_line());
        }
    }

    Ok(())
}

pub fn first_entries<T>(items: Vec<T>, limit: usize) -> Vec<T> {
    items.into_iter().take(limit).collect()
}
