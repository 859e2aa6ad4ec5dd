use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;

use photo_pins::logging;
use photo_pins::state::{describe_added_at, KeyValueStore, MarkerStore, PhotoStore, SqliteStorage};
use photo_pins::StorageResult;

/// List the photo library and the pins placed on each photo.
///
/// Usage: `photo-pins [DB_PATH]` (defaults to the platform data directory)
#[tokio::main]
async fn main() {
    logging::init();

    let db_path = std::env::args().nth(1).map(PathBuf::from);
    if let Err(e) = run(db_path).await {
        tracing::error!(error = %e, "failed to open library");
        std::process::exit(1);
    }
}

async fn run(db_path: Option<PathBuf>) -> StorageResult<()> {
    let storage = match db_path {
        Some(path) => SqliteStorage::open(path)?,
        None => SqliteStorage::new()?,
    };
    let storage: Arc<dyn KeyValueStore> = Arc::new(storage);

    let photos = PhotoStore::load(Arc::clone(&storage)).await;
    let now = Local::now();

    if photos.photos().is_empty() {
        println!("No photos yet.");
        return Ok(());
    }

    for photo in photos.photos() {
        println!("{}  {}  ({})", photo.id, photo.uri, describe_added_at(photo.added_at, &now));

        let markers = MarkerStore::load(Arc::clone(&storage), photo.id.clone()).await;
        for marker in markers.markers() {
            println!("    {:>8.1} {:>8.1}  {}", marker.x, marker.y, marker.label);
        }
    }

    Ok(())
}
