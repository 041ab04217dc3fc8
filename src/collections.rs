use anyhow::Result;

use crate::config::Config;
use crate::models::seed_order;
use crate::store::Store;

/// Prints the known collections in seed order, with stored document counts
/// and snapshot presence. A store without a schema yet shows `-`.
pub async fn list_collections(config: &Config) -> Result<()> {
    let store = Store::open(config).await?;

    println!(
        "{:<12} {:>8} {:<9} {}",
        "COLLECTION", "STORED", "SNAPSHOT", "DEPENDS ON"
    );
    for collection in seed_order() {
        let stored = match store.count_collection(collection).await {
            Ok(n) => n.to_string(),
            Err(_) => "-".to_string(),
        };
        let snapshot = if config.snapshots.collection_file(collection).exists() {
            "present"
        } else {
            "missing"
        };
        let deps: Vec<&str> = collection.depends_on().iter().map(|d| d.name()).collect();
        let deps = if deps.is_empty() {
            "-".to_string()
        } else {
            deps.join(", ")
        };
        println!("{:<12} {:>8} {:<9} {}", collection.name(), stored, snapshot, deps);
    }

    store.close().await;
    Ok(())
}
