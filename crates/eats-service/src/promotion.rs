use anyhow::Result;
use chrono::{DateTime, Utc};
use eats_db::Store;
use tracing::info;

/// Un-promotes every restaurant whose promotion ended before `now`.
pub async fn sweep_promotions(store: &dyn Store, now: DateTime<Utc>) -> Result<u64> {
    let cleared = store.clear_expired_promotions(now).await?;
    if cleared > 0 {
        info!(cleared, "expired promotions cleared");
    }
    Ok(cleared)
}
