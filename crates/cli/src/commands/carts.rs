//! Cart maintenance commands.

use shopfront_storefront::db::GuestCartRepository;

use super::connect;

/// Delete guest carts whose session lifetime has passed.
///
/// The server also purges hourly; this is for one-off cleanup.
///
/// # Errors
///
/// Returns an error if the connection or the delete fails.
pub async fn purge_expired() -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect().await?;

    // The write TTL plays no part in purging.
    let repo = GuestCartRepository::new(pool, chrono::Duration::zero());
    let purged = repo.purge_expired().await?;

    tracing::info!(purged, "Expired guest carts removed");
    Ok(())
}
