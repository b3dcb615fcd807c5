//! Seed catalog products from a YAML file.
//!
//! ```yaml
//! - id: P1
//!   title: Linen Shirt
//!   image: https://cdn.example/p1.jpg
//!   price: "49.00"
//!   salePrice: "39.00"
//!   totalStock: 12
//! ```
//!
//! Existing products with the same id are overwritten.

use std::collections::HashSet;
use std::path::Path;

use tracing::{error, info};

use shopfront_core::Product;
use shopfront_storefront::db::ProductRepository;

use super::connect;

/// Read and validate a product list. Validation happens before any database
/// connection is made.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a valid product list,
/// or repeats a product id.
pub async fn load_products(path: &Path) -> Result<Vec<Product>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }

    let content = tokio::fs::read_to_string(path).await?;
    let products: Vec<Product> = serde_yaml::from_str(&content)?;

    let mut seen = HashSet::new();
    let duplicates: Vec<&str> = products
        .iter()
        .filter(|p| !seen.insert(p.id.as_str()))
        .map(|p| p.id.as_str())
        .collect();
    if !duplicates.is_empty() {
        for id in &duplicates {
            error!("  - duplicate product id: {id}");
        }
        return Err(format!("{} duplicate product ids found", duplicates.len()).into());
    }

    Ok(products)
}

/// Insert or update every product in `file_path`.
///
/// # Errors
///
/// Returns an error if the file is invalid or database operations fail.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading products from file");

    let products = load_products(path).await?;
    info!(products = products.len(), "Parsed product list");

    let pool = connect().await?;
    let repo = ProductRepository::new(pool);

    for product in &products {
        repo.upsert(product).await?;
    }

    info!("Seeding complete!");
    info!("  Products upserted: {}", products.len());
    Ok(())
}
