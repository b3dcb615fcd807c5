//! Product lookup port used to populate and prune cart lines.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use shopfront_core::{Product, ProductId};

use crate::db::RepositoryError;

/// Read-only access to current product data.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Find one product. `None` if it no longer exists.
    async fn find(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Find many products in one round trip. Missing ids are absent from
    /// the returned map.
    async fn find_many(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, RepositoryError>;
}

/// In-memory catalog for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl MemoryCatalog {
    /// Creates a catalog holding `products`.
    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            products: Arc::new(RwLock::new(products)),
        }
    }

    /// Delete a product, as an admin would.
    pub async fn delete(&self, id: &ProductId) -> Option<Product> {
        self.products.write().await.remove(id)
    }
}

#[async_trait]
impl ProductCatalog for MemoryCatalog {
    async fn find(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.get(id).cloned())
    }

    async fn find_many(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| products.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }
}
