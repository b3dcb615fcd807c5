//! Product repository.
//!
//! Carts only read products; the `upsert` path exists for seeding.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use shopfront_core::{Product, ProductId};

use super::RepositoryError;
use crate::services::cart::ProductCatalog;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    title: String,
    image: Option<String>,
    price: Decimal,
    sale_price: Option<Decimal>,
    total_stock: i32,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let id = ProductId::parse(&row.id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid product id in database: {e}"))
        })?;
        let total_stock = u32::try_from(row.total_stock).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative stock for product {id}"))
        })?;

        Ok(Self {
            id,
            title: row.title,
            image: row.image,
            price: row.price,
            sale_price: row.sale_price,
            total_stock,
        })
    }
}

/// Repository for product reads and seeding.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row is invalid.
    pub async fn get_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(
            r"
            SELECT id, title, image, price, sale_price, total_stock
            FROM storefront.product
            WHERE id = $1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Get all products whose id is in `ids`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row is invalid.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();

        let rows: Vec<ProductRow> = sqlx::query_as(
            r"
            SELECT id, title, image, price, sale_price, total_stock
            FROM storefront.product
            WHERE id = ANY($1)
            ",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Insert a product or replace its fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, product: &Product) -> Result<(), RepositoryError> {
        let total_stock = i32::try_from(product.total_stock).unwrap_or(i32::MAX);

        sqlx::query(
            r"
            INSERT INTO storefront.product (id, title, image, price, sale_price, total_stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET title = EXCLUDED.title,
                image = EXCLUDED.image,
                price = EXCLUDED.price,
                sale_price = EXCLUDED.sale_price,
                total_stock = EXCLUDED.total_stock,
                updated_at = now()
            ",
        )
        .bind(product.id.as_str())
        .bind(&product.title)
        .bind(product.image.as_deref())
        .bind(product.price)
        .bind(product.sale_price)
        .bind(total_stock)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ProductCatalog for ProductRepository {
    async fn find(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        self.get_by_id(id).await
    }

    async fn find_many(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, RepositoryError> {
        let products = self.get_many(ids).await?;
        Ok(products.into_iter().map(|p| (p.id.clone(), p)).collect())
    }
}
