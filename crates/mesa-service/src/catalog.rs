//! # Product Catalog
//!
//! Read-only product lookup used by the cart handle. A product that is
//! missing or deactivated is reported as `None`; the caller turns that
//! into `ProductNotFound`.

use std::collections::HashMap;

use async_trait::async_trait;

use mesa_core::Product;
use mesa_db::Database;

use crate::error::StoreResult;

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Looks up an active product by code.
    async fn lookup(&self, code: &str) -> StoreResult<Option<Product>>;
}

#[async_trait]
impl ProductCatalog for Database {
    async fn lookup(&self, code: &str) -> StoreResult<Option<Product>> {
        let product = self.products().get_by_code(code).await?;
        Ok(product.filter(|p| p.is_active))
    }
}

/// Fixed catalog held in memory (demos, tests).
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: HashMap<String, Product>,
}

impl InMemoryCatalog {
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        InMemoryCatalog {
            products: products.into_iter().map(|p| (p.code.clone(), p)).collect(),
        }
    }

    pub fn insert(&mut self, product: Product) {
        self.products.insert(product.code.clone(), product);
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn lookup(&self, code: &str) -> StoreResult<Option<Product>> {
        Ok(self.products.get(code).filter(|p| p.is_active).cloned())
    }
}
