//! Cache types for public catalogue responses.

use super::types::{MenuCategories, Product, ProductFilter};

/// Cache key for catalogue lookups.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products(ProductFilter),
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Vec<Product>),
    Categories(MenuCategories),
}
