//! Product Model

use serde::{Deserialize, Serialize};

/// Product entity
///
/// Catalog management itself lives elsewhere; the engine only reads
/// products to validate order items and snapshot their price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    /// Price in rupiah (integer minor units, no fractional component)
    pub price: i64,
    pub sort_order: i32,
    pub is_active: bool,
}

impl Product {
    /// Minimal constructor for seeding and tests
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            image: None,
            price,
            sort_order: 0,
            is_active: true,
        }
    }
}
