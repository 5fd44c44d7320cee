//! Vendor domain types: per-product purchase offers.

use serde::{Deserialize, Serialize};

use verdant_core::{Price, ProductId, VendorId};

/// A stored vendor offer row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Vendor {
    pub id: VendorId,
    pub product_id: ProductId,
    pub name: String,
    pub url: String,
    pub price_cents: i64,
}

/// Vendor offer as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct VendorView {
    pub id: VendorId,
    pub product_id: ProductId,
    pub name: String,
    pub url: String,
    pub price: Price,
}

impl From<Vendor> for VendorView {
    fn from(vendor: Vendor) -> Self {
        Self {
            id: vendor.id,
            product_id: vendor.product_id,
            name: vendor.name,
            url: vendor.url,
            price: Price::from_cents(vendor.price_cents),
        }
    }
}

/// Payload for creating a vendor offer.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVendor {
    pub product_id: ProductId,
    pub name: String,
    pub url: String,
    pub price: Price,
}

/// Sparse changes to a vendor offer; no field is nullable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorChanges {
    pub name: Option<String>,
    pub url: Option<String>,
    pub price: Option<Price>,
}

impl VendorChanges {
    /// True when the changeset touches nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.url.is_none() && self.price.is_none()
    }
}
