//! Domain models: database rows, changesets, and enriched API views.

pub mod category;
pub mod post;
pub mod product;
pub mod session;
pub mod user;
pub mod vendor;

pub use category::{Category, CategoryChanges, NewCategory};
pub use post::{NewPost, Post, PostAuthor, PostChanges, PostSort, PostView};
pub use product::{
    FeatureChanges, NewProduct, Product, ProductChanges, ProductFeatures, ProductSort, ProductView,
};
pub use session::SessionUser;
pub use user::{AccountChanges, CurrentUser, User, UserView};
pub use vendor::{NewVendor, Vendor, VendorChanges, VendorView};

use serde::{Deserialize, Deserializer};

/// Deserialize helper distinguishing "absent" from "explicitly null".
///
/// Wrap a changeset field as `Option<Option<T>>` with
/// `#[serde(default, deserialize_with = "double_option")]`: absent stays
/// `None` (keep the stored value), `null` becomes `Some(None)` (clear it).
pub(crate) fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}
