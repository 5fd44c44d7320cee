//! Core types for Verdant Market.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod ingredients;
pub mod price;
pub mod role;
pub mod slug;

pub use email::{Email, EmailError};
pub use id::*;
pub use ingredients::IngredientList;
pub use price::{Price, PriceError};
pub use role::Role;
pub use slug::{Slug, SlugError};
