//! Shared domain types for Verdant Market.
//!
//! Everything the `server` and `cli` crates agree on lives here: ID
//! newtypes, [`Email`], [`Slug`], [`Price`], [`Role`], and
//! [`IngredientList`]. The crate is deliberately I/O-free — no database
//! access and no HTTP — so any component can depend on it without
//! dragging a runtime along.
//!
//! Database trait impls are behind the `sqlite` feature so the `cli`
//! can stay lean.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
