//! Leadflow Recipe - `LeadSource` configuration, field-name resolution,
//! and row validation.
//!
//! Everything here is pure: no I/O, no database, no HTTP. The connectors
//! crate drives a CSV parse through [`field_resolver::resolve_mapping`]
//! and [`row_validation::validate_row`] one row at a time.

pub mod field_resolver;
pub mod recipe;
pub mod row_validation;

pub use recipe::{validate_recipe, RecipeError};
pub use row_validation::validate_row;
