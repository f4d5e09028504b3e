//! `transform` crate — the `RowTransformer` trait and declarative field maps.
//!
//! This is the only place export-specific reshaping lives. The engine picks a
//! transformer per profile and never inspects row contents itself.

pub mod error;
pub mod field_map;
pub mod traits;

pub use error::TransformError;
pub use field_map::{FieldMap, FieldMapping, FieldRule, FieldType};
pub use traits::{ExportRecord, Passthrough, RowTransformer};
