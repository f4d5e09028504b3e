//! The `RowTransformer` trait — the contract every export reshaping fulfils.

use db::Row;
use tracing::debug;

/// The shape written to an export sink. Same constraints as [`Row`].
pub type ExportRecord = Row;

/// Pure row → record mapping. No I/O, no failure.
///
/// Implementations are swapped per export profile; the orchestrator only
/// sees this trait.
pub trait RowTransformer: Send + Sync {
    fn transform(&self, row: &Row) -> ExportRecord;

    /// Apply [`RowTransformer::transform`] to every row, keeping order.
    fn transform_all(&self, rows: &[Row]) -> Vec<ExportRecord> {
        let records: Vec<_> = rows.iter().map(|row| self.transform(row)).collect();
        debug!("Transformed {} rows", records.len());
        records
    }
}

/// Copies every column unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl RowTransformer for Passthrough {
    fn transform(&self, row: &Row) -> ExportRecord {
        row.clone()
    }
}
