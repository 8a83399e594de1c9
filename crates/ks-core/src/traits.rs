//! Core traits for Kausal
//!
//! Estimators never own the data they are fitted on. They read named
//! columns through [`TabularData`], so any row/column store can sit behind
//! the boundary (the bundled [`crate::Dataset`], an Arrow batch, a view
//! over a larger frame, ...).

/// Read-only access to a table of named `f64` columns.
pub trait TabularData {
    /// Number of rows (units).
    fn n_rows(&self) -> usize;

    /// Column by name, or `None` when absent.
    fn column(&self, name: &str) -> Option<&[f64]>;

    /// All column names.
    fn column_names(&self) -> Vec<String>;

    /// Whether a column with this name exists.
    fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}
