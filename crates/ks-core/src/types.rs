//! Common data types for Kausal

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::traits::TabularData;
use crate::{Error, Result};

/// In-memory table of named `f64` columns (rows = units).
///
/// All columns have the same, non-zero length and contain only finite values.
/// Deserializes from a JSON object mapping column names to arrays:
///
/// ```json
/// { "ability": [0.1, -1.2], "education": [1.0, 0.0], "income": [3.2, 1.1] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<f64>>", into = "BTreeMap<String, Vec<f64>>")]
pub struct Dataset {
    columns: BTreeMap<String, Vec<f64>>,
    n_rows: usize,
}

impl Dataset {
    /// Build a dataset from `(name, values)` pairs.
    pub fn new<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (name, values) in columns {
            let name = name.into();
            if map.contains_key(&name) {
                return Err(Error::Validation(format!("duplicate column '{}'", name)));
            }
            map.insert(name, values);
        }
        Self::try_from(map)
    }

    /// Parse a dataset from a JSON object of column arrays.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Return a copy without the named columns (missing names are ignored).
    pub fn without_columns(&self, names: &[&str]) -> Result<Self> {
        let kept: BTreeMap<String, Vec<f64>> = self
            .columns
            .iter()
            .filter(|(k, _)| !names.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self::try_from(kept)
    }

    /// Number of columns.
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }
}

impl TryFrom<BTreeMap<String, Vec<f64>>> for Dataset {
    type Error = Error;

    fn try_from(columns: BTreeMap<String, Vec<f64>>) -> Result<Self> {
        let n_rows = columns.values().next().map(|c| c.len()).unwrap_or(0);
        if columns.is_empty() || n_rows == 0 {
            return Err(Error::Validation("dataset must have at least 1 column and 1 row".into()));
        }
        for (name, values) in &columns {
            if values.len() != n_rows {
                return Err(Error::Validation(format!(
                    "dataset must be rectangular: column '{}' has {} rows, expected {}",
                    name,
                    values.len(),
                    n_rows
                )));
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(Error::Validation(format!(
                    "column '{}' must contain only finite values",
                    name
                )));
            }
        }
        Ok(Self { columns, n_rows })
    }
}

impl From<Dataset> for BTreeMap<String, Vec<f64>> {
    fn from(d: Dataset) -> Self {
        d.columns
    }
}

impl TabularData for Dataset {
    fn n_rows(&self) -> usize {
        self.n_rows
    }

    fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|c| c.as_slice())
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_basic() {
        let d = Dataset::new([("a", vec![1.0, 2.0]), ("b", vec![3.0, 4.0])]).unwrap();
        assert_eq!(d.n_rows(), 2);
        assert_eq!(d.n_columns(), 2);
        assert_eq!(d.column("b").unwrap(), &[3.0, 4.0]);
        assert!(d.column("c").is_none());
        assert_eq!(d.column_names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_dataset_validation() {
        assert!(Dataset::new(Vec::<(String, Vec<f64>)>::new()).is_err());
        assert!(Dataset::new([("a", vec![])]).is_err());
        assert!(Dataset::new([("a", vec![1.0]), ("b", vec![1.0, 2.0])]).is_err());
        assert!(Dataset::new([("a", vec![f64::NAN])]).is_err());
        assert!(Dataset::new([("a", vec![1.0]), ("a", vec![2.0])]).is_err());
    }

    #[test]
    fn test_dataset_json_roundtrip_shape() {
        let d = Dataset::from_json_str(r#"{"x": [1.0, 2.0, 3.0], "y": [0.0, 1.0, 0.0]}"#).unwrap();
        assert_eq!(d.n_rows(), 3);
        let ragged = Dataset::from_json_str(r#"{"x": [1.0], "y": [0.0, 1.0]}"#);
        assert!(ragged.is_err());
    }

    #[test]
    fn test_without_columns() {
        let d = Dataset::new([("a", vec![1.0]), ("b", vec![2.0])]).unwrap();
        let d2 = d.without_columns(&["a"]).unwrap();
        assert!(!d2.has_column("a"));
        assert!(d.has_column("a"));
    }
}
