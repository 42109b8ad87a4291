//! Compound tables: arrays of structured elements laid out as rows.

use std::fmt;

use super::{ArrayData, CompoundArray, ScalarValue};
use crate::util::DataType;

/// Builds the table for one compound array.
pub type CompoundWriter = fn(&CompoundArray<'_>) -> crate::util::Result<CompoundTable>;

/// One column of a compound dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompoundField {
    /// Column name; nested members are joined with `.`.
    pub name: String,
    /// Element type; fixed-length array members carry their length as extent.
    pub data_type: DataType,
}

impl CompoundField {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// One cell of a compound row.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Scalar(ScalarValue),
    Array(ArrayData),
}

impl FieldValue {
    /// Type the cell occupies in the row layout.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Scalar(s) => s.data_type(),
            Self::Array(a) => a.data_type().with_extent(a.len() as u32),
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Array(_) => None,
        }
    }
}

/// A compound dataset: one layout, many rows.
#[derive(Clone, PartialEq)]
pub struct CompoundTable {
    type_name: String,
    fields: Vec<CompoundField>,
    rows: Vec<Vec<FieldValue>>,
}

impl CompoundTable {
    /// Create an empty table with a fixed layout.
    pub fn new(type_name: impl Into<String>, fields: Vec<CompoundField>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
            rows: Vec::new(),
        }
    }

    /// Append a row. The row must match the layout cell by cell.
    pub fn push_row(&mut self, row: Vec<FieldValue>) -> Result<(), String> {
        if row.len() != self.fields.len() {
            return Err(format!(
                "expected {} columns, got {}",
                self.fields.len(),
                row.len()
            ));
        }
        for (field, cell) in self.fields.iter().zip(&row) {
            let dt = cell.data_type();
            if dt != field.data_type {
                return Err(format!(
                    "column '{}' is {}, got {}",
                    field.name, field.data_type, dt
                ));
            }
        }
        self.rows.push(row);
        Ok(())
    }

    /// Name of the element type the rows came from.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> &[CompoundField] {
        &self.fields
    }

    pub fn rows(&self) -> &[Vec<FieldValue>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All cells of a named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&FieldValue>> {
        let idx = self.fields.iter().position(|f| f.name == name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }
}

impl fmt::Debug for CompoundTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompoundTable")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .field("rows", &self.rows.len())
            .finish()
    }
}
