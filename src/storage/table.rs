use crate::error::{EtlError, EtlResult};
use crate::storage::value::{ColumnType, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Column { name: name.into(), ty }
    }
}

/// In-memory table: ordered, typed columns and positional rows. Two tables
/// are interchangeable when they compare equal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Table { columns, rows: Vec::new() }
    }

    /// Build a table from already-typed rows, inferring each column's type
    /// from the values it holds.
    pub fn from_rows(names: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let mut types = vec![ColumnType::Null; names.len()];
        for row in &rows {
            for (ty, v) in types.iter_mut().zip(row.iter()) {
                *ty = ty.unify(v.column_type());
            }
        }
        let columns = names
            .into_iter()
            .zip(types)
            .map(|(name, ty)| Column { name, ty })
            .collect();
        Table { columns, rows }
    }

    /// Build a table from raw text cells. A column is INTEGER when every
    /// non-empty cell parses as one, REAL when every cell is numeric, TEXT
    /// otherwise. Empty cells become NULL.
    pub fn from_raw(names: Vec<String>, raw: Vec<Vec<String>>) -> Self {
        let mut types = vec![ColumnType::Null; names.len()];
        for row in &raw {
            for (ty, cell) in types.iter_mut().zip(row.iter()) {
                *ty = ty.unify(infer_cell_type(cell));
            }
        }
        let rows = raw
            .into_iter()
            .map(|row| {
                row.iter()
                    .zip(types.iter())
                    .map(|(cell, ty)| convert_cell(cell, *ty))
                    .collect()
            })
            .collect();
        let columns = names
            .into_iter()
            .zip(types)
            .map(|(name, ty)| Column { name, ty })
            .collect();
        Table { columns, rows }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> EtlResult<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .or_else(|| self.columns.iter().position(|c| c.name.eq_ignore_ascii_case(name)))
            .ok_or_else(|| EtlError::ColumnNotFound(name.to_string()))
    }

    /// Values of one column, top to bottom.
    pub fn column(&self, name: &str) -> EtlResult<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    pub fn row(&self, idx: usize) -> Option<&[Value]> {
        self.rows.get(idx).map(Vec::as_slice)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> EtlResult<()> {
        if row.len() != self.columns.len() {
            return Err(EtlError::InvalidValue(format!(
                "expected {} values, got {}",
                self.columns.len(),
                row.len()
            )));
        }
        for (col, v) in self.columns.iter_mut().zip(row.iter()) {
            col.ty = col.ty.unify(v.column_type());
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn format_header(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.ty.as_str()))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn format_row(&self, idx: usize) -> Option<String> {
        self.row(idx).map(|r| {
            r.iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(" | ")
        })
    }
}

fn infer_cell_type(cell: &str) -> ColumnType {
    let cell = cell.trim();
    if cell.is_empty() {
        ColumnType::Null
    } else if cell.parse::<i64>().is_ok() {
        ColumnType::Integer
    } else if cell.bytes().any(|b| b.is_ascii_digit()) && cell.parse::<f64>().is_ok() {
        ColumnType::Real
    } else {
        ColumnType::Text
    }
}

fn convert_cell(cell: &str, ty: ColumnType) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match ty {
        ColumnType::Integer => trimmed.parse::<i64>().map(Value::Integer).unwrap_or(Value::Null),
        ColumnType::Real => trimmed.parse::<f64>().map(Value::Real).unwrap_or(Value::Null),
        _ => Value::text(cell),
    }
}
