use std::collections::HashMap;

use crate::codec::ParsedCsv;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub id: String,
    pub display_name: String,
}

impl ColumnDescriptor {
    fn from_field(name: &str) -> Self {
        ColumnDescriptor {
            id: name.to_string(),
            display_name: name.to_string(),
        }
    }
}

/// One parsed line, cells aligned with the dataset fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<String>,
}

impl Row {
    pub fn new(cells: Vec<String>) -> Self {
        Row { cells }
    }

    /// Cell at column `idx`, empty for cells the source line did not carry.
    pub fn cell(&self, idx: usize) -> &str {
        self.cells.get(idx).map(String::as_str).unwrap_or("")
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }
}

/// Parsed content of one loaded file. Never mutated after construction,
/// a new load replaces it as a whole.
#[derive(Debug, Default)]
pub struct Dataset {
    name: String,
    fields: Vec<String>,
    columns: Vec<ColumnDescriptor>,
    field_index: HashMap<String, usize>,
    rows: Vec<Row>,
}

impl Dataset {
    pub fn empty() -> Self {
        Dataset::default()
    }

    pub fn new(name: impl Into<String>, fields: Vec<String>, rows: Vec<Row>) -> Self {
        let columns = fields
            .iter()
            .map(|f| ColumnDescriptor::from_field(f))
            .collect();
        let field_index = fields
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.clone(), idx))
            .collect();
        Dataset {
            name: name.into(),
            fields,
            columns,
            field_index,
            rows,
        }
    }

    pub fn from_parsed(name: impl Into<String>, parsed: ParsedCsv) -> Self {
        let rows = parsed.rows.into_iter().map(Row::new).collect();
        Dataset::new(name, parsed.fields, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.field_index.get(field).copied()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.field_index.contains_key(field)
    }

    /// Value of `field` in row `row`. Unknown fields and missing cells read as empty.
    pub fn value(&self, row: usize, field: &str) -> &str {
        match (self.rows.get(row), self.field_index(field)) {
            (Some(r), Some(idx)) => r.cell(idx),
            _ => "",
        }
    }
}
