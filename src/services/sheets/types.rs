use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use calamine::Data;

use super::utils::{cell_text, header_name};
use crate::error::AppError;

/// Where a worksheet comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetSource {
    /// CSV export of a single worksheet
    Csv(PathBuf),
    /// Worksheet inside an `.xlsx` workbook
    Workbook { path: PathBuf, sheet: String },
}

impl SheetSource {
    pub fn workbook(path: &Path, sheet: &str) -> Self {
        SheetSource::Workbook {
            path: path.to_path_buf(),
            sheet: sheet.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            SheetSource::Csv(path) => path,
            SheetSource::Workbook { path, .. } => path,
        }
    }
}

impl fmt::Display for SheetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSource::Csv(path) => write!(f, "{}", path.display()),
            SheetSource::Workbook { path, sheet } => write!(f, "{} [{}]", path.display(), sheet),
        }
    }
}

/// Rectangular grid of cells addressed from `A1`, whatever the source.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    name: String,
    rows: Vec<Vec<Data>>,
    width: usize,
}

impl RawSheet {
    /// Builds a sheet, padding ragged rows with empty cells.
    pub fn from_rows(name: impl Into<String>, mut rows: Vec<Vec<Data>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in rows.iter_mut() {
            row.resize(width, Data::Empty);
        }
        Self {
            name: name.into(),
            rows,
            width,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Positional lookup, `None` outside the grid.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Data> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Uses raw row `header_row` as the header line; everything below it
    /// becomes data. Blank header cells are named `Unnamed: <col>` and
    /// repeated names get a `.N` suffix.
    pub fn table(&self, header_row: usize) -> Result<SheetTable, AppError> {
        let header = self.rows.get(header_row).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Sheet '{}' has {} rows, header row {} is out of range",
                self.name,
                self.rows.len(),
                header_row
            ))
        })?;

        let mut existing_names = HashSet::new();
        let headers = header
            .iter()
            .enumerate()
            .map(|(idx, cell)| header_name(cell_text(cell).as_deref(), idx, &mut existing_names))
            .collect();

        Ok(SheetTable {
            name: self.name.clone(),
            headers,
            rows: self.rows[header_row + 1..].to_vec(),
        })
    }
}

/// A sheet split into a header line and data rows.
#[derive(Debug, Clone)]
pub struct SheetTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Data>>,
}

impl SheetTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn value(&self, row: usize, col: usize) -> &Data {
        static EMPTY: Data = Data::Empty;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }
}
