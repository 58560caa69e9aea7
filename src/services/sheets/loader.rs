use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use polars::prelude::*;

use super::types::{RawSheet, SheetSource};
use crate::error::AppError;

/// Reads a worksheet from disk into a raw cell grid.
pub async fn load_sheet(source: &SheetSource) -> Result<RawSheet, AppError> {
    let start = Instant::now();
    tracing::info!("Loading {}", source);

    let file_data = tokio::fs::read(source.path()).await.map_err(|e| {
        tracing::error!("Failed to read {}: {}", source.path().display(), e);
        AppError::IoError(e)
    })?;
    let file_data = Bytes::from(file_data);

    let sheet = match source {
        SheetSource::Csv(path) => {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            parse_csv_from_bytes(file_data, &name)?
        }
        SheetSource::Workbook { sheet, .. } => read_worksheet_from_bytes(file_data, sheet)?,
    };

    tracing::info!(
        "Loaded {}: {} rows x {} columns in {:?}",
        source,
        sheet.height(),
        sheet.width(),
        start.elapsed()
    );
    Ok(sheet)
}

/// Parses a CSV export without a header so every line stays addressable.
pub fn parse_csv_from_bytes(file_data: Bytes, name: &str) -> Result<RawSheet, AppError> {
    let width = widest_record(&file_data, name)?;
    if width == 0 {
        return Ok(RawSheet::from_rows(name, Vec::new()));
    }

    // Polars sizes an inferred schema from the first line, so pin it to the
    // widest record and read every column as text
    let schema = (0..width)
        .map(|idx| Field::new(&format!("column_{}", idx + 1), DataType::String))
        .collect::<Schema>();

    let df = CsvReader::new(Cursor::new(file_data))
        .has_header(false)
        .with_schema(Some(Arc::new(schema)))
        .truncate_ragged_lines(true)
        .finish()
        .map_err(|e| {
            tracing::error!("Failed to parse CSV {}: {}", name, e);
            AppError::FileProcessingError(format!("Failed to parse CSV {}: {}", name, e))
        })?;

    let columns = df
        .get_columns()
        .iter()
        .map(|series| series.cast(&DataType::String))
        .collect::<PolarsResult<Vec<_>>>()?;
    let text_columns = columns
        .iter()
        .map(|series| series.str())
        .collect::<PolarsResult<Vec<_>>>()?;

    let rows = (0..df.height())
        .map(|row_idx| {
            text_columns
                .iter()
                .map(|ca| match ca.get(row_idx) {
                    Some(value) if !value.trim().is_empty() => Data::String(value.to_string()),
                    _ => Data::Empty,
                })
                .collect()
        })
        .collect();

    Ok(RawSheet::from_rows(name, rows))
}

/// Field count of the longest record; spreadsheet exports are ragged.
fn widest_record(file_data: &[u8], name: &str) -> Result<usize, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file_data);

    let mut record = csv::ByteRecord::new();
    let mut width = 0;
    loop {
        match reader.read_byte_record(&mut record) {
            Ok(true) => width = width.max(record.len()),
            Ok(false) => break,
            Err(e) => {
                tracing::error!("Failed to scan CSV {}: {}", name, e);
                return Err(AppError::FileProcessingError(format!(
                    "Failed to parse CSV {}: {}",
                    name, e
                )));
            }
        }
    }
    Ok(width)
}

/// Reads one worksheet of an xlsx workbook, re-anchored at `A1`.
pub fn read_worksheet_from_bytes(file_data: Bytes, sheet_name: &str) -> Result<RawSheet, AppError> {
    let cursor = Cursor::new(file_data);
    let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor).map_err(|e| {
        tracing::error!("Failed to open Excel file: {}", e);
        AppError::FileProcessingError(format!("Failed to open Excel file: {}", e))
    })?;

    let sheet_names = workbook.sheet_names().to_vec();
    if !sheet_names.iter().any(|name| name == sheet_name) {
        return Err(AppError::FileProcessingError(format!(
            "Worksheet '{}' not found, workbook has {:?}",
            sheet_name, sheet_names
        )));
    }

    let range = workbook.worksheet_range(sheet_name)?;

    // Ranges start at the first used cell; pad back to A1
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<Data>> = vec![Vec::new(); row_offset];
    rows.extend(range.rows().map(|row| {
        let mut cells = vec![Data::Empty; col_offset];
        cells.extend_from_slice(row);
        cells
    }));

    tracing::debug!(
        "Worksheet {} starts at ({}, {})",
        sheet_name,
        row_offset,
        col_offset
    );
    Ok(RawSheet::from_rows(sheet_name, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const COMPS_CSV: &str = "\
Voyant LRP Model,,
,,
,Company,EV/Revenue NTM
,Luminar Technologies,\"9.5\"
,,
";

    #[test]
    fn csv_keeps_every_line_addressable() {
        let sheet = parse_csv_from_bytes(Bytes::from_static(COMPS_CSV.as_bytes()), "comps").unwrap();
        assert_eq!(sheet.width(), 3);
        assert_eq!(sheet.cell(0, 0), Some(&Data::String("Voyant LRP Model".into())));
        assert_eq!(sheet.cell(2, 1), Some(&Data::String("Company".into())));
        assert_eq!(sheet.cell(3, 2), Some(&Data::String("9.5".into())));
        assert_eq!(sheet.cell(3, 0), Some(&Data::Empty));
    }

    #[test]
    fn csv_rows_wider_than_the_first_line_are_kept() {
        let csv = "Voyant LRP Model,,\n,,\n,,\n,,,,,,,Enterprise Value,\"$776,000,000\"\n";
        let sheet = parse_csv_from_bytes(Bytes::copy_from_slice(csv.as_bytes()), "dcf").unwrap();
        assert_eq!(sheet.width(), 9);
        assert_eq!(sheet.cell(3, 8), Some(&Data::String("$776,000,000".into())));
        assert_eq!(sheet.cell(0, 8), Some(&Data::Empty));
    }

    #[test]
    fn empty_csv_is_an_empty_sheet() {
        let sheet = parse_csv_from_bytes(Bytes::new(), "empty").unwrap();
        assert_eq!(sheet.height(), 0);
    }

    #[test]
    fn load_sheet_reads_csv_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comps.csv");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(COMPS_CSV.as_bytes())
            .unwrap();

        let sheet = tokio_test::block_on(load_sheet(&SheetSource::Csv(path))).unwrap();
        assert_eq!(sheet.name(), "comps");
        assert_eq!(sheet.cell(3, 1), Some(&Data::String("Luminar Technologies".into())));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = SheetSource::Csv(dir.path().join("nope.csv"));
        assert!(matches!(load_sheet(&source).await, Err(AppError::IoError(_))));
    }

    const SHEET_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<dimension ref="C3:D4"/>
<sheetData>
<row r="3"><c r="C3"><v>42</v></c></row>
<row r="4"><c r="D4"><v>7.5</v></c></row>
</sheetData>
</worksheet>"#;

    /// Minimal single-sheet workbook whose first used cell is C3.
    fn workbook_bytes(sheet_name: &str) -> Bytes {
        use ::zip::write::SimpleFileOptions;

        let content_types = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;
        let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;
        let workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#,
            sheet_name
        );
        let workbook_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

        let mut zip = ::zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in [
            ("[Content_Types].xml", content_types),
            ("_rels/.rels", root_rels),
            ("xl/workbook.xml", workbook.as_str()),
            ("xl/_rels/workbook.xml.rels", workbook_rels),
            ("xl/worksheets/sheet1.xml", SHEET_XML),
        ] {
            zip.start_file(name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        Bytes::from(zip.finish().unwrap().into_inner())
    }

    #[test]
    fn worksheet_is_reanchored_at_a1() {
        let sheet = read_worksheet_from_bytes(workbook_bytes("Comp_Analysis"), "Comp_Analysis").unwrap();
        assert_eq!(sheet.name(), "Comp_Analysis");
        assert_eq!((sheet.height(), sheet.width()), (4, 4));
        assert_eq!(sheet.cell(0, 0), Some(&Data::Empty));
        assert_eq!(sheet.cell(2, 2), Some(&Data::Float(42.0)));
        assert_eq!(sheet.cell(2, 3), Some(&Data::Empty));
        assert_eq!(sheet.cell(3, 3), Some(&Data::Float(7.5)));
    }

    #[test]
    fn unknown_worksheet_is_a_processing_error() {
        let result = read_worksheet_from_bytes(workbook_bytes("Comp_Analysis"), "Tables");
        assert!(matches!(result, Err(AppError::FileProcessingError(_))));
    }

    #[tokio::test]
    async fn load_sheet_reads_workbook_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.xlsx");
        std::fs::write(&path, workbook_bytes("DCF Analysis")).unwrap();

        let sheet = load_sheet(&SheetSource::workbook(&path, "DCF Analysis")).await.unwrap();
        assert_eq!(sheet.cell(2, 2), Some(&Data::Float(42.0)));
    }

    #[tokio::test]
    async fn non_workbook_bytes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();

        let source = SheetSource::workbook(&path, "Tables");
        assert!(matches!(
            load_sheet(&source).await,
            Err(AppError::FileProcessingError(_))
        ));
    }
}
