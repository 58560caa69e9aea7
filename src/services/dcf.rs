use crate::config::DcfSettings;
use crate::error::AppError;
use crate::services::sheets::utils::{cell_number, cell_text};
use crate::services::sheets::RawSheet;

/// Enterprise value from its fixed cell on the DCF sheet.
pub fn enterprise_value(sheet: &RawSheet, settings: &DcfSettings) -> Result<f64, AppError> {
    let (row, col) = (settings.ev_row, settings.ev_column);
    let cell = sheet.cell(row, col).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Enterprise value cell ({}, {}) is outside {} ({} x {})",
            row,
            col,
            sheet.name(),
            sheet.height(),
            sheet.width()
        ))
    })?;

    let value = cell_number(cell).ok_or_else(|| {
        AppError::ParseError(format!(
            "Enterprise value cell ({}, {}) in {} is not a number: {:?}",
            row,
            col,
            sheet.name(),
            cell_text(cell).unwrap_or_default()
        ))
    })?;

    tracing::info!("Enterprise value from {}: {:.0}", sheet.name(), value);
    Ok(value)
}
