use smallvec::SmallVec;

use crate::config::ProjectionSettings;
use crate::error::AppError;
use crate::models::{RevenueProjection, YearValue};
use crate::services::sheets::utils::{cell_number, cell_text};
use crate::services::sheets::SheetTable;

/// Pulls the revenue row out of the projections table.
///
/// The first column holds the metric name and the next `year_count`
/// columns are consecutive model years, whatever their header text says.
/// Model figures are scaled by `unit_scale` into dollars.
pub fn parse_projections(
    table: &SheetTable,
    settings: &ProjectionSettings,
) -> Result<RevenueProjection, AppError> {
    let needed = settings.year_count + 1;
    if table.headers.len() < needed {
        return Err(AppError::InvalidInput(format!(
            "{} has {} columns, expected a metric column and {} years",
            table.name,
            table.headers.len(),
            settings.year_count
        )));
    }

    let row = table
        .rows
        .iter()
        .position(|row| {
            row.first().and_then(cell_text).as_deref() == Some(settings.revenue_metric.as_str())
        })
        .ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Metric '{}' not found in {}",
                settings.revenue_metric, table.name
            ))
        })?;

    let years = (0..settings.year_count)
        .map(|offset| {
            let year = settings.first_year + offset as i32;
            let cell = table.value(row, offset + 1);
            cell_number(cell)
                .map(|value| YearValue {
                    year,
                    value: value * settings.unit_scale,
                })
                .ok_or_else(|| {
                    AppError::ParseError(format!(
                        "{} for {} is not a number: {:?}",
                        settings.revenue_metric,
                        year,
                        cell_text(cell).unwrap_or_default()
                    ))
                })
        })
        .collect::<Result<SmallVec<[YearValue; 8]>, _>>()?;

    for yv in &years {
        tracing::debug!("{} {}: {:.0}", settings.revenue_metric, yv.year, yv.value);
    }
    tracing::info!(
        "Parsed {} for {}..={} from {}",
        settings.revenue_metric,
        settings.first_year,
        settings.last_year(),
        table.name
    );

    Ok(RevenueProjection {
        metric: settings.revenue_metric.clone(),
        years,
    })
}
