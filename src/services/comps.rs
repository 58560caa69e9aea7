use calamine::Data;
use polars::prelude::*;

use crate::config::CompsSettings;
use crate::error::AppError;
use crate::models::{CompanyMultiple, GroupMedian};
use crate::services::sheets::utils::{cell_number, cell_text, is_empty_row};
use crate::services::sheets::SheetTable;

/// Turns the comparable companies sheet into company rows tagged with
/// their peer group.
///
/// Groups are positional: every row belongs to the last anchor company
/// listed at or above it, rows above the first anchor stay ungrouped.
pub fn clean_comparables(
    table: &SheetTable,
    settings: &CompsSettings,
) -> Result<Vec<CompanyMultiple>, AppError> {
    let company_col = locate_company_column(table, settings)?;
    let multiple_col = table.column_index(&settings.multiple_column).ok_or_else(|| {
        tracing::error!("Columns in {}: {:?}", table.name, table.headers);
        AppError::InvalidInput(format!(
            "Column '{}' not found in {}",
            settings.multiple_column, table.name
        ))
    })?;

    // Drop blank rows and section banners, keep original positions
    let rows: Vec<(usize, Option<String>, &Data)> = table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| !is_empty_row(row))
        .map(|(idx, row)| (idx, cell_text(&row[company_col]), &row[multiple_col]))
        .filter(|(_, company, _)| {
            company.as_deref().map_or(true, |name| {
                !settings
                    .exclude_markers
                    .iter()
                    .any(|marker| name.contains(marker.as_str()))
            })
        })
        .collect();

    let mut anchors = settings
        .peer_groups
        .iter()
        .map(|group| {
            rows.iter()
                .find(|(_, company, _)| company.as_deref() == Some(group.anchor.as_str()))
                .map(|(idx, _, _)| (*idx, group.label.as_str()))
                .ok_or_else(|| {
                    AppError::InvalidInput(format!(
                        "Peer group anchor '{}' not found in {}",
                        group.anchor, table.name
                    ))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    anchors.sort_by_key(|(idx, _)| *idx);
    tracing::debug!("Peer group anchors: {:?}", anchors);

    let companies: Vec<CompanyMultiple> = rows
        .into_iter()
        .filter_map(|(idx, company, multiple)| {
            let company = company?;
            if company.contains(settings.summary_marker.as_str()) {
                return None;
            }

            let group = anchors
                .iter()
                .rev()
                .find(|(anchor_idx, _)| *anchor_idx <= idx)
                .map(|(_, label)| label.to_string());

            let ev_revenue = cell_number(multiple);
            if ev_revenue.is_none() {
                if let Some(text) = cell_text(multiple) {
                    tracing::warn!("Non-numeric multiple '{}' for {}, skipping", text, company);
                }
            }

            Some(CompanyMultiple {
                company,
                group,
                ev_revenue,
            })
        })
        .collect();

    tracing::info!(
        "Cleaned {} companies ({} grouped) from {} rows of {}",
        companies.len(),
        companies.iter().filter(|c| c.group.is_some()).count(),
        table.height(),
        table.name
    );
    Ok(companies)
}

fn locate_company_column(table: &SheetTable, settings: &CompsSettings) -> Result<usize, AppError> {
    table
        .column_index(&settings.company_column)
        .or_else(|| table.column_index("Unnamed: 1"))
        .ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Column '{}' not found in {}",
                settings.company_column, table.name
            ))
        })
}

/// Median EV/Revenue per peer group, in order of first appearance.
/// Ungrouped companies and missing multiples do not count.
pub fn median_multiples(companies: &[CompanyMultiple]) -> Result<Vec<GroupMedian>, AppError> {
    let company: Vec<&str> = companies.iter().map(|c| c.company.as_str()).collect();
    let group: Vec<Option<&str>> = companies.iter().map(|c| c.group.as_deref()).collect();
    let ev_revenue: Vec<Option<f64>> = companies.iter().map(|c| c.ev_revenue).collect();

    let df = DataFrame::new(vec![
        Series::new("company", company),
        Series::new("group", group),
        Series::new("ev_revenue", ev_revenue),
    ])?;

    let grouped = df
        .lazy()
        .filter(col("group").is_not_null().and(col("ev_revenue").is_not_null()))
        .group_by_stable([col("group")])
        .agg([
            col("ev_revenue").median().alias("median_multiple"),
            col("company").count().cast(DataType::UInt64).alias("company_count"),
        ])
        .collect()?;

    let groups = grouped.column("group")?.str()?;
    let medians = grouped.column("median_multiple")?.f64()?;
    let counts = grouped.column("company_count")?.u64()?;

    let result: Vec<GroupMedian> = groups
        .into_iter()
        .zip(medians.into_iter())
        .zip(counts.into_iter())
        .filter_map(|((group, median), count)| {
            Some(GroupMedian {
                group: group?.to_string(),
                median_multiple: median?,
                company_count: count.unwrap_or(0),
            })
        })
        .collect();

    let mut seen: Vec<&str> = Vec::new();
    for name in companies.iter().filter_map(|c| c.group.as_deref()) {
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    for name in seen {
        if !result.iter().any(|m| m.group == name) {
            tracing::warn!("Peer group {} has no numeric multiples", name);
        }
    }

    for median in &result {
        tracing::info!(
            "{}: median EV/Revenue {:.2}x across {} companies",
            median.group,
            median.median_multiple,
            median.company_count
        );
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sheets::RawSheet;

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    fn row(company: &str, multiple: Data) -> Vec<Data> {
        let company = if company.is_empty() { Data::Empty } else { s(company) };
        vec![Data::Empty, company, s("TCK"), multiple]
    }

    fn comps_table() -> SheetTable {
        let rows = vec![
            vec![s("Comparable Companies Analysis")],
            vec![Data::Empty, s("Company"), s("Ticker"), s("EV/Revenue NTM")],
            row("LIDAR GROUP", Data::Empty),
            row("Luminar Technologies", Data::Float(9.0)),
            row("Ouster", s("12.0")),
            row("Aeva", Data::Float(5.0)),
            vec![Data::Empty; 4],
            row("Median", Data::Float(9.0)),
            row("SEMICONDUCTOR GROUP", Data::Empty),
            row("Company", s("EV/Revenue NTM")),
            row("Broadcom", Data::Float(6.0)),
            row("Lumentum", s("NM")),
            row("Coherent", Data::Int(4)),
            row("", Data::Float(100.0)),
            row("AI GROUP", Data::Empty),
            row("NVIDIA", s("8.0x")),
            row("Ambarella", Data::Float(7.0)),
        ];
        RawSheet::from_rows("Comp_Analysis", rows).table(1).unwrap()
    }

    #[test]
    fn assigns_groups_by_anchor_position() {
        let companies = clean_comparables(&comps_table(), &CompsSettings::default()).unwrap();
        let names: Vec<_> = companies.iter().map(|c| c.company.as_str()).collect();
        assert_eq!(
            names,
            vec!["Luminar Technologies", "Ouster", "Aeva", "Broadcom", "Lumentum", "Coherent", "NVIDIA", "Ambarella"]
        );

        let group_of = |name: &str| {
            companies
                .iter()
                .find(|c| c.company == name)
                .and_then(|c| c.group.clone())
        };
        assert_eq!(group_of("Aeva").as_deref(), Some("Lidar Companies"));
        assert_eq!(group_of("Coherent").as_deref(), Some("Semiconductor/Photonics"));
        assert_eq!(group_of("Ambarella").as_deref(), Some("AI/Compute"));
    }

    #[test]
    fn non_numeric_multiples_become_missing() {
        let companies = clean_comparables(&comps_table(), &CompsSettings::default()).unwrap();
        let lumentum = companies.iter().find(|c| c.company == "Lumentum").unwrap();
        assert_eq!(lumentum.ev_revenue, None);
        let nvidia = companies.iter().find(|c| c.company == "NVIDIA").unwrap();
        assert_eq!(nvidia.ev_revenue, Some(8.0));
    }

    #[test]
    fn rows_above_first_anchor_are_ungrouped() {
        let mut settings = CompsSettings::default();
        settings.peer_groups.remove(0);
        let companies = clean_comparables(&comps_table(), &settings).unwrap();
        let ouster = companies.iter().find(|c| c.company == "Ouster").unwrap();
        assert_eq!(ouster.group, None);
    }

    #[test]
    fn missing_anchor_is_an_error() {
        let mut settings = CompsSettings::default();
        settings.peer_groups[2].anchor = "Intel".to_string();
        let err = clean_comparables(&comps_table(), &settings).unwrap_err();
        assert!(err.to_string().contains("Intel"));
    }

    #[test]
    fn missing_multiple_column_is_an_error() {
        let settings = CompsSettings {
            multiple_column: "EV/EBITDA NTM".to_string(),
            ..CompsSettings::default()
        };
        assert!(matches!(
            clean_comparables(&comps_table(), &settings),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn medians_per_group_in_sheet_order() {
        let companies = clean_comparables(&comps_table(), &CompsSettings::default()).unwrap();
        let medians = median_multiples(&companies).unwrap();

        assert_eq!(medians.len(), 3);
        assert_eq!(medians[0].group, "Lidar Companies");
        assert_eq!(medians[0].median_multiple, 9.0);
        assert_eq!(medians[0].company_count, 3);
        assert_eq!(medians[1].group, "Semiconductor/Photonics");
        assert_eq!(medians[1].median_multiple, 5.0);
        assert_eq!(medians[1].company_count, 2);
        assert_eq!(medians[2].group, "AI/Compute");
        assert_eq!(medians[2].median_multiple, 7.5);
    }

    #[test]
    fn group_without_numbers_is_dropped() {
        let companies = vec![
            CompanyMultiple { company: "A".into(), group: Some("G1".into()), ev_revenue: Some(2.0) },
            CompanyMultiple { company: "B".into(), group: Some("G2".into()), ev_revenue: None },
            CompanyMultiple { company: "C".into(), group: None, ev_revenue: Some(50.0) },
        ];
        let medians = median_multiples(&companies).unwrap();
        assert_eq!(medians.len(), 1);
        assert_eq!(medians[0].group, "G1");
        assert_eq!(medians[0].median_multiple, 2.0);
    }
}
