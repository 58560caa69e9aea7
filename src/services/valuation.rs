use std::cmp::Ordering;

use crate::error::AppError;
use crate::models::{GroupMedian, MultipleBar, RevenueProjection, ScenarioKind, ValuationScenario};

/// Enterprise value over one year's projected revenue.
pub fn forward_multiple(
    enterprise_value: f64,
    revenue: &RevenueProjection,
    year: i32,
) -> Result<f64, AppError> {
    let year_revenue = revenue.revenue_for(year).ok_or_else(|| {
        AppError::InvalidInput(format!("No {} projection for {}", revenue.metric, year))
    })?;
    if year_revenue == 0.0 {
        return Err(AppError::InvalidInput(format!(
            "{} for {} is zero, the multiple is undefined",
            revenue.metric, year
        )));
    }

    let multiple = enterprise_value / year_revenue;
    tracing::info!("EV / {} revenue multiple: {:.2}x", year, multiple);
    Ok(multiple)
}

pub fn subject_label(full_name: &str, year: i32) -> String {
    format!("{} (EV/{} Revenue)", full_name, year)
}

/// Peer medians plus the subject's own bar, highest multiple first.
pub fn multiple_comparison(medians: &[GroupMedian], subject: &str, multiple: f64) -> Vec<MultipleBar> {
    let mut bars: Vec<MultipleBar> = medians
        .iter()
        .map(|m| MultipleBar {
            label: m.group.clone(),
            multiple: m.median_multiple,
            is_subject: false,
        })
        .collect();
    bars.push(MultipleBar {
        label: subject.to_string(),
        multiple,
        is_subject: true,
    });

    bars.sort_by(|a, b| b.multiple.partial_cmp(&a.multiple).unwrap_or(Ordering::Equal));
    bars
}

/// The DCF value next to the value implied by each peer median applied to
/// exit-year revenue. Peer scenarios run from the lowest multiple up.
pub fn peer_scenarios(
    enterprise_value: f64,
    exit_revenue: f64,
    medians: &[GroupMedian],
) -> Result<Vec<ValuationScenario>, AppError> {
    if exit_revenue <= 0.0 {
        return Err(AppError::InvalidInput(format!(
            "Exit year revenue must be positive, got {}",
            exit_revenue
        )));
    }
    if enterprise_value <= 0.0 {
        return Err(AppError::InvalidInput(format!(
            "Enterprise value must be positive, got {}",
            enterprise_value
        )));
    }

    let current_millions = enterprise_value / 1e6;
    let revenue_millions = exit_revenue / 1e6;

    let mut peers: Vec<ValuationScenario> = medians
        .iter()
        .map(|m| {
            let implied = revenue_millions * m.median_multiple;
            ValuationScenario {
                label: format!("At {} Multiple", m.group),
                kind: ScenarioKind::PeerMultiple,
                multiple: m.median_multiple,
                enterprise_value_millions: implied,
                upside_pct: Some((implied / current_millions - 1.0) * 100.0),
            }
        })
        .collect();
    peers.sort_by(|a, b| a.multiple.partial_cmp(&b.multiple).unwrap_or(Ordering::Equal));

    let mut scenarios = Vec::with_capacity(peers.len() + 1);
    scenarios.push(ValuationScenario {
        label: "Current DCF Valuation".to_string(),
        kind: ScenarioKind::CurrentDcf,
        multiple: enterprise_value / exit_revenue,
        enterprise_value_millions: current_millions,
        upside_pct: None,
    });
    scenarios.extend(peers);

    for scenario in &scenarios {
        tracing::info!(
            "{}: {:.1}x -> {}{}",
            scenario.label,
            scenario.multiple,
            format_millions(scenario.enterprise_value_millions),
            scenario
                .upside_pct
                .map(|pct| format!(" ({:+.0}%)", pct))
                .unwrap_or_default()
        );
    }
    Ok(scenarios)
}

/// `$3.51B` from 3510.0, `$776M` from 776.0.
pub fn format_millions(value: f64) -> String {
    if value >= 1000.0 {
        format!("${:.2}B", value / 1000.0)
    } else {
        format!("${:.0}M", value)
    }
}
