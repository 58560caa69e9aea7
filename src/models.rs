use chrono::{DateTime, Utc};
use serde::Serialize;
use smallvec::SmallVec;

/// One peer company row after cleaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyMultiple {
    pub company: String,
    pub group: Option<String>,
    /// EV/Revenue NTM, `None` when the sheet has no usable number
    pub ev_revenue: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMedian {
    pub group: String,
    pub median_multiple: f64,
    pub company_count: u64,
}

/// A bar on the valuation multiples chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultipleBar {
    pub label: String,
    pub multiple: f64,
    pub is_subject: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearValue {
    pub year: i32,
    pub value: f64,
}

/// Projected revenue in dollars, one entry per model year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueProjection {
    pub metric: String,
    pub years: SmallVec<[YearValue; 8]>,
}

impl RevenueProjection {
    pub fn revenue_for(&self, year: i32) -> Option<f64> {
        self.years.iter().find(|yv| yv.year == year).map(|yv| yv.value)
    }

    /// Revenue series in billions of dollars
    pub fn in_billions(&self) -> Vec<(i32, f64)> {
        self.years.iter().map(|yv| (yv.year, yv.value / 1e9)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketPoint {
    pub year: i32,
    pub size_billions: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    CurrentDcf,
    PeerMultiple,
}

/// Enterprise value of the subject under one multiple assumption.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationScenario {
    pub label: String,
    pub kind: ScenarioKind,
    pub multiple: f64,
    pub enterprise_value_millions: f64,
    /// Percent above the DCF value; `None` for the DCF scenario itself
    pub upside_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub generated_at: DateTime<Utc>,
    pub subject: String,
    pub companies: Vec<CompanyMultiple>,
    pub group_medians: Vec<GroupMedian>,
    pub enterprise_value: f64,
    pub multiple_year: i32,
    pub forward_multiple: f64,
    pub multiples_chart: Vec<MultipleBar>,
    pub revenue: RevenueProjection,
    pub market: Vec<MarketPoint>,
    pub exit_year: i32,
    pub scenarios: Vec<ValuationScenario>,
    pub charts: Vec<String>,
}
