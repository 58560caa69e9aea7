use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;

use crate::charts::{self, market::MarketChartLabels};
use crate::config::{AnalysisSettings, Config, InputSources};
use crate::error::AppError;
use crate::models::{
    CompanyMultiple, GroupMedian, MarketPoint, MultipleBar, ReportSummary, RevenueProjection,
    ValuationScenario,
};
use crate::services::sheets::load_sheet;
use crate::services::{comps, dcf, market, projections, valuation};

pub const SUMMARY_FILE: &str = "valuation_summary.json";

/// Everything the charts and the summary are built from.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub companies: Vec<CompanyMultiple>,
    pub medians: Vec<GroupMedian>,
    pub enterprise_value: f64,
    pub revenue: RevenueProjection,
    pub forward_multiple: f64,
    pub bars: Vec<MultipleBar>,
    pub scenarios: Vec<ValuationScenario>,
    pub market: Vec<MarketPoint>,
}

/// Loads the three sheets and derives every statistic the report needs.
pub async fn analyze(inputs: &InputSources, settings: &AnalysisSettings) -> Result<Analysis, AppError> {
    let load_start = Instant::now();
    let (comps_sheet, dcf_sheet, tables_sheet) = tokio::try_join!(
        load_sheet(&inputs.comps),
        load_sheet(&inputs.dcf),
        load_sheet(&inputs.tables),
    )?;
    tracing::info!("Inputs loaded in {:?}", load_start.elapsed());

    let comps_table = comps_sheet.table(settings.comps.header_row)?;
    let companies = comps::clean_comparables(&comps_table, &settings.comps)?;
    let medians = comps::median_multiples(&companies)?;
    if medians.is_empty() {
        tracing::error!("No peer group produced a median multiple");
        return Err(AppError::InvalidInput(
            "No peer group has a numeric EV/Revenue multiple".to_string(),
        ));
    }

    let enterprise_value = dcf::enterprise_value(&dcf_sheet, &settings.dcf)?;

    let tables = tables_sheet.table(settings.projections.header_row)?;
    let revenue = projections::parse_projections(&tables, &settings.projections)?;

    let multiple_year = settings.valuation.multiple_year;
    let forward_multiple = valuation::forward_multiple(enterprise_value, &revenue, multiple_year)?;
    let bars = valuation::multiple_comparison(
        &medians,
        &valuation::subject_label(&settings.subject.full_name, multiple_year),
        forward_multiple,
    );

    let exit_year = settings.valuation.exit_year;
    // Scenarios are optional; the multiples and market charts still render
    let scenarios = revenue
        .revenue_for(exit_year)
        .ok_or_else(|| {
            AppError::InvalidInput(format!("No {} projection for {}", revenue.metric, exit_year))
        })
        .and_then(|exit_revenue| valuation::peer_scenarios(enterprise_value, exit_revenue, &medians))
        .unwrap_or_else(|e| {
            tracing::warn!("Skipping peer valuation scenarios: {}", e);
            Vec::new()
        });

    let market = market::project_market(&settings.market);

    Ok(Analysis {
        companies,
        medians,
        enterprise_value,
        revenue,
        forward_multiple,
        bars,
        scenarios,
        market,
    })
}

/// Lowercase file name prefix from a display name.
pub fn file_slug(name: &str) -> String {
    let cleaned = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .to_lowercase();

    if cleaned.is_empty() {
        "report".to_string()
    } else {
        cleaned
    }
}

/// Output paths for every chart, in rendering order.
pub fn chart_paths(output_dir: &Path, subject: &str) -> [PathBuf; 3] {
    let slug = file_slug(subject);
    [
        output_dir.join(format!("{}_valuation_multiples.png", slug)),
        output_dir.join(format!("{}_market_opportunity.png", slug)),
        output_dir.join(format!("{}_peer_valuation.png", slug)),
    ]
}

fn render_charts(
    analysis: &Analysis,
    settings: &AnalysisSettings,
    paths: [PathBuf; 3],
) -> Result<Vec<PathBuf>, charts::ChartError> {
    let subject = &settings.subject.short_name;
    let [multiples_path, market_path, scenarios_path] = paths;

    charts::render_multiples_chart(
        &analysis.bars,
        &format!("{}'s Forward Revenue Multiple is Attractively Positioned vs. Peers", subject),
        &multiples_path,
    )?;

    let labels = MarketChartLabels {
        title: format!(
            "{} is Positioned to Capture a Significant Share of a Rapidly Growing Market",
            subject
        ),
        market: settings.market.label.clone(),
        revenue: format!("{} Revenue ($B)", subject),
    };
    charts::render_market_chart(&analysis.market, &analysis.revenue.in_billions(), &labels, &market_path)?;

    if analysis.scenarios.is_empty() {
        return Ok(vec![multiples_path, market_path]);
    }

    let exit_year = settings.valuation.exit_year;
    let exit_revenue = analysis.revenue.revenue_for(exit_year).unwrap_or_default();
    charts::render_scenario_chart(
        &analysis.scenarios,
        &format!("{} Valuation at Peer Multiples", subject),
        &format!(
            "Applying industry multiples to {}'s {} revenue ({})",
            subject,
            exit_year,
            valuation::format_millions(exit_revenue / 1e6)
        ),
        &scenarios_path,
    )?;

    Ok(vec![multiples_path, market_path, scenarios_path])
}

/// Runs the whole report: analysis, charts, then the JSON summary.
pub async fn run(config: &Config) -> Result<ReportSummary, AppError> {
    let start = Instant::now();
    let settings = &config.settings;
    tracing::info!("Starting valuation report for {}", settings.subject.full_name);

    let analysis = analyze(&config.inputs, settings).await?;
    tracing::info!("Analysis completed in {:?}", start.elapsed());

    tokio::fs::create_dir_all(&config.output_dir).await?;

    let chart_start = Instant::now();
    let paths = chart_paths(&config.output_dir, &settings.subject.short_name);
    let charts = {
        let analysis = analysis.clone();
        let settings = settings.clone();
        tokio::task::spawn_blocking(move || render_charts(&analysis, &settings, paths)).await??
    };
    tracing::info!("Rendered {} charts in {:?}", charts.len(), chart_start.elapsed());

    let summary = ReportSummary {
        generated_at: Utc::now(),
        subject: settings.subject.full_name.clone(),
        companies: analysis.companies,
        group_medians: analysis.medians,
        enterprise_value: analysis.enterprise_value,
        multiple_year: settings.valuation.multiple_year,
        forward_multiple: analysis.forward_multiple,
        multiples_chart: analysis.bars,
        revenue: analysis.revenue,
        market: analysis.market,
        exit_year: settings.valuation.exit_year,
        scenarios: analysis.scenarios,
        charts: charts.iter().map(|p| p.display().to_string()).collect(),
    };

    if config.write_summary {
        let summary_path = config.output_dir.join(SUMMARY_FILE);
        let json = serde_json::to_string_pretty(&summary)?;
        tokio::fs::write(&summary_path, json).await?;
        tracing::info!("Wrote {}", summary_path.display());
    }

    tracing::info!("Total processing completed in {:?}", start.elapsed());
    Ok(summary)
}
