use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::sheets::SheetSource;

const DEFAULT_COMPS_CSV: &str = "Voyant LRP Model 9.24.25.xlsx - Comp_Analysis.csv";
const DEFAULT_DCF_CSV: &str = "Voyant LRP Model 9.24.25.xlsx - DCF Analysis.csv";
const DEFAULT_TABLES_CSV: &str = "Voyant LRP Model 9.24.25.xlsx - Tables.csv";

/// Command line arguments. Every flag can also come from the environment
/// (or a `.env` file).
#[derive(Debug, Parser)]
#[command(
    name = "valuation_report",
    version,
    about = "Renders peer multiple and market opportunity charts from model exports"
)]
pub struct Cli {
    /// Comparable companies export (CSV)
    #[arg(long, env = "VALUATION_COMPS_CSV", default_value = DEFAULT_COMPS_CSV)]
    pub comps: PathBuf,

    /// DCF analysis export (CSV)
    #[arg(long, env = "VALUATION_DCF_CSV", default_value = DEFAULT_DCF_CSV)]
    pub dcf: PathBuf,

    /// Financial projections export (CSV)
    #[arg(long, env = "VALUATION_TABLES_CSV", default_value = DEFAULT_TABLES_CSV)]
    pub tables: PathBuf,

    /// Read all three sheets straight from this workbook instead of CSV exports
    #[arg(long, env = "VALUATION_WORKBOOK")]
    pub workbook: Option<PathBuf>,

    /// Directory that receives the charts and the summary
    #[arg(long, short, env = "VALUATION_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// JSON file overriding the analysis settings
    #[arg(long, env = "VALUATION_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Skip writing valuation_summary.json
    #[arg(long, env = "VALUATION_NO_SUMMARY")]
    pub no_summary: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "VALUATION_LOG", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerGroupAnchor {
    /// First company listed under the group in the comps sheet
    pub anchor: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SubjectSettings {
    pub short_name: String,
    pub full_name: String,
}

impl Default for SubjectSettings {
    fn default() -> Self {
        Self {
            short_name: "Voyant".to_string(),
            full_name: "Voyant Photonics".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompsSettings {
    pub sheet: String,
    pub header_row: usize,
    pub company_column: String,
    pub multiple_column: String,
    /// Rows whose company cell contains one of these are banners, not companies
    pub exclude_markers: Vec<String>,
    pub summary_marker: String,
    pub peer_groups: Vec<PeerGroupAnchor>,
}

impl Default for CompsSettings {
    fn default() -> Self {
        let anchor = |anchor: &str, label: &str| PeerGroupAnchor {
            anchor: anchor.to_string(),
            label: label.to_string(),
        };
        Self {
            sheet: "Comp_Analysis".to_string(),
            header_row: 7,
            company_column: "Company".to_string(),
            multiple_column: "EV/Revenue NTM".to_string(),
            exclude_markers: vec!["GROUP".to_string(), "Company".to_string()],
            summary_marker: "Median".to_string(),
            peer_groups: vec![
                anchor("Luminar Technologies", "Lidar Companies"),
                anchor("Broadcom", "Semiconductor/Photonics"),
                anchor("NVIDIA", "AI/Compute"),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DcfSettings {
    pub sheet: String,
    /// Raw grid position of the enterprise value (row 0 is the CSV header line)
    pub ev_row: usize,
    pub ev_column: usize,
}

impl Default for DcfSettings {
    fn default() -> Self {
        Self {
            sheet: "DCF Analysis".to_string(),
            ev_row: 7,
            ev_column: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectionSettings {
    pub sheet: String,
    pub header_row: usize,
    pub first_year: i32,
    pub year_count: usize,
    pub revenue_metric: String,
    /// Model figures are in thousands
    pub unit_scale: f64,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            sheet: "Tables".to_string(),
            header_row: 5,
            first_year: 2025,
            year_count: 6,
            revenue_metric: "Total Revenue".to_string(),
            unit_scale: 1000.0,
        }
    }
}

impl ProjectionSettings {
    pub fn last_year(&self) -> i32 {
        self.first_year + self.year_count as i32 - 1
    }

    pub fn covers(&self, year: i32) -> bool {
        self.year_count > 0 && (self.first_year..=self.last_year()).contains(&year)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValuationSettings {
    /// Revenue year used for the subject's forward multiple
    pub multiple_year: i32,
    /// Revenue year peer multiples are applied to
    pub exit_year: i32,
}

impl Default for ValuationSettings {
    fn default() -> Self {
        Self {
            multiple_year: 2027,
            exit_year: 2030,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarketSettings {
    pub base_size_billions: f64,
    pub cagr: f64,
    pub first_year: i32,
    pub last_year: i32,
    pub label: String,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            base_size_billions: 3.27,
            cagr: 0.313,
            first_year: 2025,
            last_year: 2030,
            label: "Global LiDAR Market Size ($B)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisSettings {
    pub subject: SubjectSettings,
    pub comps: CompsSettings,
    pub dcf: DcfSettings,
    pub projections: ProjectionSettings,
    pub valuation: ValuationSettings,
    pub market: MarketSettings,
}

impl AnalysisSettings {
    pub async fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::Config(format!("Failed to read settings {}: {}", path.display(), e))
        })?;
        let settings: AnalysisSettings = serde_json::from_str(&raw)?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.comps.peer_groups.is_empty() {
            return Err(AppError::Config("At least one peer group is required".to_string()));
        }
        if self.projections.year_count == 0 {
            return Err(AppError::Config("Projection table needs at least one year".to_string()));
        }
        for (name, year) in [
            ("multiple_year", self.valuation.multiple_year),
            ("exit_year", self.valuation.exit_year),
        ] {
            if !self.projections.covers(year) {
                return Err(AppError::Config(format!(
                    "{} {} is outside the projection years {}..={}",
                    name,
                    year,
                    self.projections.first_year,
                    self.projections.last_year()
                )));
            }
        }
        if self.market.last_year < self.market.first_year {
            return Err(AppError::Config("Market projection ends before it starts".to_string()));
        }
        if self.market.cagr <= -1.0 {
            return Err(AppError::Config(format!("Invalid market CAGR {}", self.market.cagr)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct InputSources {
    pub comps: SheetSource,
    pub dcf: SheetSource,
    pub tables: SheetSource,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub inputs: InputSources,
    pub output_dir: PathBuf,
    pub write_summary: bool,
    pub log_level: String,
    pub settings: AnalysisSettings,
}

impl Config {
    pub async fn from_cli(cli: Cli) -> Result<Self, AppError> {
        let settings = match &cli.settings {
            Some(path) => AnalysisSettings::from_json_file(path).await?,
            None => AnalysisSettings::default(),
        };
        settings.validate()?;

        let inputs = match cli.workbook {
            Some(workbook) => InputSources {
                comps: SheetSource::workbook(&workbook, &settings.comps.sheet),
                dcf: SheetSource::workbook(&workbook, &settings.dcf.sheet),
                tables: SheetSource::workbook(&workbook, &settings.projections.sheet),
            },
            None => InputSources {
                comps: SheetSource::Csv(cli.comps),
                dcf: SheetSource::Csv(cli.dcf),
                tables: SheetSource::Csv(cli.tables),
            },
        };

        Ok(Config {
            inputs,
            output_dir: cli.output_dir,
            write_summary: !cli.no_summary,
            log_level: cli.log_level,
            settings,
        })
    }
}

pub async fn load_config() -> Result<Config> {
    // Load .env file first so clap sees its variables
    dotenv().ok();

    let cli = Cli::parse();
    Ok(Config::from_cli(cli).await?)
}
