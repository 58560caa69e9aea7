//! Static PNG charts for the valuation report
//!
//! Everything is drawn with the [`plotters`] bitmap backend. Chart functions
//! validate their data before the output file is created.

pub mod market;
pub mod multiples;
pub mod scenarios;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use thiserror::Error;

pub use market::render_market_chart;
pub use multiples::render_multiples_chart;
pub use scenarios::render_scenario_chart;

/// Errors that can occur during chart generation
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Failed to create drawing area: {0}")]
    DrawingArea(String),

    #[error("Failed to configure chart: {0}")]
    ChartConfig(String),

    #[error("Failed to draw chart elements: {0}")]
    Drawing(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = core::result::Result<T, ChartError>;

// Palette
pub const PEER_BLUE: RGBColor = RGBColor(0x1f, 0x77, 0xb4);
pub const SUBJECT_ORANGE: RGBColor = RGBColor(0xff, 0x7f, 0x0e);
pub const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
pub const SLATE_BLUE: RGBColor = RGBColor(106, 90, 205);
pub const DARK_ORANGE: RGBColor = RGBColor(255, 140, 0);
pub const MIDNIGHT_BLUE: RGBColor = RGBColor(25, 25, 112);
pub const SCENARIO_COLORS: [RGBColor; 4] = [
    RGBColor(0x3b, 0x82, 0xf6),
    RGBColor(0x8b, 0x5c, 0xf6),
    RGBColor(0x10, 0xb9, 0x81),
    RGBColor(0xf5, 0x9e, 0x0b),
];
/// Plot background in the style of a dark grid theme
pub const GRID_BACKGROUND: RGBColor = RGBColor(234, 234, 242);

pub(crate) fn font(size: f64) -> FontDesc<'static> {
    FontDesc::new(FontFamily::SansSerif, size, FontStyle::Normal)
}

pub(crate) fn title_font() -> FontDesc<'static> {
    FontDesc::new(FontFamily::SansSerif, 26.0, FontStyle::Bold)
}

/// Text centred horizontally and sitting on its anchor point
pub(crate) fn bar_label_style<C: Color>(size: f64, color: &C) -> TextStyle<'static> {
    font(size).color(color).pos(Pos::new(HPos::Center, VPos::Bottom))
}

/// Rejects empty or non-finite series before anything is drawn.
pub fn validate_series<I>(values: I, what: &str) -> Result<()>
where
    I: IntoIterator<Item = f64>,
{
    let mut count = 0;
    for value in values {
        if !value.is_finite() {
            return Err(ChartError::InvalidData(format!(
                "{} contains a non-finite value ({})",
                what, value
            )));
        }
        count += 1;
    }
    if count == 0 {
        return Err(ChartError::InvalidData(format!("{} cannot be empty", what)));
    }
    Ok(())
}

/// Upper bound for a value axis with headroom for labels.
pub(crate) fn axis_max(values: impl Iterator<Item = f64>, headroom: f64) -> f64 {
    let max = values.fold(0.0, f64::max);
    if max <= 0.0 {
        1.0
    } else {
        max * headroom
    }
}

/// Tick label for a categorical axis position.
pub(crate) fn category_label(labels: &[String], value: &SegmentValue<usize>) -> String {
    match value {
        SegmentValue::CenterOf(idx) | SegmentValue::Exact(idx) => {
            labels.get(*idx).cloned().unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    }
}
