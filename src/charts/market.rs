use std::path::Path;

use plotters::prelude::*;

use super::{
    axis_max, bar_label_style, font, title_font, validate_series, ChartError, Result,
    DARK_ORANGE, GRID_BACKGROUND, MIDNIGHT_BLUE, SKY_BLUE, SLATE_BLUE,
};
use crate::models::MarketPoint;

const SIZE: (u32, u32) = (1200, 700);

/// Labels for the market area chart.
#[derive(Debug, Clone)]
pub struct MarketChartLabels {
    pub title: String,
    pub market: String,
    pub revenue: String,
}

/// Area chart of market size with the subject's revenue on a secondary axis.
///
/// `revenue` is in billions, like the market sizes, but gets its own scale
/// since it is a small fraction of the market. Every other market point is
/// annotated with its size.
pub fn render_market_chart(
    market: &[MarketPoint],
    revenue: &[(i32, f64)],
    labels: &MarketChartLabels,
    output_path: &Path,
) -> Result<()> {
    validate_series(market.iter().map(|p| p.size_billions), "Market sizes")?;
    validate_series(revenue.iter().map(|(_, v)| *v), "Revenue")?;

    let first_year = market
        .iter()
        .map(|p| p.year)
        .chain(revenue.iter().map(|(y, _)| *y))
        .min()
        .unwrap_or_default();
    let last_year = market
        .iter()
        .map(|p| p.year)
        .chain(revenue.iter().map(|(y, _)| *y))
        .max()
        .unwrap_or_default();
    let x_range = (first_year as f64 - 0.25)..(last_year as f64 + 0.25);
    let year_count = (last_year - first_year + 1) as usize;

    let market_max = axis_max(market.iter().map(|p| p.size_billions), 1.15);
    let revenue_max = axis_max(revenue.iter().map(|(_, v)| *v), 1.2);

    let root = BitMapBackend::new(output_path, SIZE).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| ChartError::DrawingArea(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&labels.title, title_font())
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .right_y_label_area_size(90)
        .build_cartesian_2d(x_range.clone(), 0f64..market_max)
        .map_err(|e| ChartError::ChartConfig(e.to_string()))?
        .set_secondary_coord(x_range, 0f64..revenue_max);

    chart
        .plotting_area()
        .fill(&GRID_BACKGROUND)
        .map_err(|e| ChartError::DrawingArea(e.to_string()))?;

    chart
        .configure_mesh()
        .bold_line_style(&WHITE)
        .light_line_style(&WHITE.mix(0.6))
        .x_labels(year_count)
        .x_label_formatter(&|x| format!("{:.0}", x))
        .y_desc("Market Size ($B)")
        .y_label_formatter(&|y| format!("${:.0}B", y))
        .axis_desc_style(font(20.0))
        .label_style(font(15.0))
        .draw()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    chart
        .configure_secondary_axes()
        .y_desc(labels.revenue.clone())
        .y_label_formatter(&|y| format!("${:.2}B", y))
        .axis_desc_style(font(20.0).color(&DARK_ORANGE))
        .label_style(font(15.0).color(&DARK_ORANGE))
        .draw()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    let market_series: Vec<(f64, f64)> = market
        .iter()
        .map(|p| (p.year as f64, p.size_billions))
        .collect();
    let area_style = SKY_BLUE.mix(0.4);

    chart
        .draw_series(AreaSeries::new(market_series.iter().copied(), 0.0, &area_style))
        .map_err(|e| ChartError::Drawing(e.to_string()))?
        .label(labels.market.as_str())
        .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 20, y + 6)], area_style.filled()));

    chart
        .draw_series(LineSeries::new(
            market_series.iter().copied(),
            SLATE_BLUE.mix(0.6).stroke_width(2),
        ))
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    let revenue_series: Vec<(f64, f64)> = revenue.iter().map(|(y, v)| (*y as f64, *v)).collect();

    chart
        .draw_secondary_series(LineSeries::new(
            revenue_series.iter().copied(),
            DARK_ORANGE.stroke_width(3),
        ))
        .map_err(|e| ChartError::Drawing(e.to_string()))?
        .label(labels.revenue.as_str())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], DARK_ORANGE.stroke_width(3)));

    chart
        .draw_secondary_series(
            revenue_series
                .iter()
                .map(|&point| Circle::new(point, 7, DARK_ORANGE.filled())),
        )
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    // Size labels on every other year, tucked under the curve
    chart
        .draw_series(
            market_series
                .iter()
                .step_by(2)
                .map(|&(year, size)| {
                    Text::new(
                        format!("${:.1}B", size),
                        (year, (size - 1.5).max(size * 0.5)),
                        bar_label_style(15.0, &MIDNIGHT_BLUE),
                    )
                }),
        )
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK.mix(0.3))
        .label_font(font(16.0))
        .draw()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    root.present()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    tracing::info!("Wrote {}", output_path.display());
    Ok(())
}
