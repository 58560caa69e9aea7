use std::path::Path;

use plotters::prelude::*;

use super::{
    axis_max, bar_label_style, category_label, font, title_font, validate_series, ChartError,
    Result, GRID_BACKGROUND, PEER_BLUE, SUBJECT_ORANGE,
};
use crate::models::MultipleBar;

const SIZE: (u32, u32) = (1200, 720);

/// Bar chart of peer median multiples with the subject highlighted.
///
/// Bars are drawn in the order given; each carries a `{:.1}x` label just
/// above its top.
pub fn render_multiples_chart(bars: &[MultipleBar], title: &str, output_path: &Path) -> Result<()> {
    validate_series(bars.iter().map(|b| b.multiple), "Multiples")?;

    let labels: Vec<String> = bars.iter().map(|b| b.label.clone()).collect();
    let y_max = axis_max(bars.iter().map(|b| b.multiple), 1.15) + 0.5;

    let root = BitMapBackend::new(output_path, SIZE).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| ChartError::DrawingArea(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, title_font())
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d((0..bars.len()).into_segmented(), 0f64..y_max)
        .map_err(|e| ChartError::ChartConfig(e.to_string()))?;

    chart
        .plotting_area()
        .fill(&GRID_BACKGROUND)
        .map_err(|e| ChartError::DrawingArea(e.to_string()))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .bold_line_style(&WHITE)
        .light_line_style(&WHITE.mix(0.6))
        .x_labels(bars.len())
        .x_label_formatter(&|x| category_label(&labels, x))
        .y_desc("EV / Revenue Multiple")
        .y_label_formatter(&|y| format!("{:.0}x", y))
        .axis_desc_style(font(20.0))
        .label_style(font(15.0))
        .draw()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    chart
        .draw_series(bars.iter().enumerate().map(|(idx, bar)| {
            let color = if bar.is_subject { SUBJECT_ORANGE } else { PEER_BLUE };
            let mut rect = Rectangle::new(
                [
                    (SegmentValue::Exact(idx), 0.0),
                    (SegmentValue::Exact(idx + 1), bar.multiple),
                ],
                color.filled(),
            );
            rect.set_margin(0, 0, 30, 30);
            rect
        }))
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    chart
        .draw_series(bars.iter().enumerate().map(|(idx, bar)| {
            Text::new(
                format!("{:.1}x", bar.multiple),
                (SegmentValue::CenterOf(idx), bar.multiple + 0.2),
                bar_label_style(18.0, &BLACK),
            )
        }))
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    root.present()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    tracing::info!("Wrote {}", output_path.display());
    Ok(())
}
