use std::path::Path;

use plotters::prelude::*;

use super::{
    axis_max, bar_label_style, category_label, font, title_font, validate_series, ChartError,
    Result, GRID_BACKGROUND, SCENARIO_COLORS,
};
use crate::models::ValuationScenario;
use crate::services::valuation::format_millions;

const SIZE: (u32, u32) = (1200, 750);

fn axis_money(value: f64) -> String {
    if value >= 1000.0 {
        format!("${:.0}B", value / 1000.0)
    } else {
        format!("${:.0}M", value)
    }
}

/// Bar chart of enterprise values ($M) under each multiple scenario.
pub fn render_scenario_chart(
    scenarios: &[ValuationScenario],
    title: &str,
    subtitle: &str,
    output_path: &Path,
) -> Result<()> {
    validate_series(
        scenarios.iter().map(|s| s.enterprise_value_millions),
        "Scenario values",
    )?;

    let labels: Vec<String> = scenarios.iter().map(|s| s.label.clone()).collect();
    let y_max = axis_max(scenarios.iter().map(|s| s.enterprise_value_millions), 1.15);

    let root = BitMapBackend::new(output_path, SIZE).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| ChartError::DrawingArea(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, title_font())
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(90)
        .build_cartesian_2d((0..scenarios.len()).into_segmented(), 0f64..y_max)
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
        .x_labels(scenarios.len())
        .x_label_formatter(&|x| category_label(&labels, x))
        .x_desc(subtitle)
        .y_desc("Enterprise Value ($M)")
        .y_label_formatter(&|y| axis_money(*y))
        .axis_desc_style(font(18.0))
        .label_style(font(15.0))
        .draw()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    chart
        .draw_series(scenarios.iter().enumerate().map(|(idx, scenario)| {
            let color = SCENARIO_COLORS[idx % SCENARIO_COLORS.len()];
            let mut rect = Rectangle::new(
                [
                    (SegmentValue::Exact(idx), 0.0),
                    (SegmentValue::Exact(idx + 1), scenario.enterprise_value_millions),
                ],
                color.filled(),
            );
            rect.set_margin(0, 0, 40, 40);
            rect
        }))
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    let label_gap = y_max * 0.01;
    chart
        .draw_series(scenarios.iter().enumerate().map(|(idx, scenario)| {
            let color = SCENARIO_COLORS[idx % SCENARIO_COLORS.len()];
            let text = match scenario.upside_pct {
                Some(pct) => format!(
                    "{} ({:.1}x, {:+.0}%)",
                    format_millions(scenario.enterprise_value_millions),
                    scenario.multiple,
                    pct
                ),
                None => format!(
                    "{} ({:.1}x)",
                    format_millions(scenario.enterprise_value_millions),
                    scenario.multiple
                ),
            };
            Text::new(
                text,
                (
                    SegmentValue::CenterOf(idx),
                    scenario.enterprise_value_millions + label_gap,
                ),
                bar_label_style(17.0, &color),
            )
        }))
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    root.present()
        .map_err(|e| ChartError::Drawing(e.to_string()))?;

    tracing::info!("Wrote {}", output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScenarioKind;

    #[test]
    fn axis_ticks_switch_to_billions() {
        assert_eq!(axis_money(500.0), "$500M");
        assert_eq!(axis_money(3000.0), "$3B");
    }

    #[test]
    fn rejects_empty_scenarios() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenarios.png");
        let result = render_scenario_chart(&[], "t", "s", &path);
        assert!(matches!(result, Err(ChartError::InvalidData(_))));
    }

    #[test]
    #[ignore = "Font rendering not available in test environment"]
    fn renders_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenarios.png");
        let scenarios = vec![
            ValuationScenario {
                label: "Current DCF Valuation".into(),
                kind: ScenarioKind::CurrentDcf,
                multiple: 1.28,
                enterprise_value_millions: 776.0,
                upside_pct: None,
            },
            ValuationScenario {
                label: "At Lidar Companies Multiple".into(),
                kind: ScenarioKind::PeerMultiple,
                multiple: 8.99,
                enterprise_value_millions: 5466.8,
                upside_pct: Some(604.5),
            },
        ];
        render_scenario_chart(&scenarios, "Scenarios", "2030 revenue", &path).unwrap();
        assert!(path.exists());
    }
}
