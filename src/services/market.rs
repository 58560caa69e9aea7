use crate::config::MarketSettings;
use crate::models::MarketPoint;

/// Compounds the base-year market size forward, one point per year.
pub fn project_market(settings: &MarketSettings) -> Vec<MarketPoint> {
    (settings.first_year..=settings.last_year)
        .map(|year| MarketPoint {
            year,
            size_billions: settings.base_size_billions
                * (1.0 + settings.cagr).powi(year - settings.first_year),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compounds_from_base_year() {
        let points = project_market(&MarketSettings::default());
        assert_eq!(points.len(), 6);
        assert_eq!(points[0], MarketPoint { year: 2025, size_billions: 3.27 });
        assert!((points[1].size_billions - 4.29351).abs() < 1e-9);
        assert_eq!(points[5].year, 2030);
        assert!((points[5].size_billions - 3.27 * 1.313f64.powi(5)).abs() < 1e-12);
    }

    #[test]
    fn single_year_range() {
        let settings = MarketSettings {
            last_year: 2025,
            ..MarketSettings::default()
        };
        assert_eq!(project_market(&settings).len(), 1);
    }
}
