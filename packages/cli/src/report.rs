//! Human-readable rendering of search results.

use std::fmt::Write as _;

use study_explorer_search_models::{AggregateSummary, SearchRequest};
use study_explorer_server_models::format_large_number;

/// Renders `summary` as a short report, one feature per line.
pub fn format_summary(request: &SearchRequest, summary: Option<&AggregateSummary>) -> String {
    let mut out = format!(
        "{} / {} / {}\n",
        request.study_slug, request.scenario, request.path
    );

    let Some(summary) = summary else {
        out.push_str("No matching features.\n");
        return out;
    };

    let units = summary.units.as_deref().unwrap_or("");
    if let Some(description) = &summary.description {
        let _ = writeln!(out, "{description}");
    }
    let _ = writeln!(out, "Features: {}", summary.features.len());
    let _ = writeln!(out, "Total:    {} {units}", format_large_number(summary.total, 2));
    let _ = writeln!(out, "Average:  {} {units}", format_large_number(summary.average, 2));
    let _ = writeln!(out, "Max:      {} {units}", format_large_number(summary.max, 2));

    for feature in &summary.features {
        let value = feature
            .shading
            .map_or_else(|| "-".to_string(), |v| format_large_number(v, 2));
        let share = feature
            .relative_percentage(summary.max)
            .map_or_else(String::new, |pct| format!(" ({pct:.0}%)"));
        let _ = writeln!(out, "  {}: {value}{share}", feature.id);
    }

    out
}

#[cfg(test)]
mod tests {
    use study_explorer_search::parse_request;
    use study_explorer_search_models::FeatureShading;

    use super::*;

    #[test]
    fn renders_summary() {
        let request = parse_request("solarcity", "baseline", "energy..", None).unwrap();
        let summary = AggregateSummary {
            total: 2500.0,
            average: 1250.0,
            max: 2000.0,
            units: Some("kWh".to_string()),
            description: Some("Annual energy use".to_string()),
            features: vec![
                FeatureShading {
                    id: "1".to_string(),
                    shading: Some(500.0),
                },
                FeatureShading {
                    id: "2".to_string(),
                    shading: Some(2000.0),
                },
                FeatureShading {
                    id: "3".to_string(),
                    shading: None,
                },
            ],
        };

        let text = format_summary(&request, Some(&summary));

        assert!(text.starts_with("solarcity / baseline / energy..\n"));
        assert!(text.contains("Total:    2.50K kWh"));
        assert!(text.contains("  1: 500 (25%)"));
        assert!(text.contains("  2: 2.00K (100%)"));
        assert!(text.contains("  3: -\n"));
    }

    #[test]
    fn renders_empty_result() {
        let request = parse_request("solarcity", "retrofit", "energy..", None).unwrap();
        assert!(format_summary(&request, None).ends_with("No matching features.\n"));
    }
}
