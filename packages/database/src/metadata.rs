//! Assembles study metadata rows into the shape the explore page uses.

use std::collections::BTreeMap;

use study_explorer_database_models::{
    MetricOptions, MetricsMetadataRow, StudyDetail, StudyRow, ThemeDetail, ThemeRow,
    ThemeScenarioRow,
};

/// Normalizes a metric selector column: trimmed, lowercased, and `None`
/// for empty or `all`, matching how the metric documents are keyed.
#[must_use]
pub fn normalize_selector(value: Option<&str>) -> Option<String> {
    let value = value?.trim().to_lowercase();
    if value.is_empty() || value == "all" {
        None
    } else {
        Some(value)
    }
}

/// Distinct selector values per theme slug.
#[must_use]
pub fn metric_options_by_theme(rows: &[MetricsMetadataRow]) -> BTreeMap<String, MetricOptions> {
    let mut by_theme: BTreeMap<String, MetricOptions> = BTreeMap::new();

    for row in rows {
        let options = by_theme.entry(row.theme_slug.clone()).or_default();
        if let Some(category) = normalize_selector(row.category.as_deref()) {
            options.categories.insert(category);
        }
        if let Some(usage) = normalize_selector(row.usage.as_deref()) {
            options.usages.insert(usage);
        }
        if let Some(source) = normalize_selector(row.source.as_deref()) {
            options.sources.insert(source);
        }
    }

    by_theme
}

/// Joins themes with their scenarios and selector options.
///
/// Themes keep the order given; scenarios keep the order of
/// `theme_scenarios`. Themes without metadata get empty options.
#[must_use]
pub fn assemble_study_detail(
    study: StudyRow,
    themes: Vec<ThemeRow>,
    theme_scenarios: Vec<ThemeScenarioRow>,
    metadata: &[MetricsMetadataRow],
) -> StudyDetail {
    let mut options = metric_options_by_theme(metadata);

    let mut scenarios_by_theme: BTreeMap<String, Vec<_>> = BTreeMap::new();
    for row in theme_scenarios {
        scenarios_by_theme
            .entry(row.theme_slug)
            .or_default()
            .push(row.scenario);
    }

    let themes = themes
        .into_iter()
        .map(|theme| ThemeDetail {
            scenarios: scenarios_by_theme.remove(&theme.slug).unwrap_or_default(),
            options: options.remove(&theme.slug).unwrap_or_default(),
            theme,
        })
        .collect();

    StudyDetail { study, themes }
}
