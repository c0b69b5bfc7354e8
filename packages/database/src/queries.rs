//! Database query functions for study metadata.
//!
//! These back the explore page: the study list, and a single study with
//! its themes, scenarios, and metric selector options.

use moosicbox_json_utils::database::ToValue as _;
use study_explorer_database_models::{
    MetricsMetadataRow, ScenarioRow, StudyDetail, StudyRow, ThemeRow, ThemeScenarioRow,
};
use switchy_database::{Database, DatabaseValue};

use crate::DbError;
use crate::metadata::assemble_study_detail;

fn study_from_row(row: &switchy_database::Row) -> StudyRow {
    StudyRow {
        slug: row.to_value("slug").unwrap_or_default(),
        name: row.to_value("name").unwrap_or_default(),
        description: row.to_value("description").unwrap_or(None),
        image_src: row.to_value("image_src").unwrap_or(None),
        scale: row.to_value("scale").unwrap_or(None),
    }
}

/// Lists all studies ordered by name.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_studies(db: &dyn Database) -> Result<Vec<StudyRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT slug, name, description, image_src, scale FROM studies ORDER BY name",
            &[],
        )
        .await?;

    Ok(rows.iter().map(study_from_row).collect())
}

/// Looks up a single study by slug.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_study(db: &dyn Database, slug: &str) -> Result<Option<StudyRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT slug, name, description, image_src, scale FROM studies WHERE slug = $1",
            &[DatabaseValue::String(slug.to_string())],
        )
        .await?;

    Ok(rows.first().map(study_from_row))
}

/// Returns the themes of a study in display order.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_themes(db: &dyn Database, study_slug: &str) -> Result<Vec<ThemeRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT slug, name FROM themes WHERE study_slug = $1 ORDER BY position, slug",
            &[DatabaseValue::String(study_slug.to_string())],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| ThemeRow {
            slug: row.to_value("slug").unwrap_or_default(),
            name: row.to_value("name").unwrap_or_default(),
        })
        .collect())
}

/// Returns every theme/scenario link of a study with the scenario rows.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_theme_scenarios(
    db: &dyn Database,
    study_slug: &str,
) -> Result<Vec<ThemeScenarioRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT ts.theme_slug, s.slug, s.name, s.description, s.methodology
             FROM theme_scenarios ts
             JOIN scenarios s ON s.study_slug = ts.study_slug AND s.slug = ts.scenario_slug
             WHERE ts.study_slug = $1
             ORDER BY ts.theme_slug, s.name",
            &[DatabaseValue::String(study_slug.to_string())],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| ThemeScenarioRow {
            theme_slug: row.to_value("theme_slug").unwrap_or_default(),
            scenario: ScenarioRow {
                slug: row.to_value("slug").unwrap_or_default(),
                name: row.to_value("name").unwrap_or_default(),
                description: row.to_value("description").unwrap_or(None),
                methodology: row.to_value("methodology").unwrap_or(None),
            },
        })
        .collect())
}

/// Returns the metric selector combinations declared for a study.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_metrics_metadata(
    db: &dyn Database,
    study_slug: &str,
) -> Result<Vec<MetricsMetadataRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT theme_slug, scenario_slug, category, usage, source
             FROM metrics_metadata
             WHERE study_slug = $1",
            &[DatabaseValue::String(study_slug.to_string())],
        )
        .await?;

    Ok(rows
        .iter()
        .map(|row| MetricsMetadataRow {
            theme_slug: row.to_value("theme_slug").unwrap_or_default(),
            scenario_slug: row.to_value("scenario_slug").unwrap_or(None),
            category: row.to_value("category").unwrap_or(None),
            usage: row.to_value("usage").unwrap_or(None),
            source: row.to_value("source").unwrap_or(None),
        })
        .collect())
}

/// Loads a study with its themes, scenarios, and selector options.
///
/// Returns `Ok(None)` if no study has the given slug.
///
/// # Errors
///
/// Returns [`DbError`] if any database operation fails.
pub async fn get_study_detail(
    db: &dyn Database,
    slug: &str,
) -> Result<Option<StudyDetail>, DbError> {
    let Some(study) = get_study(db, slug).await? else {
        return Ok(None);
    };

    let themes = get_themes(db, slug).await?;
    let theme_scenarios = get_theme_scenarios(db, slug).await?;
    let metadata = get_metrics_metadata(db, slug).await?;

    log::debug!(
        "Study {slug}: {} themes, {} theme scenarios, {} metadata rows",
        themes.len(),
        theme_scenarios.len(),
        metadata.len()
    );

    Ok(Some(assemble_study_detail(
        study,
        themes,
        theme_scenarios,
        &metadata,
    )))
}
