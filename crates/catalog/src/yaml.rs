//! YAML wire format for catalog files.
//!
//! ```yaml
//! recommendations:
//!   - id: 0000000000000000000000000000000b
//!     text: Drink plenty of fluids
//! symptoms:
//!   - id: 00000000000000000000000000000001
//!     name: Fever
//!     recommendations: [0000000000000000000000000000000b]
//! diseases:
//!   - id: 00000000000000000000000000000064
//!     name: Influenza
//!     symptoms: [00000000000000000000000000000001]
//! ```
//!
//! The wire structs are strict (`deny_unknown_fields`) and carry ids as plain strings, so that a
//! bad id can be reported with the record it belongs to rather than as an opaque serde error.

use crate::{Catalog, CatalogError, CatalogResult, Disease, Recommendation, Symptom};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use triage_types::NonEmptyText;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogWire {
    #[serde(default)]
    recommendations: Vec<RecommendationWire>,
    #[serde(default)]
    symptoms: Vec<SymptomWire>,
    #[serde(default)]
    diseases: Vec<DiseaseWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecommendationWire {
    id: String,
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SymptomWire {
    id: String,
    name: String,
    #[serde(default)]
    recommendations: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DiseaseWire {
    id: String,
    name: String,
    #[serde(default)]
    symptoms: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
}

impl Catalog {
    /// Parses and validates a catalog from YAML text.
    ///
    /// Schema mismatches are reported with the path of the offending field
    /// (for example `diseases[2].symptoms`).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Translation`] for schema mismatches, [`CatalogError::InvalidInput`]
    /// for malformed ids or blank names, and the referential errors of [`Catalog::new`].
    pub fn from_yaml(yaml_text: &str) -> CatalogResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        let wire = match serde_path_to_error::deserialize::<_, CatalogWire>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(CatalogError::Translation(format!(
                    "catalog schema mismatch at {path}: {source}"
                )));
            }
        };

        wire_to_domain(wire)
    }

    /// Reads and validates a catalog file.
    pub fn load(path: &Path) -> CatalogResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let catalog = Self::from_yaml(&text)?;
        tracing::info!(
            path = %path.display(),
            symptoms = catalog.symptom_count(),
            diseases = catalog.disease_count(),
            recommendations = catalog.recommendation_count(),
            "catalog loaded"
        );
        Ok(catalog)
    }
}

fn wire_to_domain(wire: CatalogWire) -> CatalogResult<Catalog> {
    let recommendations = wire
        .recommendations
        .into_iter()
        .map(|r| {
            Ok(Recommendation {
                id: parse_id(&r.id, "recommendation")?,
                text: parse_text(&r.text, &format!("recommendation {}", r.id))?,
            })
        })
        .collect::<CatalogResult<Vec<_>>>()?;

    let symptoms = wire
        .symptoms
        .into_iter()
        .map(|s| {
            Ok(Symptom {
                id: parse_id(&s.id, "symptom")?,
                name: parse_text(&s.name, &format!("symptom {}", s.id))?,
                recommendation_ids: parse_ids(&s.recommendations, "recommendation")?,
            })
        })
        .collect::<CatalogResult<Vec<_>>>()?;

    let diseases = wire
        .diseases
        .into_iter()
        .map(|d| {
            Ok(Disease {
                id: parse_id(&d.id, "disease")?,
                name: parse_text(&d.name, &format!("disease {}", d.id))?,
                symptom_ids: parse_ids(&d.symptoms, "symptom")?.into_iter().collect(),
                recommendation_ids: parse_ids(&d.recommendations, "recommendation")?,
            })
        })
        .collect::<CatalogResult<Vec<_>>>()?;

    Catalog::new(symptoms, diseases, recommendations)
}

fn parse_id<T>(raw: &str, kind: &str) -> CatalogResult<T>
where
    T: FromStr<Err = triage_types::TypesError>,
{
    raw.parse()
        .map_err(|e| CatalogError::InvalidInput(format!("{kind}: {e}")))
}

fn parse_ids<T>(raw: &[String], kind: &str) -> CatalogResult<Vec<T>>
where
    T: FromStr<Err = triage_types::TypesError>,
{
    raw.iter().map(|r| parse_id(r, kind)).collect()
}

fn parse_text(raw: &str, owner: &str) -> CatalogResult<NonEmptyText> {
    NonEmptyText::new(raw).map_err(|e| CatalogError::InvalidInput(format!("{owner}: {e}")))
}
