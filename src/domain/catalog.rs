//! Series catalogs: which series a report processes and how they are labelled.
//!
//! Catalogs are plain JSON so the pipeline stays agnostic to the series it
//! runs over. The two built-in catalogs live in `catalogs/` and are embedded
//! at compile time; `--catalog <file>` swaps in a different one.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{ReportKind, SeriesId};
use crate::error::AppError;

const UNEMPLOYMENT_JSON: &str = include_str!("../../catalogs/unemployment.json");
const DEMOGRAPHIC_JSON: &str = include_str!("../../catalogs/demographic.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: SeriesId,
    pub label: String,
    /// Panel group tag (e.g. `race`, `gender`, `age`).
    #[serde(default)]
    pub group: Option<String>,
}

/// One chart panel. An empty `groups` list means "every series".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelSpec {
    pub title: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Chart title; the window length is appended (`: 10-Year Trends`).
    pub title: String,
    #[serde(default = "default_y_label")]
    pub y_label: String,
    pub entries: Vec<CatalogEntry>,
    /// Panel layout. Empty means a single combined chart.
    #[serde(default)]
    pub panels: Vec<PanelSpec>,
}

fn default_y_label() -> String {
    "Value".to_string()
}

impl Catalog {
    pub fn builtin(kind: ReportKind) -> Result<Self, AppError> {
        let raw = match kind {
            ReportKind::Unemployment => UNEMPLOYMENT_JSON,
            ReportKind::Demographic => DEMOGRAPHIC_JSON,
        };
        let catalog: Catalog = serde_json::from_str(raw)
            .map_err(|e| AppError::config(format!("Built-in {kind:?} catalog is invalid: {e}")))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path)
            .map_err(|e| AppError::config(format!("Failed to open catalog '{}': {e}", path.display())))?;
        let catalog: Catalog = serde_json::from_reader(file)
            .map_err(|e| AppError::config(format!("Invalid catalog '{}': {e}", path.display())))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Series ids shown in `panel`, in catalog order.
    pub fn panel_members(&self, panel: &PanelSpec) -> Vec<&SeriesId> {
        self.entries
            .iter()
            .filter(|e| {
                panel.groups.is_empty()
                    || e.group.as_ref().is_some_and(|g| panel.groups.contains(g))
            })
            .map(|e| &e.id)
            .collect()
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.entries.is_empty() {
            return Err(AppError::config("Catalog has no entries."));
        }
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.id.as_str().trim().is_empty() {
                return Err(AppError::config(format!("Catalog entry {i} has an empty id.")));
            }
            if self.entries[..i].iter().any(|e| e.id == entry.id) {
                return Err(AppError::config(format!("Duplicate catalog id '{}'.", entry.id)));
            }
        }
        Ok(())
    }
}
