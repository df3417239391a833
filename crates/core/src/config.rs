//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services, so
//! request handling never reads process-wide environment variables.

use crate::constants::{
    CONSULTATIONS_DIR_NAME, DEFAULT_DIAGNOSIS_TOP_K, DEFAULT_EXTRACTOR_MODEL,
    DEFAULT_EXTRACTOR_TIMEOUT_SECS, DEFAULT_PENDING_TOP_K,
};
use crate::{TriageError, TriageResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for the LLM-backed symptom extractor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Base URL of the Ollama-compatible service, e.g. `http://localhost:11434`.
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    catalog_path: PathBuf,
    data_dir: Option<PathBuf>,
    diagnosis_top_k: usize,
    pending_top_k: usize,
    extractor: Option<ExtractorConfig>,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with default ranking limits and extraction disabled.
    pub fn new(catalog_path: PathBuf, data_dir: Option<PathBuf>) -> Self {
        Self {
            catalog_path,
            data_dir,
            diagnosis_top_k: DEFAULT_DIAGNOSIS_TOP_K,
            pending_top_k: DEFAULT_PENDING_TOP_K,
            extractor: None,
        }
    }

    /// Override the number of candidates returned by the diagnosis and pending views.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Validation`] if either limit is zero.
    pub fn with_top_k(mut self, diagnosis: usize, pending: usize) -> TriageResult<Self> {
        if diagnosis == 0 || pending == 0 {
            return Err(TriageError::Validation(
                "top-k limits must be at least 1".into(),
            ));
        }
        self.diagnosis_top_k = diagnosis;
        self.pending_top_k = pending;
        Ok(self)
    }

    pub fn with_extractor(mut self, extractor: ExtractorConfig) -> TriageResult<Self> {
        if extractor.base_url.trim().is_empty() {
            return Err(TriageError::Validation(
                "extractor base URL cannot be empty".into(),
            ));
        }
        if extractor.timeout.is_zero() {
            return Err(TriageError::Validation(
                "extractor timeout must be at least one second".into(),
            ));
        }
        self.extractor = Some(extractor);
        Ok(self)
    }

    /// Resolve configuration from `TRIAGE_*` environment values.
    ///
    /// Takes a lookup function instead of reading `std::env` directly so tests can supply values
    /// without touching process state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> TriageResult<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let catalog_path = get("TRIAGE_CATALOG_PATH")
            .map(PathBuf::from)
            .ok_or_else(|| TriageError::Validation("TRIAGE_CATALOG_PATH must be set".into()))?;
        let data_dir = get("TRIAGE_DATA_DIR").map(PathBuf::from);

        let diagnosis_top_k = parse_number(get("TRIAGE_DIAGNOSIS_TOP_K"), DEFAULT_DIAGNOSIS_TOP_K)?;
        let pending_top_k = parse_number(get("TRIAGE_PENDING_TOP_K"), DEFAULT_PENDING_TOP_K)?;

        let mut cfg =
            Self::new(catalog_path, data_dir).with_top_k(diagnosis_top_k, pending_top_k)?;

        if let Some(base_url) = get("TRIAGE_EXTRACTOR_URL") {
            let timeout_secs = parse_number(
                get("TRIAGE_EXTRACTOR_TIMEOUT_SECS"),
                DEFAULT_EXTRACTOR_TIMEOUT_SECS,
            )?;
            cfg = cfg.with_extractor(ExtractorConfig {
                base_url,
                model: get("TRIAGE_EXTRACTOR_MODEL")
                    .unwrap_or_else(|| DEFAULT_EXTRACTOR_MODEL.into()),
                timeout: Duration::from_secs(timeout_secs),
            })?;
        }

        Ok(cfg)
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    /// Data directory for file-backed storage; `None` means records live in memory only.
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn consultations_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(CONSULTATIONS_DIR_NAME))
    }

    pub fn diagnosis_top_k(&self) -> usize {
        self.diagnosis_top_k
    }

    pub fn pending_top_k(&self) -> usize {
        self.pending_top_k
    }

    pub fn extractor(&self) -> Option<&ExtractorConfig> {
        self.extractor.as_ref()
    }
}

fn parse_number<T: std::str::FromStr>(value: Option<String>, default: T) -> TriageResult<T> {
    match value {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| TriageError::Validation(format!("expected a number, got '{v}'"))),
    }
}
