//! Constants used throughout the triage core crate.

/// Directory name for consultation records under the data directory.
pub const CONSULTATIONS_DIR_NAME: &str = "consultations";

/// Filename of a stored consultation record.
pub const CONSULTATION_JSON_FILENAME: &str = "consultation.json";

/// Candidates returned for a single consultation's diagnosis.
pub const DEFAULT_DIAGNOSIS_TOP_K: usize = 15;

/// Candidates shown per consultation in the doctor's pending queue.
pub const DEFAULT_PENDING_TOP_K: usize = 10;

/// Upper bound on a single symptom-extraction call.
pub const DEFAULT_EXTRACTOR_TIMEOUT_SECS: u64 = 10;

/// Model requested from the extraction service when none is configured.
pub const DEFAULT_EXTRACTOR_MODEL: &str = "llama3.1:8b";
