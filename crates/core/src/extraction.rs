//! Free-text symptom extraction.
//!
//! When a patient describes their complaint in words, an LLM maps the text onto catalog symptom
//! ids. The extractor is an external collaborator and is allowed to fail: the lifecycle bounds
//! every call with a timeout and treats any error as "nothing extracted".

use crate::config::ExtractorConfig;
use crate::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use triage_catalog::Symptom;
use triage_types::SymptomId;

pub type ExtractionFuture<'a> =
    Pin<Box<dyn Future<Output = TriageResult<Vec<SymptomId>>> + Send + 'a>>;

pub trait SymptomExtractor: Send + Sync {
    /// Returns the ids of the catalog `symptoms` mentioned in `text`.
    fn extract_symptom_ids<'a>(
        &'a self,
        text: &'a str,
        symptoms: &'a [Symptom],
    ) -> ExtractionFuture<'a>;
}

/// Extraction switched off; always returns no symptoms.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledExtractor;

impl SymptomExtractor for DisabledExtractor {
    fn extract_symptom_ids<'a>(
        &'a self,
        _text: &'a str,
        _symptoms: &'a [Symptom],
    ) -> ExtractionFuture<'a> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

const SYSTEM_PROMPT: &str = "You map a patient's complaint onto a fixed list of symptoms. \
Reply with a JSON array containing only the ids of listed symptoms that the complaint mentions, \
for example [\"<id>\", \"<id>\"]. Reply [] if none apply. Do not add any other text.";

/// Ollama HTTP client (`POST {base_url}/api/generate`).
#[derive(Clone, Debug)]
pub struct OllamaExtractor {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaExtractor {
    pub fn new(cfg: &ExtractorConfig) -> TriageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| TriageError::Upstream(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            client,
        })
    }

    async fn generate(&self, prompt: &str) -> TriageResult<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system: SYSTEM_PROMPT,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    TriageError::Upstream(format!("cannot reach extractor at {}", self.base_url))
                } else if e.is_timeout() {
                    TriageError::Upstream("extractor request timed out".into())
                } else {
                    TriageError::Upstream(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TriageError::Upstream(format!(
                "extractor returned HTTP {}",
                status.as_u16()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| TriageError::Upstream(format!("unreadable extractor reply: {e}")))?;
        Ok(parsed.response)
    }
}

impl SymptomExtractor for OllamaExtractor {
    fn extract_symptom_ids<'a>(
        &'a self,
        text: &'a str,
        symptoms: &'a [Symptom],
    ) -> ExtractionFuture<'a> {
        Box::pin(async move {
            let prompt = build_prompt(text, symptoms);
            let reply = self.generate(&prompt).await?;
            parse_symptom_ids(&reply)
        })
    }
}

fn build_prompt(text: &str, symptoms: &[Symptom]) -> String {
    let mut prompt = String::from("Symptoms:\n");
    for symptom in symptoms {
        prompt.push_str(&format!("- {}: {}\n", symptom.id, symptom.name));
    }
    prompt.push_str("\nComplaint:\n");
    prompt.push_str(text.trim());
    prompt
}

/// Pulls the first JSON array of strings out of a model reply.
///
/// Models often wrap the array in prose or code fences, so everything outside the outermost
/// brackets is ignored. Entries that are not canonical ids are dropped.
fn parse_symptom_ids(reply: &str) -> TriageResult<Vec<SymptomId>> {
    let (Some(start), Some(end)) = (reply.find('['), reply.rfind(']')) else {
        return Err(TriageError::Upstream("extractor reply has no JSON array".into()));
    };
    if end < start {
        return Err(TriageError::Upstream("extractor reply has no JSON array".into()));
    }

    let items: Vec<serde_json::Value> = serde_json::from_str(&reply[start..=end])
        .map_err(|e| TriageError::Upstream(format!("extractor reply is not JSON: {e}")))?;

    Ok(items
        .iter()
        .filter_map(|v| v.as_str())
        .filter_map(|s| SymptomId::parse(s.trim()).ok())
        .collect())
}
