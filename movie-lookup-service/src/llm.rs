use async_trait::async_trait;
use movie_lookup::{LookupError, LookupService, lookup_prompt, response_schema};
use rig::{
    agent::Agent,
    client::CompletionClient,
    completion::Chat,
    providers::openrouter,
};
use serde_json::Value;
use tracing::debug;

const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

const PREAMBLE: &str = r#"You are a movie review-score retrieval service.
Answer every request with a single raw JSON object conforming to the schema the request supplies.
Do not add prose, markdown, or code fences around the JSON."#;

/// [`LookupService`] implementation over an OpenRouter completion model.
pub struct OpenRouterLookup {
    agent: Agent<openrouter::CompletionModel>,
}

impl OpenRouterLookup {
    /// Reads `OPENROUTER_API_KEY`; the model name comes from `LOOKUP_MODEL`
    /// when set.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENROUTER_API_KEY not set"))?;
        let model = std::env::var("LOOKUP_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let client = openrouter::Client::new(&api_key);
        let agent = client.agent(&model).preamble(PREAMBLE).build();
        Ok(Self { agent })
    }
}

#[async_trait]
impl LookupService for OpenRouterLookup {
    async fn resolve(&self, query: &str) -> Result<Value, LookupError> {
        let prompt = format!(
            "{}\n\nRespond with JSON matching this schema:\n{}",
            lookup_prompt(query),
            response_schema()
        );

        let response = self
            .agent
            .chat(&prompt, vec![])
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        debug!(chars = response.len(), "lookup model responded");
        extract_json(&response).ok_or_else(|| {
            LookupError::Malformed(format!(
                "model response was not a JSON object: {}",
                response.chars().take(120).collect::<String>()
            ))
        })
    }
}

/// Pull the JSON object out of a model response, tolerating markdown fences
/// around an otherwise-conforming payload.
fn extract_json(response: &str) -> Option<Value> {
    let trimmed = response.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))?
        .strip_suffix("```")?
        .trim();
    serde_json::from_str(unfenced).ok()
}
