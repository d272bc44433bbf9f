use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::LookupError;

/// Capability interface over the external natural-language retrieval service.
///
/// Implementations receive a non-empty, trimmed title and return the raw,
/// untrusted response payload; the controller passes it through schema
/// validation before anything is trusted. A well-formed `found: false`
/// payload is a definitive miss, while any `Err` is a transient failure. The
/// service is invoked at most once per submitted search and never retried.
#[async_trait]
pub trait LookupService: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<Value, LookupError>;
}

/// Natural-language instruction sent to the retrieval service for one title.
pub fn lookup_prompt(movie_name: &str) -> String {
    format!(
        r#"Find the Rotten Tomatoes scores and information for the movie "{movie_name}".

I need:
- The exact movie title
- Release year
- Tomatometer score (critics score as a percentage)
- Audience score (as a percentage)
- Critics consensus (the summary review from critics)
- A brief plot synopsis (2-3 sentences)
- Director name
- Main cast (top 3-4 actors)
- Genre
- Runtime
- Whether it's "Fresh", "Certified Fresh", or "Rotten" based on the Tomatometer

If you can't find the exact movie, find the closest match. If no movie exists with this name, set "found" to false."#
    )
}

/// Structural schema the response must conform to. Only `found` is mandatory;
/// everything else is best-effort and validated leniently on receipt.
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "found": { "type": "boolean" },
            "title": { "type": "string" },
            "year": { "type": "string" },
            "tomatometer": { "type": "number" },
            "audienceScore": { "type": "number" },
            "freshStatus": { "type": "string" },
            "criticsConsensus": { "type": "string" },
            "synopsis": { "type": "string" },
            "director": { "type": "string" },
            "cast": { "type": "array", "items": { "type": "string" } },
            "genre": { "type": "string" },
            "runtime": { "type": "string" },
            "posterDescription": { "type": "string" }
        },
        "required": ["found"]
    })
}
