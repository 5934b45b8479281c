use anyhow::{Context, Result};
use dotenvy::dotenv;
use matsci_rag::{
    ai::{DEFAULT_CHAT_MODEL, DEFAULT_EMBED_MODEL},
    stores::qdrant::DEFAULT_QDRANT_URL,
    types::config::MATERIALS_COLLECTION,
    IngestConfig, PipelineConfig,
};
use ollama_client::{OllamaClient, DEFAULT_BASE_URL};
use secrecy::SecretString;
use std::env;

/// CLI configuration loaded from environment variables
#[derive(Debug)]
pub struct Config {
    pub ollama_url: String,
    pub chat_model: String,
    pub embed_model: String,
    pub qdrant_url: String,
    pub qdrant_api_key: Option<SecretString>,
    pub collection: String,
    pub vector_size: usize,
    pub passthrough_summary: bool,
    pub passthrough_search_query: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let ollama_url = env::var("OLLAMA_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            ollama_url: OllamaClient::parse_base_url(&ollama_url)
                .context("OLLAMA_URL must be host:port or an http(s) URL")?,
            chat_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string()),
            embed_model: env::var("OLLAMA_EMBED_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBED_MODEL.to_string()),
            qdrant_url: env::var("QDRANT_URL").unwrap_or_else(|_| DEFAULT_QDRANT_URL.to_string()),
            qdrant_api_key: env::var("QDRANT_API_KEY")
                .ok()
                .filter(|key| !key.is_empty())
                .map(SecretString::from),
            collection: env::var("MATSCI_COLLECTION")
                .unwrap_or_else(|_| MATERIALS_COLLECTION.to_string()),
            vector_size: env::var("MATSCI_VECTOR_SIZE")
                .unwrap_or_else(|_| "768".to_string())
                .parse()
                .context("MATSCI_VECTOR_SIZE must be a valid number")?,
            passthrough_summary: parse_flag(env::var("MATSCI_PASSTHROUGH_SUMMARY").ok().as_deref()),
            passthrough_search_query: parse_flag(
                env::var("MATSCI_PASSTHROUGH_SEARCH_QUERY").ok().as_deref(),
            ),
        })
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig::new()
            .with_passthrough_summary(self.passthrough_summary)
            .with_passthrough_search_query(self.passthrough_search_query)
    }

    pub fn ingest(&self) -> IngestConfig {
        IngestConfig::new()
            .with_collection(&self.collection)
            .with_vector_size(self.vector_size)
    }
}

/// Read an on/off switch. Unset or unrecognized values are off.
fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag(Some("true")));
        assert!(parse_flag(Some(" YES ")));
        assert!(parse_flag(Some("1")));
        assert!(!parse_flag(Some("0")));
        assert!(!parse_flag(Some("")));
        assert!(!parse_flag(None));
    }
}
