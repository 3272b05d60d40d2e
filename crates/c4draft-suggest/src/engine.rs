use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::ChatMessage;

use c4draft_core::AiSettings;

use crate::ServiceError;

/// Upper bound on tokens for one completion.
const MAX_TOKENS: u32 = 2000;

fn map_backend(provider: &str) -> Result<LLMBackend, ServiceError> {
    match provider {
        "openai" => Ok(LLMBackend::OpenAI),
        "anthropic" => Ok(LLMBackend::Anthropic),
        "google" => Ok(LLMBackend::Google),
        "ollama" => Ok(LLMBackend::Ollama),
        "groq" => Ok(LLMBackend::Groq),
        "mistral" => Ok(LLMBackend::Mistral),
        "deepseek" => Ok(LLMBackend::DeepSeek),
        other => Err(ServiceError::failed(format!("unknown provider: {other}"))),
    }
}

/// Send one system + user exchange and return the model's text.
pub async fn generate(
    settings: &AiSettings,
    system: &str,
    user_msg: &str,
) -> Result<String, ServiceError> {
    let backend = map_backend(&settings.provider)?;

    let mut builder = LLMBuilder::new()
        .backend(backend)
        .model(&settings.model)
        .max_tokens(MAX_TOKENS)
        .system(system);

    if !settings.api_key.is_empty() {
        builder = builder.api_key(&settings.api_key);
    }

    let llm = builder
        .build()
        .map_err(|e| ServiceError::failed(format!("build LLM: {e}")))?;

    let messages = vec![ChatMessage::user().content(user_msg).build()];

    let response = llm
        .chat(&messages)
        .await
        .map_err(|e| ServiceError::failed(format!("chat: {e}")))?;

    match response.text() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(ServiceError::failed("LLM returned empty text")),
        None => Err(ServiceError::failed("LLM returned no text")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_providers_map_to_backends() {
        for provider in ["openai", "anthropic", "google", "ollama", "groq", "mistral", "deepseek"] {
            assert!(map_backend(provider).is_ok(), "{provider}");
        }
    }

    #[test]
    fn unknown_provider_is_a_failure() {
        match map_backend("bedrock") {
            Err(err) => assert_eq!(err.to_string(), "unknown provider: bedrock"),
            Ok(_) => panic!("bedrock is not a supported provider"),
        }
    }
}
