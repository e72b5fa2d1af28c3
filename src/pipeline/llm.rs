//! Vision-model calls with retry, backoff and a per-call timeout.
//!
//! Both the layout pass and figure captioning go through
//! [`complete_with_retry`]. Prompts live in [`crate::prompts`]; this module
//! only knows how to send a message list and survive transient failures.
//!
//! ## Retry Strategy
//!
//! Rate-limit and gateway errors are frequent and short-lived. Attempt `n`
//! waits `retry_backoff_ms * 2^(n-1)` before it starts, so with the 500 ms
//! default and 3 retries the waits are 500 ms, 1 s, 2 s. A call that
//! exceeds `api_timeout_secs` counts as a failed attempt.

use crate::config::ExtractionConfig;
use crate::error::Pdf2TablesError;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

const DEFAULT_VISION_MODEL: &str = "gpt-4.1-nano";

/// Vision provider that is only resolved on first use.
///
/// A `Fast` run over a document without large figures never touches the
/// network, so it must not fail for lack of an API key.
pub struct LazyProvider<'a> {
    config: &'a ExtractionConfig,
    cell: OnceCell<Arc<dyn LLMProvider>>,
}

impl<'a> LazyProvider<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    /// Resolve the provider on first call; later calls reuse it.
    pub async fn get(&self) -> Result<&Arc<dyn LLMProvider>, Pdf2TablesError> {
        self.cell
            .get_or_try_init(|| resolve_provider(self.config))
            .await
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.initialized()
    }
}

/// Text and token usage of a successful call.
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub retries: u32,
}

/// Delay before retry `attempt` (1-based): `base`, doubled each time.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Send `messages` and return the first successful reply.
///
/// `what` names the request in logs and errors ("page 3 layout",
/// "caption of figure-1-2.png").
pub async fn complete_with_retry(
    provider: &Arc<dyn LLMProvider>,
    messages: &[ChatMessage],
    what: &str,
    config: &ExtractionConfig,
) -> Result<LlmReply, Pdf2TablesError> {
    let start = Instant::now();
    let options = build_options(config);
    let limit = Duration::from_secs(config.api_timeout_secs);

    let mut last_err: Option<Pdf2TablesError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = backoff_ms(config.retry_backoff_ms, attempt);
            warn!(
                "{}: retry {}/{} after {}ms",
                what, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(limit, provider.chat(messages, Some(&options))).await {
            Ok(Ok(response)) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    what,
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                return Ok(LlmReply {
                    content: response.content,
                    prompt_tokens: response.prompt_tokens,
                    completion_tokens: response.completion_tokens,
                    retries: attempt,
                });
            }
            Ok(Err(e)) => {
                warn!("{}: attempt {} failed: {}", what, attempt + 1, e);
                last_err = Some(Pdf2TablesError::LlmApiError {
                    message: format!("{what}: {e}"),
                });
            }
            Err(_) => {
                warn!(
                    "{}: attempt {} timed out after {}s",
                    what,
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_err = Some(Pdf2TablesError::ApiTimeout {
                    what: what.to_string(),
                    secs: config.api_timeout_secs,
                });
            }
        }
    }

    Err(last_err.unwrap_or_else(|| Pdf2TablesError::LlmApiError {
        message: format!("{what}: no attempt was made"),
    }))
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Pdf2TablesError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Pdf2TablesError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the vision provider, from most-specific to least-specific:
///
/// 1. `config.provider`, used as-is;
/// 2. `config.provider_name` with `config.model` (default `gpt-4.1-nano`);
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` when both are set;
/// 4. OpenAI when `OPENAI_API_KEY` is set;
/// 5. whatever [`ProviderFactory::from_env`] detects.
pub async fn resolve_provider(
    config: &ExtractionConfig,
) -> Result<Arc<dyn LLMProvider>, Pdf2TablesError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_VISION_MODEL);

    if let Some(ref name) = config.provider_name {
        info!("Using vision provider {} ({})", name, model);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            info!("Using vision provider {} ({}) from environment", prov, env_model);
            return create_vision_provider(&prov, &env_model);
        }
    }

    // With several keys present, OpenAI wins unless another provider is named.
    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        info!("Using vision provider openai ({})", model);
        return create_vision_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Pdf2TablesError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

/// Build `CompletionOptions` from the extraction config.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
