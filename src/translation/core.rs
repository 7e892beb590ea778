/*!
 * Core translation engine.
 *
 * This module contains the TranslationEngine, which translates the body of a
 * note through a generation provider while keeping code untouched and
 * records what it did in the note's front matter.
 */

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use log::{debug, warn};
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::{PipelineError, ProviderError};
use crate::providers::{GenerationRequest, Provider};

use super::document::{Document, MetaValue};
use super::guard::ContentGuard;
use super::prompts::TranslationPromptBuilder;

/// Front-matter key holding the translation record
pub const TRANSLATED_KEY: &str = "translated";

/// Options for customizing the translation process
#[derive(Debug, Clone)]
pub struct TranslationOptions {
    /// Model identifier sent with every request
    pub model: String,

    /// Output token bound per request
    pub max_tokens: u32,

    /// Deadline for one generation call; `None` waits indefinitely
    pub timeout: Option<Duration>,

    /// Fail instead of warn when a code placeholder is lost
    pub strict_placeholders: bool,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 4096,
            timeout: Some(Duration::from_secs(120)),
            strict_placeholders: false,
        }
    }
}

impl TranslationOptions {
    /// Options derived from application config
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.provider.model.clone(),
            max_tokens: config.provider.max_tokens,
            timeout: (config.provider.timeout_secs > 0).then(|| Duration::from_secs(config.provider.timeout_secs)),
            strict_placeholders: config.strict_placeholders,
        }
    }
}

/// Translates note documents through a provider
#[derive(Debug)]
pub struct TranslationEngine<P: Provider> {
    /// Provider implementation
    provider: P,

    /// Translation options
    pub options: TranslationOptions,
}

impl<P: Provider> TranslationEngine<P> {
    /// Create a new engine around a provider
    pub fn new(provider: P, options: TranslationOptions) -> Self {
        Self { provider, options }
    }

    /// The wrapped provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Translate a document's body into `target_language`.
    ///
    /// Blank bodies come back unchanged without a provider call. Otherwise code
    /// is guarded, the body is sent with the preservation rules, code is
    /// restored and a `translated` record replaces any earlier one. A front-matter
    /// block that is not a mapping is kept verbatim and gets no record.
    pub async fn translate(&self, document: &Document, target_language: &str) -> Result<Document, PipelineError> {
        if document.body.trim().is_empty() {
            debug!("Body is empty, skipping translation");
            return Ok(document.clone());
        }

        let guarded = ContentGuard::protect(&document.body);
        debug!(
            "Translating {} chars into {} ({} protected spans)",
            document.body.len(),
            target_language,
            guarded.spans.len()
        );

        let prompt = TranslationPromptBuilder::new(target_language).build(&guarded);
        let request = GenerationRequest::new(self.options.model.clone(), self.options.max_tokens).add_message("user", prompt);

        let start = Instant::now();
        let response = self.complete_with_deadline(request).await?;
        debug!("Provider answered in {:?}", start.elapsed());

        let translated_guarded = match response.first_text() {
            Some(text) => TranslationPromptBuilder::strip_wrapper(text).to_string(),
            None => {
                warn!("Provider response had no text segment, keeping the original body");
                guarded.text.clone()
            }
        };

        let restored = ContentGuard::restore(&translated_guarded, &guarded.spans);
        if !restored.is_complete() {
            let lost = restored.missing.len();
            if self.options.strict_placeholders {
                return Err(PipelineError::TranslationFailed(ProviderError::ParseError(format!(
                    "translation dropped {} of {} protected code spans",
                    lost,
                    guarded.spans.len()
                ))));
            }
            warn!(
                "Translation dropped {} of {} protected code spans; their placeholders are missing from the output",
                lost,
                guarded.spans.len()
            );
        }

        let mut translated = document.with_body(restored.text);
        if translated.front_matter.is_opaque() {
            warn!("Front matter is not a YAML mapping, leaving it untouched without a translation record");
        } else {
            translated
                .front_matter
                .insert(TRANSLATED_KEY, self.translation_record(target_language));
        }
        Ok(translated)
    }

    async fn complete_with_deadline(
        &self,
        request: GenerationRequest,
    ) -> Result<crate::providers::GenerationResponse, PipelineError> {
        let call = self.provider.complete(request);
        let result = match self.options.timeout {
            Some(deadline) => tokio::time::timeout(deadline, call)
                .await
                .unwrap_or_else(|_| Err(ProviderError::Timeout(deadline.as_secs()))),
            None => call.await,
        };
        result.map_err(PipelineError::TranslationFailed)
    }

    fn translation_record(&self, target_language: &str) -> MetaValue {
        let mut record = IndexMap::new();
        record.insert(
            "date".to_string(),
            MetaValue::Text(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        record.insert("targetLanguage".to_string(), MetaValue::from(target_language));
        record.insert("model".to_string(), MetaValue::from(self.options.model.as_str()));
        MetaValue::Map(record)
    }
}
