/*!
 * Note translation pipeline.
 *
 * A run moves through `Validating → LocatingSource → BackingUp → Translating
 * → Applying → Pruning → Done`. Any stage before `Pruning` may end the run
 * in `Failed`; pruning is best effort and only logs. Nothing is written
 * before the backup exists.
 */

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::address::ResourceAddress;
use crate::app_config::Config;
use crate::errors::PipelineError;
use crate::language_utils::language_suffix;
use crate::providers::Provider;
use crate::providers::anthropic::Anthropic;
use crate::translation::batch::BatchTranslator;
use crate::translation::core::{TranslationEngine, TranslationOptions};
use crate::translation::document::Document;
use crate::vault_store::{VaultStore, split_extension, split_relative};

/// How a translation is written back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyMode {
    /// Overwrite the source note
    #[default]
    Replace,
    /// Keep the original and add the translation below it
    Append,
    /// Write a sibling note with a language suffix
    Parallel,
}

impl ApplyMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Append => "append",
            Self::Parallel => "parallel",
        }
    }
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplyMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" => Ok(Self::Replace),
            "append" => Ok(Self::Append),
            "parallel" => Ok(Self::Parallel),
            other => Err(PipelineError::InvalidMode(other.to_string())),
        }
    }
}

/// Stages of a single pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Validating,
    LocatingSource,
    BackingUp,
    Translating,
    Applying,
    Pruning,
    Done,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::LocatingSource => "locating-source",
            Self::BackingUp => "backing-up",
            Self::Translating => "translating",
            Self::Applying => "applying",
            Self::Pruning => "pruning",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Request shape of the `translate_note` tool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    /// Note address
    pub url: String,

    /// Target language; the configured default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,

    /// `replace`, `append` or `parallel`; `replace` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationOutcome {
    /// Source note content before translation
    pub original_content: String,
    /// Content written by the apply step
    pub translated_content: String,
    /// Vault-relative path of the backup
    pub backup_path: String,
    /// Backup time, RFC 3339
    pub timestamp_iso: String,
    /// Vault-relative path that was written
    pub written_path: String,
    /// How the result was applied
    pub mode: ApplyMode,
    /// Language the note was translated into
    pub target_language: String,
    /// Backup of an existing parallel sibling that was overwritten
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sibling_backup_path: Option<String>,
}

impl TranslationOutcome {
    /// Human-readable report of the run
    pub fn summary(&self) -> String {
        let action = match self.mode {
            ApplyMode::Replace => "replaced",
            ApplyMode::Append => "appended to",
            ApplyMode::Parallel => "written to",
        };
        let mut summary = format!(
            "Translated to {}: {} {}\nBackup: {} ({})",
            self.target_language, action, self.written_path, self.backup_path, self.timestamp_iso
        );
        if let Some(sibling_backup) = &self.sibling_backup_path {
            summary.push_str(&format!("\nPrevious {} kept as {}", self.written_path, sibling_backup));
        }
        summary
    }
}

/// Heading inserted between the original and an appended translation
pub fn append_separator(target_language: &str) -> String {
    format!("\n\n---\n\n## Translation ({})\n\n", target_language)
}

/// Sibling path for a parallel translation: `notes/a.md` → `notes/a.fr.md`
pub fn parallel_path(path: &str, target_language: &str) -> String {
    let (dir, file_name) = split_relative(path);
    let (stem, ext) = split_extension(file_name);
    format!("{}{}.{}{}", dir, stem, language_suffix(target_language), ext)
}

/// Drives the translation of notes inside one vault
#[derive(Debug)]
pub struct TranslationPipeline<P: Provider> {
    store: VaultStore,
    engine: TranslationEngine<P>,
    collection: String,
    retention_days: u32,
    batch: BatchTranslator,
    default_target_language: String,
}

impl TranslationPipeline<Anthropic> {
    /// Build a pipeline talking to Anthropic from application config
    pub fn from_config(config: &Config) -> Self {
        let provider = Anthropic::new(
            config.provider.api_key.clone(),
            config.provider.endpoint.clone(),
            config.provider.model.clone(),
            config.provider.timeout_secs,
        );
        Self::with_provider(config, provider)
    }
}

impl<P: Provider> TranslationPipeline<P> {
    /// Create a pipeline with default retention, window and language
    pub fn new(store: VaultStore, engine: TranslationEngine<P>, collection: impl Into<String>) -> Self {
        let defaults = Config::default();
        Self {
            store,
            engine,
            collection: collection.into(),
            retention_days: defaults.backup_retention_days,
            batch: BatchTranslator::new(defaults.batch_concurrency),
            default_target_language: defaults.default_target_language,
        }
    }

    /// Build a pipeline from config around any provider
    pub fn with_provider(config: &Config, provider: P) -> Self {
        let engine = TranslationEngine::new(provider, TranslationOptions::from_config(config));
        Self::new(VaultStore::new(config.vault_path.clone()), engine, config.collection_name())
            .with_retention_days(config.backup_retention_days)
            .with_batch_concurrency(config.batch_concurrency)
            .with_default_target_language(config.default_target_language.clone())
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn with_batch_concurrency(mut self, window: usize) -> Self {
        self.batch = BatchTranslator::new(window);
        self
    }

    pub fn with_default_target_language(mut self, language: impl Into<String>) -> Self {
        self.default_target_language = language.into();
        self
    }

    pub fn store(&self) -> &VaultStore {
        &self.store
    }

    pub fn engine(&self) -> &TranslationEngine<P> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TranslationEngine<P> {
        &mut self.engine
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Address of a vault-relative path in this pipeline's collection
    pub fn address_for(&self, path: &str) -> String {
        ResourceAddress {
            collection: self.collection.clone(),
            path: path.to_string(),
        }
        .to_url()
    }

    /// Serve a `translate_note` tool request
    pub async fn handle(&self, request: &TranslateRequest) -> Result<TranslationOutcome, PipelineError> {
        let mode = match request.mode.as_deref() {
            Some(mode) => mode.parse()?,
            None => ApplyMode::default(),
        };
        let target_language = request
            .target_language
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(&self.default_target_language);
        self.translate_note(&request.url, target_language, mode).await
    }

    /// Translate one note addressed by `url`
    pub async fn translate_note(
        &self,
        url: &str,
        target_language: &str,
        mode: ApplyMode,
    ) -> Result<TranslationOutcome, PipelineError> {
        let start = Instant::now();
        let mut stage = PipelineStage::Validating;

        let result = self.run(url, target_language, mode, &mut stage).await;
        match &result {
            Ok(outcome) => {
                debug!("{}: {} -> {}", url, stage, PipelineStage::Done);
                info!(
                    "Translated {} to {} ({}) in {:?}",
                    outcome.written_path,
                    target_language,
                    mode,
                    start.elapsed()
                );
            }
            Err(e) => debug!("{}: {} -> {} ({})", url, stage, PipelineStage::Failed, e.kind()),
        }
        result
    }

    async fn run(
        &self,
        url: &str,
        target_language: &str,
        mode: ApplyMode,
        stage: &mut PipelineStage,
    ) -> Result<TranslationOutcome, PipelineError> {
        let address = ResourceAddress::parse(url)?;
        address.validate(&self.collection)?;
        let path = address.path.as_str();

        advance(stage, PipelineStage::LocatingSource, path);
        if !self.store.exists(path).await {
            return Err(PipelineError::ResourceNotFound {
                path: path.to_string(),
                source: None,
            });
        }
        let original_content = self.store.read(path).await?;

        advance(stage, PipelineStage::BackingUp, path);
        let backup = self.store.backup(path).await?;

        advance(stage, PipelineStage::Translating, path);
        let document = Document::parse(&original_content);
        let translated = self.engine.translate(&document, target_language).await?;
        let translated_document = translated.compose();

        advance(stage, PipelineStage::Applying, path);
        let (written_path, translated_content) = match mode {
            ApplyMode::Replace => (path.to_string(), translated_document),
            ApplyMode::Append => {
                let combined = format!(
                    "{}{}{}",
                    original_content,
                    append_separator(target_language),
                    translated_document
                );
                (path.to_string(), combined)
            }
            ApplyMode::Parallel => (parallel_path(path, target_language), translated_document),
        };
        let sibling_backup_path = if mode == ApplyMode::Parallel && self.store.exists(&written_path).await {
            let sibling_backup = self.store.backup(&written_path).await?;
            debug!("Backed up existing {} to {}", written_path, sibling_backup.backup_path);
            Some(sibling_backup.backup_path)
        } else {
            None
        };
        self.store.write(&written_path, &translated_content).await?;

        advance(stage, PipelineStage::Pruning, path);
        let (directory, _) = split_relative(path);
        let report = self.store.prune_backups(directory, self.retention_days).await;
        if report.failures > 0 {
            warn!(
                "{} expired backups in '{}' could not be removed",
                report.failures, directory
            );
        }

        Ok(TranslationOutcome {
            original_content,
            translated_content,
            backup_path: backup.backup_path.clone(),
            timestamp_iso: backup.timestamp_iso(),
            written_path,
            mode,
            target_language: target_language.to_string(),
            sibling_backup_path,
        })
    }

    /// Translate several notes, a window at a time, keeping input order
    pub async fn translate_notes(
        &self,
        urls: &[String],
        target_language: &str,
        mode: ApplyMode,
    ) -> Vec<Result<TranslationOutcome, PipelineError>> {
        self.translate_notes_with_progress(urls, target_language, mode, |_, _| {})
            .await
    }

    /// [`Self::translate_notes`] reporting (completed, total) after each window
    pub async fn translate_notes_with_progress(
        &self,
        urls: &[String],
        target_language: &str,
        mode: ApplyMode,
        progress: impl Fn(usize, usize),
    ) -> Vec<Result<TranslationOutcome, PipelineError>> {
        info!(
            "Translating {} notes to {} ({} at a time)",
            urls.len(),
            target_language,
            self.batch.window()
        );
        self.batch
            .run(
                urls,
                |url: &String| {
                    let url = url.clone();
                    async move { self.translate_note(&url, target_language, mode).await }
                },
                progress,
            )
            .await
    }

    /// Every note below `directory` as addresses, in path order
    pub async fn folder_addresses(&self, directory: &str) -> Result<Vec<String>, PipelineError> {
        if !directory.trim_matches('/').is_empty() {
            crate::address::validate_path(directory)?;
        }
        let paths = self.store.search("", directory).await?;
        Ok(paths.iter().map(|path| self.address_for(path)).collect())
    }

    /// Translate every note below `directory`
    pub async fn translate_folder(
        &self,
        directory: &str,
        target_language: &str,
        mode: ApplyMode,
    ) -> Result<Vec<Result<TranslationOutcome, PipelineError>>, PipelineError> {
        let urls = self.folder_addresses(directory).await?;
        Ok(self.translate_notes(&urls, target_language, mode).await)
    }
}

fn advance(stage: &mut PipelineStage, next: PipelineStage, path: &str) {
    debug!("{}: {} -> {}", path, stage, next);
    *stage = next;
}
