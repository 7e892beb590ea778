use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};

use crate::app_config::Config;
use crate::errors::PipelineError;
use crate::pipeline::{ApplyMode, TranslationOutcome, TranslationPipeline};
use crate::providers::Provider;
use crate::providers::anthropic::Anthropic;

// @module: Application controller for note translation

/// Counts of a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Main application controller driving the pipeline for the CLI
pub struct Controller<P: Provider> {
    // @field: Translation pipeline
    pipeline: TranslationPipeline<P>,

    // @field: Target language used when none is given
    default_target_language: String,
}

impl Controller<Anthropic> {
    // @method: Create a controller talking to the configured provider
    pub fn with_config(config: &Config) -> Self {
        Self {
            pipeline: TranslationPipeline::from_config(config),
            default_target_language: config.default_target_language.clone(),
        }
    }
}

impl<P: Provider> Controller<P> {
    /// Create a controller around an existing pipeline
    pub fn with_pipeline(pipeline: TranslationPipeline<P>, default_target_language: impl Into<String>) -> Self {
        Self {
            pipeline,
            default_target_language: default_target_language.into(),
        }
    }

    pub fn pipeline(&self) -> &TranslationPipeline<P> {
        &self.pipeline
    }

    fn language<'a>(&'a self, target_language: Option<&'a str>) -> &'a str {
        target_language
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(&self.default_target_language)
    }

    /// Translate one note and print its summary
    pub async fn translate(
        &self,
        url: &str,
        target_language: Option<&str>,
        mode: ApplyMode,
    ) -> Result<TranslationOutcome, PipelineError> {
        let outcome = self
            .pipeline
            .translate_note(url, self.language(target_language), mode)
            .await?;
        println!("{}", outcome.summary());
        Ok(outcome)
    }

    /// Translate several notes with a progress bar
    pub async fn translate_batch(
        &self,
        urls: &[String],
        target_language: Option<&str>,
        mode: ApplyMode,
    ) -> BatchSummary {
        let target_language = self.language(target_language);
        let progress_bar = Self::progress_bar(urls.len() as u64);
        progress_bar.set_message(format!("Translating to {}", target_language));

        let results = self
            .pipeline
            .translate_notes_with_progress(urls, target_language, mode, |done, _| {
                progress_bar.set_position(done as u64)
            })
            .await;
        progress_bar.finish_and_clear();

        Self::report(urls, &results)
    }

    /// Translate every note below a vault directory
    pub async fn translate_folder(
        &self,
        directory: &str,
        target_language: Option<&str>,
        mode: ApplyMode,
    ) -> Result<BatchSummary> {
        let urls = self.pipeline.folder_addresses(directory).await?;
        if urls.is_empty() {
            warn!("No notes found under '{}'", directory);
            return Ok(BatchSummary::default());
        }
        info!("Found {} notes under '{}'", urls.len(), directory);
        Ok(self.translate_batch(&urls, target_language, mode).await)
    }

    /// Remove expired backups from a vault directory
    pub async fn prune(&self, directory: &str, retention_days: u32) -> Result<usize> {
        if !directory.trim_matches('/').is_empty() {
            crate::address::validate_path(directory)?;
        }
        let report = self.pipeline.store().prune_backups(directory, retention_days).await;
        for path in &report.removed {
            println!("Removed {}", path);
        }
        if report.failures > 0 {
            return Err(anyhow!("{} backups could not be removed", report.failures));
        }
        info!("Pruned {} backups older than {} days", report.removed.len(), retention_days);
        Ok(report.removed.len())
    }

    /// Print notes containing `term`
    pub async fn search(&self, term: &str, directory: &str) -> Result<Vec<String>> {
        if !directory.trim_matches('/').is_empty() {
            crate::address::validate_path(directory)?;
        }
        let matches = self.pipeline.store().search(term, directory).await?;
        for path in &matches {
            println!("{}", path);
        }
        info!("{} notes match '{}'", matches.len(), term);
        Ok(matches)
    }

    /// Send a minimal request to the provider and report the result
    pub async fn check(&self) -> Result<()> {
        self.pipeline
            .engine()
            .provider()
            .test_connection()
            .await
            .context("Provider connection check failed")?;
        println!("Provider connection OK");
        Ok(())
    }

    fn progress_bar(total: u64) -> ProgressBar {
        let progress_bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} notes ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }

    fn report(urls: &[String], results: &[Result<TranslationOutcome, PipelineError>]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for (url, result) in urls.iter().zip(results) {
            match result {
                Ok(outcome) => {
                    summary.succeeded += 1;
                    println!("{}", outcome.summary());
                }
                Err(e) => {
                    summary.failed += 1;
                    error!("{}: {}", url, e);
                }
            }
        }
        info!("Batch finished: {} succeeded, {} failed", summary.succeeded, summary.failed);
        summary
    }
}
