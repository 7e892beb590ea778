/*!
 * Sandboxed note storage.
 *
 * Every path handed to the store is relative to one configured root and is
 * joined onto it before any filesystem call. The store is the only part of
 * the crate that touches the disk: reads, atomic writes, timestamped backups,
 * backup pruning and content search.
 */

use chrono::{TimeZone, Utc};
use futures::stream::{self, Stream, StreamExt};
use log::{debug, warn};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::errors::PipelineError;

/// Marker that identifies backup files by name
pub const BACKUP_MARKER: &str = ".backup-";

/// Extension of the documents the store enumerates
pub const NOTE_EXTENSION: &str = "md";

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Metadata of one backup copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// Vault-relative path of the source
    pub original_path: String,
    /// Vault-relative path of the copy
    pub backup_path: String,
    /// Unix milliseconds embedded in the backup name
    pub timestamp_millis: i64,
    /// Size of the copy in bytes
    pub size_bytes: u64,
}

impl BackupRecord {
    /// Backup time as an RFC 3339 string
    pub fn timestamp_iso(&self) -> String {
        Utc.timestamp_millis_opt(self.timestamp_millis)
            .single()
            .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            .unwrap_or_default()
    }
}

/// What a prune pass did. Failures are logged, never returned as errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Vault-relative paths of deleted backups
    pub removed: Vec<String>,
    /// Entries that could not be inspected or deleted
    pub failures: usize,
}

/// File store rooted at the vault directory
#[derive(Debug, Clone)]
pub struct VaultStore {
    root: PathBuf,
}

impl VaultStore {
    /// Create a store over `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The sandbox root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a relative path onto the root.
    ///
    /// Only plain name components are accepted, so the result can never
    /// leave the root even if a caller skipped address validation.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, PipelineError> {
        let normalized = path.replace('\\', "/");
        let mut resolved = self.root.clone();
        for component in Path::new(&normalized).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(PipelineError::UnsafePath {
                        path: path.to_string(),
                        reason: "path escapes the vault root",
                    });
                }
            }
        }
        Ok(resolved)
    }

    /// Whether a file exists at `path`; any error counts as absent
    pub async fn exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(abs) => fs::metadata(&abs).await.map(|m| m.is_file()).unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Read a note as UTF-8 text
    pub async fn read(&self, path: &str) -> Result<String, PipelineError> {
        let abs = self.resolve(path)?;
        fs::read_to_string(&abs)
            .await
            .map_err(|e| PipelineError::ResourceNotFound {
                path: path.to_string(),
                source: Some(e),
            })
    }

    /// Replace the content of `path`, creating parent directories as needed.
    ///
    /// Content goes to a hidden sibling first and is renamed over the target.
    /// A read-only target is refused; otherwise its permissions carry over.
    pub async fn write(&self, path: &str, content: &str) -> Result<(), PipelineError> {
        let abs = self.resolve(path)?;
        let denied = |source| PipelineError::WriteDenied {
            path: path.to_string(),
            source,
        };

        let permissions = match fs::metadata(&abs).await {
            Ok(metadata) if metadata.permissions().readonly() => {
                return Err(denied(std::io::Error::new(
                    IoErrorKind::PermissionDenied,
                    "target is read-only",
                )));
            }
            Ok(metadata) => Some(metadata.permissions()),
            Err(_) => None,
        };

        let parent = abs.parent().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&parent).await.map_err(denied)?;

        let file_name = abs.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        let temp = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

        if let Err(e) = fs::write(&temp, content).await {
            let _ = fs::remove_file(&temp).await;
            return Err(denied(e));
        }
        if let Some(permissions) = permissions {
            if let Err(e) = fs::set_permissions(&temp, permissions).await {
                let _ = fs::remove_file(&temp).await;
                return Err(denied(e));
            }
        }
        if let Err(e) = fs::rename(&temp, &abs).await {
            let _ = fs::remove_file(&temp).await;
            return Err(denied(e));
        }

        debug!("Wrote {} ({} bytes)", path, content.len());
        Ok(())
    }

    /// Copy `path` to `<base>.backup-<unixMillis><ext>` next to it.
    ///
    /// The source is only read. An existing backup is never overwritten; the
    /// timestamp is bumped until the name is free.
    pub async fn backup(&self, path: &str) -> Result<BackupRecord, PipelineError> {
        let failed = |source| PipelineError::BackupFailed {
            path: path.to_string(),
            source,
        };

        let abs = self.resolve(path)?;
        let content = fs::read(&abs).await.map_err(failed)?;

        let (directory, file_name) = split_relative(path);
        let mut timestamp_millis = Utc::now().timestamp_millis();
        loop {
            let backup_path = format!("{}{}", directory, backup_file_name(file_name, timestamp_millis));
            let backup_abs = self.resolve(&backup_path)?;

            let opened = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&backup_abs)
                .await;
            let mut file = match opened {
                Ok(file) => file,
                Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                    timestamp_millis += 1;
                    continue;
                }
                Err(e) => return Err(failed(e)),
            };

            let written = async {
                file.write_all(&content).await?;
                file.flush().await
            }
            .await;
            if let Err(e) = written {
                drop(file);
                let _ = fs::remove_file(&backup_abs).await;
                return Err(failed(e));
            }

            debug!("Backed up {} to {}", path, backup_path);
            return Ok(BackupRecord {
                original_path: path.to_string(),
                backup_path,
                timestamp_millis,
                size_bytes: content.len() as u64,
            });
        }
    }

    /// Backups of `path` that currently exist, oldest first
    pub async fn backups_of(&self, path: &str) -> Vec<String> {
        let (directory, file_name) = split_relative(path);
        let (stem, ext) = split_extension(file_name);
        let prefix = format!("{}{}", stem, BACKUP_MARKER);

        let Ok(dir_abs) = self.resolve(directory) else {
            return Vec::new();
        };
        let Ok(mut entries) = fs::read_dir(&dir_abs).await else {
            return Vec::new();
        };

        let mut found = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            let stamp = name.strip_prefix(&prefix).and_then(|rest| rest.strip_suffix(ext));
            if let Some(millis) = stamp.and_then(|s| s.parse::<i64>().ok()) {
                found.push((millis, format!("{}{}", directory, name)));
            }
        }
        found.sort();
        found.into_iter().map(|(_, path)| path).collect()
    }

    /// Delete backups in `directory` older than `retention_days`.
    ///
    /// Best effort: every failure is logged and counted, none is returned.
    pub async fn prune_backups(&self, directory: &str, retention_days: u32) -> PruneReport {
        let mut report = PruneReport::default();
        let retention = Duration::from_secs(u64::from(retention_days) * SECONDS_PER_DAY);

        let dir_abs = match self.resolve(directory) {
            Ok(abs) => abs,
            Err(e) => {
                warn!("Skipping backup pruning: {}", e);
                report.failures += 1;
                return report;
            }
        };
        let mut entries = match fs::read_dir(&dir_abs).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not list {:?} for backup pruning: {}", dir_abs, e);
                report.failures += 1;
                return report;
            }
        };

        let prefix = if directory.is_empty() || directory.ends_with('/') {
            directory.to_string()
        } else {
            format!("{}/", directory)
        };
        let now = SystemTime::now();

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Error while listing {:?}: {}", dir_abs, e);
                    report.failures += 1;
                    break;
                }
            };

            let name = entry.file_name().to_string_lossy().to_string();
            if !name.contains(BACKUP_MARKER) {
                continue;
            }

            let modified = match entry.metadata().await.and_then(|m| {
                if m.is_file() { m.modified().map(Some) } else { Ok(None) }
            }) {
                Ok(Some(modified)) => modified,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Could not read metadata of backup {}: {}", name, e);
                    report.failures += 1;
                    continue;
                }
            };

            let age = now.duration_since(modified).unwrap_or_default();
            if age <= retention {
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => {
                    debug!("Pruned expired backup {}{}", prefix, name);
                    report.removed.push(format!("{}{}", prefix, name));
                }
                Err(e) => {
                    warn!("Could not delete expired backup {}: {}", name, e);
                    report.failures += 1;
                }
            }
        }

        report
    }

    /// Lazily yield every note under `directory` whose content contains
    /// `term`, case-insensitively. An empty term matches every note.
    ///
    /// Hidden directories, backups and non-Markdown files are skipped.
    pub fn search_stream(&self, term: &str, directory: &str) -> Result<impl Stream<Item = String> + use<>, PipelineError> {
        let needle = term.to_lowercase();
        let candidates = self.note_files(directory)?;

        Ok(stream::iter(candidates).filter_map(move |(relative, absolute)| {
            let needle = needle.clone();
            async move {
                if needle.is_empty() {
                    return Some(relative);
                }
                match fs::read_to_string(&absolute).await {
                    Ok(content) if content.to_lowercase().contains(&needle) => Some(relative),
                    Ok(_) => None,
                    Err(e) => {
                        debug!("Skipping unreadable note {}: {}", relative, e);
                        None
                    }
                }
            }
        }))
    }

    /// Collect [`VaultStore::search_stream`]
    pub async fn search(&self, term: &str, directory: &str) -> Result<Vec<String>, PipelineError> {
        Ok(self.search_stream(term, directory)?.collect().await)
    }

    /// Markdown files under `directory` as (vault-relative, absolute) pairs
    fn note_files(&self, directory: &str) -> Result<Vec<(String, PathBuf)>, PipelineError> {
        let start = self.resolve(directory)?;

        let files = WalkDir::new(&start)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.'))
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy();
                !name.contains(BACKUP_MARKER)
                    && entry
                        .path()
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case(NOTE_EXTENSION))
            })
            .filter_map(|entry| {
                let relative = self.relative_path(entry.path())?;
                Some((relative, entry.into_path()))
            })
            .collect();

        Ok(files)
    }

    /// Forward-slash path of `abs` relative to the root
    fn relative_path(&self, abs: &Path) -> Option<String> {
        let relative = abs.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        Some(parts.join("/"))
    }
}

/// Split a vault-relative path into (`dir/` or empty, file name)
pub fn split_relative(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => (&path[..=i], &path[i + 1..]),
        None => ("", path),
    }
}

/// Split a file name into stem and extension (with its dot, or empty)
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(i) if i > 0 => (&file_name[..i], &file_name[i..]),
        _ => (file_name, ""),
    }
}

/// `<base>.backup-<millis><ext>`
pub fn backup_file_name(file_name: &str, timestamp_millis: i64) -> String {
    let (stem, ext) = split_extension(file_name);
    format!("{}{}{}{}", stem, BACKUP_MARKER, timestamp_millis, ext)
}
