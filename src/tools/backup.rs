/// Tools for exporting and importing backups
///
/// This module implements the backup_export and backup_import MCP tools.
/// Documents travel either inline in the call or through a file path.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use crate::backup::{create_backup, restore_backup, RestoreSummary};
use crate::flags::{FlagBackend, FlagStore};
use crate::storage::{KeyValueBackend, StorageError};
use crate::store::DataStore;
use crate::tools::{plural, ToolError};

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    /// Write the document here instead of returning it
    pub path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub path: Option<PathBuf>,
    pub bytes: usize,
    pub message: String,
}

pub async fn export_backup<B: KeyValueBackend, P: FlagBackend>(
    store: &DataStore<B>,
    flags: &FlagStore<P>,
    params: ExportParams,
) -> Result<ExportResponse, ToolError> {
    let document = create_backup(store, flags).await?;
    let bytes = document.len();

    match params.path {
        Some(path) => {
            std::fs::write(&path, &document)
                .map_err(|e| StorageError::Connection(format!("Cannot write {}: {}", path.display(), e)))?;
            Ok(ExportResponse {
                message: format!("💾 Backup written to {} ({} bytes)", path.display(), bytes),
                path: Some(path),
                bytes,
            })
        }
        None => Ok(ExportResponse {
            path: None,
            bytes,
            message: document,
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportParams {
    /// The backup document itself
    pub backup: Option<String>,
    /// Or a file holding it
    pub path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub summary: RestoreSummary,
    pub message: String,
}

pub async fn import_backup<B: KeyValueBackend, P: FlagBackend>(
    store: &DataStore<B>,
    flags: &FlagStore<P>,
    params: ImportParams,
) -> Result<ImportResponse, ToolError> {
    let document = match (params.backup, params.path) {
        (Some(text), None) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .map_err(|e| StorageError::Connection(format!("Cannot read {}: {}", path.display(), e)))?,
        _ => {
            return Err(ToolError::InvalidParams(
                "provide exactly one of `backup` or `path`".to_string(),
            ))
        }
    };

    let summary = restore_backup(store, flags, &document).await?;
    Ok(ImportResponse {
        message: format!(
            "📥 Restored {} day{} of entries and {} flag{}",
            summary.days,
            plural(summary.days),
            summary.flags,
            plural(summary.flags)
        ),
        summary,
    })
}
