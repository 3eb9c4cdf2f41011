//! CLI route: single route table and run context. Dispatches to library services.

use crate::cli::parse::Commands;
use crate::combine::{cleanup, CombineRequest, ScopedCombine};
use crate::config::NodeConfig;
use crate::error::{ApiError, StorageError};
use crate::patch::{create_patch, PatchMetadata};
use crate::sandbox::WorkArea;
use crate::tree::walker::{Entry, Walker, WalkerConfig};
use crate::tree::{path as tree_path, Digest};
use crate::types::Signature;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Runtime context for CLI execution: workspace and effective configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: NodeConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = NodeConfig::load_for(&workspace_root, config_path.as_deref())?;
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let result = self.execute_inner(command);
        info!(
            command = command.name(),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis(),
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Digest { path } => {
                let digest = Digest::compute(path)?;
                Ok(digest.to_hex())
            }
            Commands::Inspect { patch, format } => self.handle_inspect(patch, format),
            Commands::Diff {
                before,
                after,
                out,
                previous_signature,
            } => self.handle_diff(before, after, out, *previous_signature),
            Commands::Combine {
                before,
                patch,
                signature,
                output,
            } => self.handle_combine(before, patch, *signature, output),
            Commands::Config => toml::to_string_pretty(&self.config)
                .map_err(|e| ApiError::ConfigError(format!("Failed to render config: {}", e))),
        }
    }

    fn handle_inspect(&self, patch: &Path, format: &str) -> Result<String, ApiError> {
        let metadata = PatchMetadata::read(patch)?;
        let files: Vec<String> = Walker::new(patch.to_path_buf())
            .files()?
            .into_iter()
            .map(|entry| entry.key().to_string())
            .collect();

        match format {
            "json" => {
                let value = json!({
                    "metadata": metadata,
                    "files": files,
                });
                serde_json::to_string_pretty(&value)
                    .map_err(|e| ApiError::InvalidArgument(format!("Failed to render: {}", e)))
            }
            "text" => Ok(format_inspect_text(&metadata, &files)),
            other => Err(ApiError::InvalidArgument(format!(
                "Unknown format: {} (must be 'text' or 'json')",
                other
            ))),
        }
    }

    fn handle_diff(
        &self,
        before: &Path,
        after: &Path,
        out: &Path,
        previous_signature: Signature,
    ) -> Result<String, ApiError> {
        let summary = create_patch(before, after, out, previous_signature)?;
        if summary.is_empty() {
            return Ok(format!("Trees are identical; empty patch written to {}", out.display()));
        }
        Ok(format!(
            "Patch written to {}: {} changed, {} removed (previous hash {})",
            out.display(),
            summary.changed.len(),
            summary.removed.len(),
            summary.previous_hash
        ))
    }

    /// Inputs are copied into the work area first so the combine releases only its own
    /// copies; the user's trees are never deleted.
    fn handle_combine(
        &self,
        before: &Path,
        patch: &Path,
        signature: Signature,
        output: &Path,
    ) -> Result<String, ApiError> {
        if output.exists() {
            return Err(ApiError::InvalidArgument(format!(
                "output {} already exists",
                output.display()
            )));
        }

        let work_area = WorkArea::from_config(&self.config.storage)?;
        let staged_before = stage_tree(&work_area, before, "base-", false)?;
        let staged_patch = match stage_tree(&work_area, patch, "patch-", true) {
            Ok(staged) => staged,
            Err(e) => {
                cleanup::release_path(&work_area, &staged_before);
                return Err(e);
            }
        };

        let request = CombineRequest::new(staged_before, staged_patch, signature);
        let merged = ScopedCombine::from_request(request, &work_area).run()?;

        let relocated = relocate_tree(&merged, output);
        cleanup::release_path(&work_area, &merged);
        relocated?;

        let digest = Digest::compute(output)?;
        Ok(format!("Combined tree written to {} (digest {})", output.display(), digest))
    }
}

fn format_inspect_text(metadata: &PatchMetadata, files: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&format!("version: {}\n", metadata.version));
    out.push_str(&format!(
        "previous signature: {}\n",
        metadata
            .previous_signature()
            .map(|s| s.to_hex())
            .unwrap_or_else(|| "<none>".to_string())
    ));
    out.push_str(&format!(
        "previous hash: {}\n",
        metadata
            .previous_hash()
            .map(|h| h.to_hex())
            .unwrap_or_else(|| "<none>".to_string())
    ));
    if let Some(created_at) = metadata.created_at {
        out.push_str(&format!("created at: {}\n", created_at.to_rfc3339()));
    }
    out.push_str(&format!("files ({}):\n", files.len()));
    for key in files {
        out.push_str(&format!("  + {}\n", key));
    }
    out.push_str(&format!("removed ({}):", metadata.removed().len()));
    for key in metadata.removed() {
        out.push_str(&format!("\n  - {}", key));
    }
    out
}

/// Copy `source` into a fresh directory of the work area
fn stage_tree(
    work_area: &WorkArea,
    source: &Path,
    prefix: &str,
    with_sidecar: bool,
) -> Result<PathBuf, ApiError> {
    let staged = work_area.allocate_dir(prefix)?;
    if let Err(e) = copy_tree(source, &staged, with_sidecar) {
        cleanup::release_path(work_area, &staged);
        return Err(e.into());
    }
    debug!(source = %source.display(), staged = %staged.display(), "Staged tree");
    Ok(staged)
}

fn copy_tree(source: &Path, dest: &Path, with_sidecar: bool) -> Result<(), StorageError> {
    let config = WalkerConfig {
        excluded_roots: if with_sidecar {
            Vec::new()
        } else {
            vec![tree_path::SIDECAR_DIR.to_string()]
        },
        ..WalkerConfig::default()
    };
    for entry in Walker::with_config(source.to_path_buf(), config).walk()? {
        match entry {
            Entry::File { key, path, .. } => {
                let target = tree_path::key_to_path(dest, &key);
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(&path, &target)?;
            }
            Entry::Symlink { key, .. } => {
                return Err(StorageError::InvalidPath(format!(
                    "refusing to stage symlink {:?} from {}",
                    key,
                    source.display()
                )));
            }
        }
    }
    Ok(())
}

/// Move the merged tree to `output`, copying when a rename is not possible
fn relocate_tree(merged: &Path, output: &Path) -> Result<(), StorageError> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(merged, output) {
        Ok(()) => Ok(()),
        Err(e) => {
            debug!(error = %e, "Rename failed, copying merged tree");
            fs::create_dir_all(output)?;
            copy_tree(merged, output, false)
        }
    }
}
