//! Configuration file editor command.
//!
//! Opens the mictest configuration file in the user's preferred editor,
//! writing a default file first if none exists.

use crate::config::{config_path, MicTestConfig};
use std::process::Command;

/// Opens the configuration file in `$EDITOR`, nano, or vi.
///
/// # Errors
/// - If the default config cannot be written
/// - If no editor can be found or it exits with an error
pub fn handle_config() -> anyhow::Result<()> {
    let config_path = config_path()?;

    if !config_path.exists() {
        MicTestConfig::default().save_to(&config_path)?;
        tracing::info!("Wrote default config to {}", config_path.display());
    }

    tracing::info!("Opening config file: {}", config_path.display());

    let editor = find_editor()?;
    tracing::debug!("Using editor: {}", editor);

    let status = Command::new(&editor)
        .arg(&config_path)
        .status()
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to open editor '{editor}': {e}. Make sure the editor is installed and accessible."
            )
        })?;

    if !status.success() {
        return Err(anyhow::anyhow!(
            "Editor exited with error code: {}",
            status.code().unwrap_or(-1)
        ));
    }

    MicTestConfig::load_from(&config_path)?;
    tracing::info!("Config file edited successfully");
    Ok(())
}

fn find_editor() -> anyhow::Result<String> {
    if let Ok(editor) = std::env::var("EDITOR") {
        if !editor.is_empty() {
            return Ok(editor);
        }
    }

    ["nano", "vi"]
        .into_iter()
        .find(|editor| is_editor_available(editor))
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("No editor found. Please set the $EDITOR environment variable."))
}

fn is_editor_available(editor: &str) -> bool {
    Command::new("which")
        .arg(editor)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
