//! Steering proxy files.
//!
//! The backend describes each steerable scalar with a proxy file.
//! Proxies are rendered from a single template by replacing every
//! [`PROXY_PLACEHOLDER`] with the scalar's label.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{ConfigError, PROXY_PLACEHOLDER};

/// Replace every placeholder in `template` with `label`.
pub fn render_proxy(template: &str, label: &str) -> String {
    template.replace(PROXY_PLACEHOLDER, label)
}

/// Render `template` for `label` into `output`, creating parent
/// directories as needed.
pub fn write_proxy(template: &Path, output: &Path, label: &str) -> Result<PathBuf, ConfigError> {
    let text = fs::read_to_string(template).map_err(io_error(template))?;
    if let Some(dir) = output.parent() {
        fs::create_dir_all(dir).map_err(io_error(dir))?;
    }
    fs::write(output, render_proxy(&text, label)).map_err(io_error(output))?;
    tracing::debug!(label, path = %output.display(), "steering proxy written");
    Ok(output.to_path_buf())
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ConfigError {
    let path = path.to_path_buf();
    move |source| ConfigError::ProxyTemplate { path, source }
}
