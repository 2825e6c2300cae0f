//! Adaptor configuration and script resolution.
//!
//! [`AdaptorConfig`] is captured once, before the first cycle, from the
//! process environment ([`from_env`](AdaptorConfig::from_env)), from an
//! explicit variable list ([`from_vars`](AdaptorConfig::from_vars)) or
//! from JSON ([`from_json`](AdaptorConfig::from_json)). The orchestrator
//! never reads the environment itself.
//!
//! Script and proxy paths given by a variable are used only if they
//! name an existing file; otherwise the default under
//! [`script_dir`](AdaptorConfig::script_dir) is used.

use std::collections::BTreeMap;
use std::error::Error;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use situ_marshal::ChannelKind;

/// Pipeline script override.
pub const ENV_PIPELINE_PATH: &str = "SITU_PIPELINE_PATH";
/// Prefix of per-label extractor script overrides.
pub const ENV_EXTRACTOR_SCRIPT_PREFIX: &str = "SITU_EXTRACTOR_SCRIPT_";
/// Prefix of per-label steering proxy overrides.
pub const ENV_PROXY_PATH_PREFIX: &str = "SITU_PROXY_PATH_";
/// Visualization switch.
pub const ENV_VIS: &str = "SITU_VIS";
/// Steering switch.
pub const ENV_STEER: &str = "SITU_STEER";
/// VTK extract switch, forwarded to the pipeline script.
pub const ENV_VTK_EXTRACT: &str = "SITU_VTK_EXTRACT";
/// PNG extract switch; enables per-entry extractor scripts.
pub const ENV_PNG_EXTRACT: &str = "SITU_PNG_EXTRACT";
/// Ghost mask switch.
pub const ENV_GHOST_MASKS: &str = "SITU_GHOST_MASKS";
/// Ghost mask cache policy (`cycle` or `persistent`).
pub const ENV_MASK_CACHE: &str = "SITU_MASK_CACHE";
/// Verbosity forwarded to scripts.
pub const ENV_VERBOSITY: &str = "SITU_VERBOSITY";
/// Experiment name forwarded to extractor scripts.
pub const ENV_EXPERIMENT_NAME: &str = "SITU_EXPERIMENT_NAME";
/// Directory holding default scripts and the proxy template.
pub const ENV_SCRIPT_DIR: &str = "SITU_SCRIPT_DIR";

/// Placeholder in the proxy template replaced by the steered label.
pub const PROXY_PLACEHOLDER: &str = "EXAMPLE";

// ── MaskCachePolicy ────────────────────────────────────────────────

/// When the ghost mask cache is emptied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskCachePolicy {
    /// Cleared with the buffer registry at the end of every cycle.
    #[default]
    PerCycle,
    /// Kept across cycles; geometry keys are structural, so a changed
    /// layout simply misses.
    Persistent,
}

impl MaskCachePolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cycle" | "per_cycle" | "per-cycle" => Some(Self::PerCycle),
            "persistent" => Some(Self::Persistent),
            _ => None,
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while building an [`AdaptorConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// An on/off variable holds something other than a switch value.
    InvalidSwitch {
        /// Variable name.
        var: String,
        /// Offending value.
        value: String,
    },
    /// The verbosity is not a non-negative integer.
    InvalidVerbosity {
        /// Offending value.
        value: String,
    },
    /// The mask cache policy is not `cycle` or `persistent`.
    InvalidPolicy {
        /// Offending value.
        value: String,
    },
    /// A JSON configuration could not be parsed.
    InvalidJson(serde_json::Error),
    /// The steering proxy template could not be read or rendered.
    ProxyTemplate {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSwitch { var, value } => {
                write!(f, "{var}: expected ON or OFF, got '{value}'")
            }
            Self::InvalidVerbosity { value } => {
                write!(f, "{ENV_VERBOSITY}: expected a non-negative integer, got '{value}'")
            }
            Self::InvalidPolicy { value } => {
                write!(f, "{ENV_MASK_CACHE}: expected 'cycle' or 'persistent', got '{value}'")
            }
            Self::InvalidJson(e) => write!(f, "invalid JSON configuration: {e}"),
            Self::ProxyTemplate { path, source } => {
                write!(f, "proxy file {}: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidJson(e) => Some(e),
            Self::ProxyTemplate { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn parse_switch(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_uppercase().as_str() {
        "ON" | "1" | "TRUE" | "YES" => Ok(true),
        "OFF" | "0" | "FALSE" | "NO" => Ok(false),
        _ => Err(ConfigError::InvalidSwitch {
            var: var.to_owned(),
            value: value.to_owned(),
        }),
    }
}

fn switch_arg(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

// ── AdaptorConfig ──────────────────────────────────────────────────

/// Everything the orchestrator needs to know about its environment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptorConfig {
    /// Directory with the default pipeline and extractor scripts and the
    /// proxy template. Default: `situ_scripts`.
    pub script_dir: PathBuf,
    /// Pipeline script override.
    pub pipeline_script: Option<PathBuf>,
    /// Per-label extractor script overrides.
    pub extractor_scripts: BTreeMap<String, PathBuf>,
    /// Per-label steering proxy overrides.
    pub proxy_paths: BTreeMap<String, PathBuf>,
    /// Marshal visualization entries each cycle. Default: on.
    pub vis: bool,
    /// Push and pull steering scalars each cycle. Default: off.
    pub steer: bool,
    /// Ask the pipeline to write VTK extracts. Default: off.
    pub vtk_extract: bool,
    /// Register a PNG extractor script per entry. Default: off.
    pub png_extract: bool,
    /// Export field halos with a ghost mask instead of stripping them.
    /// Default: off.
    pub ghost_masks: bool,
    /// When the ghost mask cache is emptied.
    pub mask_cache: MaskCachePolicy,
    /// Verbosity forwarded to every script.
    pub verbosity: u32,
    /// Experiment name forwarded to extractor scripts.
    pub experiment_name: Option<String>,
}

impl Default for AdaptorConfig {
    fn default() -> Self {
        Self {
            script_dir: PathBuf::from(Self::DEFAULT_SCRIPT_DIR),
            pipeline_script: None,
            extractor_scripts: BTreeMap::new(),
            proxy_paths: BTreeMap::new(),
            vis: true,
            steer: false,
            vtk_extract: false,
            png_extract: false,
            ghost_masks: false,
            mask_cache: MaskCachePolicy::default(),
            verbosity: 0,
            experiment_name: None,
        }
    }
}

impl AdaptorConfig {
    /// Default script directory.
    pub const DEFAULT_SCRIPT_DIR: &'static str = "situ_scripts";
    /// Default pipeline script name inside the script directory.
    pub const DEFAULT_PIPELINE: &'static str = "pipeline_default.py";
    /// Subdirectory of default extractor scripts.
    pub const EXTRACTOR_DIR: &'static str = "extractors";
    /// Subdirectory rendered proxies are written to.
    pub const PROXY_DIR: &'static str = "proxies";
    /// Proxy template name inside the script directory.
    pub const PROXY_TEMPLATE: &'static str = "proxy_default_EXAMPLE.xml";

    /// Configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the configuration from the process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_os_vars(std::env::vars_os())
    }

    /// Build the configuration from raw OS `(name, value)` pairs.
    ///
    /// Non-UTF-8 pairs are skipped; a skipped `SITU_` variable is logged.
    pub fn from_os_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        Self::from_vars(vars.into_iter().filter_map(|(k, v)| {
            match (k.into_string(), v.into_string()) {
                (Ok(k), Ok(v)) => Some((k, v)),
                (Ok(k), Err(_)) if k.starts_with("SITU_") => {
                    tracing::warn!(var = %k, "ignoring non-UTF-8 value");
                    None
                }
                (Err(k), _) if k.to_string_lossy().starts_with("SITU_") => {
                    tracing::warn!(var = %k.to_string_lossy(), "ignoring non-UTF-8 name");
                    None
                }
                _ => None,
            }
        }))
    }

    /// Build the configuration from `(name, value)` pairs.
    ///
    /// Unknown variables are ignored. Later duplicates win.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut cfg = Self::default();
        for (k, v) in vars {
            let (k, v) = (k.as_ref(), v.as_ref());
            match k {
                ENV_PIPELINE_PATH => cfg.pipeline_script = Some(PathBuf::from(v)),
                ENV_VIS => cfg.vis = parse_switch(k, v)?,
                ENV_STEER => cfg.steer = parse_switch(k, v)?,
                ENV_VTK_EXTRACT => cfg.vtk_extract = parse_switch(k, v)?,
                ENV_PNG_EXTRACT => cfg.png_extract = parse_switch(k, v)?,
                ENV_GHOST_MASKS => cfg.ghost_masks = parse_switch(k, v)?,
                ENV_MASK_CACHE => {
                    cfg.mask_cache =
                        MaskCachePolicy::parse(v).ok_or_else(|| ConfigError::InvalidPolicy {
                            value: v.to_owned(),
                        })?;
                }
                ENV_VERBOSITY => {
                    cfg.verbosity =
                        v.trim()
                            .parse()
                            .map_err(|_| ConfigError::InvalidVerbosity {
                                value: v.to_owned(),
                            })?;
                }
                ENV_EXPERIMENT_NAME => cfg.experiment_name = Some(v.to_owned()),
                ENV_SCRIPT_DIR => cfg.script_dir = PathBuf::from(v),
                _ => {
                    if let Some(label) = k.strip_prefix(ENV_EXTRACTOR_SCRIPT_PREFIX) {
                        cfg.extractor_scripts
                            .insert(label.to_owned(), PathBuf::from(v));
                    } else if let Some(label) = k.strip_prefix(ENV_PROXY_PATH_PREFIX) {
                        cfg.proxy_paths.insert(label.to_owned(), PathBuf::from(v));
                    }
                }
            }
        }
        Ok(cfg)
    }

    /// Parse a JSON configuration. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::InvalidJson)
    }

    /// Resolved pipeline script.
    pub fn pipeline_script(&self) -> PathBuf {
        resolve_script(
            ENV_PIPELINE_PATH,
            self.pipeline_script.as_deref(),
            self.script_dir.join(Self::DEFAULT_PIPELINE),
        )
    }

    /// Resolved extractor script for an entry published as `kind`.
    pub fn extractor_script(&self, label: &str, kind: ChannelKind) -> PathBuf {
        let default = match kind {
            ChannelKind::VectorField => "png_ext_vfield.py",
            ChannelKind::Particles => "png_ext_particle.py",
            _ => "png_ext_sfield.py",
        };
        resolve_script(
            &format!("{ENV_EXTRACTOR_SCRIPT_PREFIX}{label}"),
            self.extractor_scripts.get(label).map(PathBuf::as_path),
            self.script_dir.join(Self::EXTRACTOR_DIR).join(default),
        )
    }

    /// Resolved steering proxy registered for `label`.
    pub fn proxy_path(&self, label: &str) -> PathBuf {
        resolve_script(
            &format!("{ENV_PROXY_PATH_PREFIX}{label}"),
            self.proxy_paths.get(label).map(PathBuf::as_path),
            self.rendered_proxy_path(label),
        )
    }

    /// Proxy template path.
    pub fn proxy_template(&self) -> PathBuf {
        self.script_dir.join(Self::PROXY_TEMPLATE)
    }

    /// Where the proxy for `label` is rendered.
    pub fn rendered_proxy_path(&self, label: &str) -> PathBuf {
        self.script_dir
            .join(Self::PROXY_DIR)
            .join(format!("proxy_{label}.xml"))
    }

    /// `ON`/`OFF` for the VTK extract switch, as scripts expect it.
    pub fn vtk_extract_arg(&self) -> &'static str {
        switch_arg(self.vtk_extract)
    }

    /// `ON`/`OFF` for the steering switch, as scripts expect it.
    pub fn steer_arg(&self) -> &'static str {
        switch_arg(self.steer)
    }
}

/// `over` if it names an existing path, `default` otherwise.
fn resolve_script(var: &str, over: Option<&Path>, default: PathBuf) -> PathBuf {
    match over {
        Some(path) if path.exists() => {
            tracing::info!(var, path = %path.display(), "using script from environment");
            path.to_path_buf()
        }
        Some(path) => {
            tracing::info!(
                var,
                missing = %path.display(),
                default = %default.display(),
                "override does not exist, using default"
            );
            default
        }
        None => {
            tracing::debug!(var, default = %default.display(), "no override, using default");
            default
        }
    }
}
