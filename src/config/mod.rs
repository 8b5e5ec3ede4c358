//! Configuration system using Figment.
//!
//! Two documents configure this crate:
//!
//! 1. [`WorkflowConfig`]: per-run workflow description (YAML), see [`workflow`].
//! 2. [`PathSettings`]: root directories for output, input data and model files,
//!    loaded from a TOML file and overridden by environment variables.
//!
//! # Environment Variable Overrides
//!
//! Environment variables with the `SIMTOOLS_` prefix override path settings:
//!
//! ```text
//! SIMTOOLS_OUTPUT_PATH=/scratch/simtools
//! SIMTOOLS_DATA_PATH=/data/simtools
//! SIMTOOLS_USE_PLAIN_OUTPUT_PATH=true
//! ```

pub mod workflow;

pub use workflow::{
    ActivityConfig, DataModelConfig, PipelineConfig, ProductConfig, WorkflowConfig,
    DEFAULT_PRODUCT_FORMAT,
};

use crate::error::SimtoolsResult;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root directories used by the path resolver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Parent of all output trees (`{output_path}/output/...`).
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    /// Parent of input data files.
    #[serde(default)]
    pub data_path: Option<PathBuf>,
    /// Parent of model files.
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    /// Write to `{output_path}/output` without label or type sub-directories.
    #[serde(default)]
    pub use_plain_output_path: bool,
}

impl PathSettings {
    /// Load path settings from environment variables only.
    pub fn load() -> SimtoolsResult<Self> {
        Self::figment(None).extract().map_err(Into::into)
    }

    /// Load path settings from a TOML file, then apply `SIMTOOLS_` overrides.
    ///
    /// A missing file contributes nothing; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> SimtoolsResult<Self> {
        let settings: Self = Self::figment(Some(path.as_ref())).extract()?;
        tracing::debug!(
            "Path settings: output={:?} data={:?} model={:?} plain={}",
            settings.output_path,
            settings.data_path,
            settings.model_path,
            settings.use_plain_output_path
        );
        Ok(settings)
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed("SIMTOOLS_").only(&[
            "output_path",
            "data_path",
            "model_path",
            "use_plain_output_path",
        ]))
    }
}
