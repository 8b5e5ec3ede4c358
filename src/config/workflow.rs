//! Workflow configuration loaded with Figment.
//!
//! A workflow configuration describes one simulation-processing run: the activity name,
//! where the metadata schemas live and where data products go. All documents use a
//! `CTASIMPIPE` root:
//!
//! ```text
//! CTASIMPIPE:
//!   ACTIVITY:
//!     NAME: set_parameter_from_external
//!   DATAMODEL:
//!     USERINPUTSCHEMA: schema/user_input.yml
//!     TOPLEVELMODEL: toplevel_model.yml
//!     SCHEMADIRECTORY: ./schema
//!   PRODUCT:
//!     DIRECTORY: ./products
//! ```
//!
//! Environment variables prefixed `SIMTOOLS_WORKFLOW_` override file values, with `__`
//! separating nesting levels and key case preserved:
//!
//! ```text
//! SIMTOOLS_WORKFLOW_CTASIMPIPE__ACTIVITY__NAME=derive_mirror_rnda
//! SIMTOOLS_WORKFLOW_CTASIMPIPE__PRODUCT__DIRECTORY=/scratch/products
//! ```
//!
//! Every leaf is optional while parsing. Presence of the required keys is checked by
//! [`WorkflowConfig::validate`] and again by each operation that reads them, so a missing
//! key always surfaces as [`SimtoolsError::MissingKey`].

use crate::error::{SimtoolsError, SimtoolsResult};
use figment::{
    providers::{Env, Format, Json, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of environment variables overriding workflow keys.
pub const WORKFLOW_ENV_PREFIX: &str = "SIMTOOLS_WORKFLOW_";

/// Default data product format when the workflow does not name one.
pub const DEFAULT_PRODUCT_FORMAT: &str = "ascii.ecsv";

/// Top-level workflow configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// `CTASIMPIPE` root section.
    #[serde(rename = "CTASIMPIPE", default)]
    pub ctasimpipe: PipelineConfig,
}

/// Contents of the `CTASIMPIPE` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct PipelineConfig {
    /// `CTASIMPIPE.ACTIVITY`
    #[serde(default)]
    pub activity: ActivityConfig,
    /// `CTASIMPIPE.DATAMODEL`
    #[serde(default)]
    pub datamodel: DataModelConfig,
    /// `CTASIMPIPE.PRODUCT`
    #[serde(default)]
    pub product: ProductConfig,
}

/// `CTASIMPIPE.ACTIVITY`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct ActivityConfig {
    /// Activity name; also the output label when no product directory is set.
    #[serde(default)]
    pub name: Option<String>,
    /// Optional activity identifier copied into `CTA.ACTIVITY.ID`.
    #[serde(default)]
    pub id: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

/// `CTASIMPIPE.DATAMODEL`: schema locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataModelConfig {
    /// User input schema file.
    #[serde(rename = "USERINPUTSCHEMA", default)]
    pub user_input_schema: Option<PathBuf>,
    /// Top-level metadata template, relative to the schema directory.
    #[serde(rename = "TOPLEVELMODEL", default)]
    pub toplevel_model: Option<PathBuf>,
    /// Directory holding the schema and template files.
    #[serde(rename = "SCHEMADIRECTORY", default)]
    pub schema_directory: Option<PathBuf>,
}

/// `CTASIMPIPE.PRODUCT`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct ProductConfig {
    /// Output directory for data products.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Data product file format, e.g. `ascii.ecsv`.
    #[serde(default)]
    pub format: Option<String>,
    /// Base name of the product files.
    #[serde(default)]
    pub name: Option<String>,
}

impl WorkflowConfig {
    /// Load a workflow configuration from a YAML (or `.json`) file.
    ///
    /// The file must exist. After loading, the required keys are validated.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file does not exist, `Config` if it cannot be parsed and
    /// `MissingKey` if validation fails.
    pub fn load_from<P: AsRef<Path>>(path: P) -> SimtoolsResult<Self> {
        let config = Self::parse_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load without validating, applying `SIMTOOLS_WORKFLOW_` overrides.
    ///
    /// Used where a partial workflow is acceptable and the consuming operation performs
    /// its own presence checks.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> SimtoolsResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("workflow configuration not found: {}", path.display()),
            )
            .into());
        }

        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Figment::new().merge(Json::file(path)),
            _ => Figment::new().merge(Yaml::file(path)),
        };
        let figment = figment.merge(
            Env::prefixed(WORKFLOW_ENV_PREFIX)
                .split("__")
                .lowercase(false),
        );
        let config: Self = figment.extract()?;
        tracing::debug!("Reading workflow configuration from {}", path.display());
        Ok(config)
    }

    /// Check that every required key is present.
    ///
    /// Required: `ACTIVITY.NAME`, `DATAMODEL.USERINPUTSCHEMA`, `DATAMODEL.TOPLEVELMODEL`,
    /// `DATAMODEL.SCHEMADIRECTORY`, `PRODUCT.DIRECTORY`.
    pub fn validate(&self) -> SimtoolsResult<()> {
        self.activity_name()?;
        self.user_input_schema()?;
        self.toplevel_metadata_file()?;
        self.product_directory()?;
        Ok(())
    }

    /// `CTASIMPIPE.ACTIVITY.NAME`
    pub fn activity_name(&self) -> SimtoolsResult<&str> {
        self.ctasimpipe
            .activity
            .name
            .as_deref()
            .ok_or_else(|| missing("CTASIMPIPE.ACTIVITY.NAME"))
    }

    /// `CTASIMPIPE.DATAMODEL.USERINPUTSCHEMA`
    pub fn user_input_schema(&self) -> SimtoolsResult<&Path> {
        self.ctasimpipe
            .datamodel
            .user_input_schema
            .as_deref()
            .ok_or_else(|| missing("CTASIMPIPE.DATAMODEL.USERINPUTSCHEMA"))
    }

    /// Full path of the top-level metadata template:
    /// `SCHEMADIRECTORY/TOPLEVELMODEL`.
    pub fn toplevel_metadata_file(&self) -> SimtoolsResult<PathBuf> {
        let datamodel = &self.ctasimpipe.datamodel;
        let directory = datamodel
            .schema_directory
            .as_ref()
            .ok_or_else(|| missing("CTASIMPIPE.DATAMODEL.SCHEMADIRECTORY"))?;
        let model = datamodel
            .toplevel_model
            .as_ref()
            .ok_or_else(|| missing("CTASIMPIPE.DATAMODEL.TOPLEVELMODEL"))?;
        Ok(directory.join(model))
    }

    /// `CTASIMPIPE.PRODUCT.DIRECTORY`
    pub fn product_directory(&self) -> SimtoolsResult<&Path> {
        self.ctasimpipe
            .product
            .directory
            .as_deref()
            .ok_or_else(|| missing("CTASIMPIPE.PRODUCT.DIRECTORY"))
    }

    /// Product file format, falling back to [`DEFAULT_PRODUCT_FORMAT`].
    pub fn product_format(&self) -> &str {
        match self.ctasimpipe.product.format.as_deref() {
            Some(format) => format,
            None => {
                tracing::info!(
                    "Using default file format for model file: {}",
                    DEFAULT_PRODUCT_FORMAT
                );
                DEFAULT_PRODUCT_FORMAT
            }
        }
    }

    /// Override the schema directory (e.g. from a command line option).
    pub fn with_schema_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.ctasimpipe.datamodel.schema_directory = Some(directory.into());
        self
    }
}

fn missing(key: &str) -> SimtoolsError {
    tracing::error!("Missing {} in workflow configuration", key);
    SimtoolsError::missing(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const WORKFLOW_YAML: &str = r#"
CTASIMPIPE:
  ACTIVITY:
    NAME: set_parameter_from_external
    DESCRIPTION: Set data columns
  DATAMODEL:
    USERINPUTSCHEMA: user_input.schema.yml
    TOPLEVELMODEL: toplevel_model.yml
    SCHEMADIRECTORY: ./schema
  PRODUCT:
    DIRECTORY: ./products
"#;

    fn write_yaml(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("workflow.yml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    #[serial]
    fn test_load_valid_workflow() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_yaml(temp_dir.path(), WORKFLOW_YAML);

        let config = WorkflowConfig::load_from(&path).unwrap();
        assert_eq!(config.activity_name().unwrap(), "set_parameter_from_external");
        assert_eq!(
            config.toplevel_metadata_file().unwrap(),
            PathBuf::from("./schema/toplevel_model.yml")
        );
        assert_eq!(config.product_format(), DEFAULT_PRODUCT_FORMAT);
    }

    #[test]
    #[serial]
    fn test_missing_activity_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let yaml = WORKFLOW_YAML.replace("    NAME: set_parameter_from_external\n", "");
        let path = write_yaml(temp_dir.path(), &yaml);

        let err = WorkflowConfig::load_from(&path).unwrap_err();
        assert!(
            matches!(err, SimtoolsError::MissingKey(ref key) if key == "CTASIMPIPE.ACTIVITY.NAME")
        );

        // Parsing alone accepts the partial document.
        assert!(WorkflowConfig::parse_file(&path).is_ok());
    }

    #[test]
    fn test_missing_schema_directory() {
        let mut config = WorkflowConfig::default();
        config.ctasimpipe.activity.name = Some("test".to_string());
        config.ctasimpipe.datamodel.user_input_schema = Some("user.yml".into());
        config.ctasimpipe.datamodel.toplevel_model = Some("top.yml".into());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SCHEMADIRECTORY"));

        let config = config.with_schema_directory("/schemas");
        assert_eq!(
            config.toplevel_metadata_file().unwrap(),
            PathBuf::from("/schemas/top.yml")
        );
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = WorkflowConfig::load_from(temp_dir.path().join("nope.yml")).unwrap_err();
        assert!(matches!(err, SimtoolsError::Io(_)));
    }

    #[test]
    fn test_product_format_override() {
        let mut config = WorkflowConfig::default();
        config.ctasimpipe.product.format = Some("hdf5".to_string());
        assert_eq!(config.product_format(), "hdf5");
    }

    #[test]
    #[serial]
    fn test_env_overrides_file_value() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = write_yaml(temp_dir.path(), WORKFLOW_YAML);

        std::env::set_var("SIMTOOLS_WORKFLOW_CTASIMPIPE__ACTIVITY__NAME", "from_env");
        std::env::set_var("SIMTOOLS_WORKFLOW_CTASIMPIPE__PRODUCT__FORMAT", "arrow");
        let config = WorkflowConfig::load_from(&path);
        std::env::remove_var("SIMTOOLS_WORKFLOW_CTASIMPIPE__ACTIVITY__NAME");
        std::env::remove_var("SIMTOOLS_WORKFLOW_CTASIMPIPE__PRODUCT__FORMAT");

        let config = config.unwrap();
        assert_eq!(config.activity_name().unwrap(), "from_env");
        assert_eq!(config.product_format(), "arrow");
        // untouched keys still come from the file
        assert_eq!(config.product_directory().unwrap(), Path::new("./products"));
    }

    #[test]
    #[serial]
    fn test_env_supplies_missing_key() {
        let temp_dir = tempfile::tempdir().unwrap();
        let yaml = WORKFLOW_YAML.replace("    NAME: set_parameter_from_external\n", "");
        let path = write_yaml(temp_dir.path(), &yaml);

        std::env::set_var("SIMTOOLS_WORKFLOW_CTASIMPIPE__ACTIVITY__NAME", "from_env");
        let config = WorkflowConfig::load_from(&path);
        std::env::remove_var("SIMTOOLS_WORKFLOW_CTASIMPIPE__ACTIVITY__NAME");

        assert_eq!(config.unwrap().activity_name().unwrap(), "from_env");
    }

    #[test]
    #[serial]
    fn test_load_json_workflow() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("workflow.json");
        std::fs::write(
            &path,
            r#"{
  "CTASIMPIPE": {
    "ACTIVITY": {"NAME": "json_activity"},
    "DATAMODEL": {
      "USERINPUTSCHEMA": "user_input.schema.yml",
      "TOPLEVELMODEL": "toplevel_model.yml",
      "SCHEMADIRECTORY": "/schema"
    },
    "PRODUCT": {"DIRECTORY": "/products", "FORMAT": "hdf5"}
  }
}"#,
        )
        .unwrap();

        let config = WorkflowConfig::load_from(&path).unwrap();
        assert_eq!(config.activity_name().unwrap(), "json_activity");
        assert_eq!(
            config.toplevel_metadata_file().unwrap(),
            PathBuf::from("/schema/toplevel_model.yml")
        );
        assert_eq!(config.product_format(), "hdf5");
    }
}
