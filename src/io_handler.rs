//! Input and output path resolution.
//!
//! Output trees follow one of two layouts:
//!
//! ```text
//! labeled:  {output_path}/output/{simtools-output|test-output|<custom>}/{label}[/{sub_dir}]
//! plain:    {output_path}/output[/{sub_dir}]
//! ```
//!
//! Input data files live under `{data_path}/{parent_dir}` or, in test mode, under
//! `tests/resources`. Resolution is pure; [`IoHandler::ensure_output_directory`] is the
//! only operation that touches the file system.

use crate::config::PathSettings;
use crate::error::{SimtoolsError, SimtoolsResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const OUTPUT_DIR: &str = "output";
const TEST_RESOURCES_DIR: &str = "tests/resources";

/// Output directory convention.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DirType {
    /// Production output (`simtools-output`).
    #[default]
    SimtoolsOutput,
    /// Test output (`test-output`).
    Test,
    /// Result files; written without a sub-directory.
    SimtoolsResult,
    /// Any other directory name, used verbatim.
    Custom(String),
    /// Explicitly no directory type. Rejected when a sub-directory is requested.
    Unset,
}

impl DirType {
    /// Directory name used in the labeled layout.
    pub fn directory_name(&self) -> &str {
        match self {
            DirType::SimtoolsOutput | DirType::SimtoolsResult | DirType::Unset => {
                "simtools-output"
            }
            DirType::Test => "test-output",
            DirType::Custom(name) => name.as_str(),
        }
    }

    fn allows_sub_dir(&self) -> bool {
        !matches!(self, DirType::SimtoolsResult)
    }
}

impl fmt::Display for DirType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirType::SimtoolsOutput => f.write_str("simtools-output"),
            DirType::Test => f.write_str("test"),
            DirType::SimtoolsResult => f.write_str("simtools-result"),
            DirType::Custom(name) => f.write_str(name),
            DirType::Unset => f.write_str("<unset>"),
        }
    }
}

impl FromStr for DirType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "simtools-output" | "simtools" => DirType::SimtoolsOutput,
            "test" | "test-output" => DirType::Test,
            "simtools-result" => DirType::SimtoolsResult,
            other => DirType::Custom(other.to_string()),
        })
    }
}

impl From<Option<&str>> for DirType {
    fn from(value: Option<&str>) -> Self {
        match value {
            Some(s) => s.parse().unwrap_or_default(),
            None => DirType::Unset,
        }
    }
}

/// Resolves input and output paths from configured root directories.
#[derive(Debug, Clone, Default)]
pub struct IoHandler {
    output_path: Option<PathBuf>,
    data_path: Option<PathBuf>,
    model_path: Option<PathBuf>,
    use_plain_output_path: bool,
}

impl IoHandler {
    /// Create a handler from loaded path settings.
    pub fn new(settings: &PathSettings) -> Self {
        tracing::debug!("Init IoHandler");
        Self {
            output_path: settings.output_path.clone(),
            data_path: settings.data_path.clone(),
            model_path: settings.model_path.clone(),
            use_plain_output_path: settings.use_plain_output_path,
        }
    }

    /// Replace all root paths.
    pub fn set_paths(
        &mut self,
        output_path: Option<PathBuf>,
        data_path: Option<PathBuf>,
        model_path: Option<PathBuf>,
    ) {
        self.output_path = output_path;
        self.data_path = data_path;
        self.model_path = model_path;
    }

    /// Switch between the plain and labeled output layouts.
    pub fn set_use_plain_output_path(&mut self, plain: bool) {
        self.use_plain_output_path = plain;
    }

    /// Whether the plain output layout is used.
    pub fn use_plain_output_path(&self) -> bool {
        self.use_plain_output_path
    }

    /// Root of the output tree, if set.
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// Root of the input data files, if set.
    pub fn data_path(&self) -> Option<&Path> {
        self.data_path.as_deref()
    }

    /// Resolve an output directory.
    ///
    /// In plain mode the label and `test` are ignored. In labeled mode `test` (or
    /// `DirType::Test`) selects `test-output`. In both modes `sub_dir` is skipped for
    /// `DirType::SimtoolsResult`.
    ///
    /// # Errors
    ///
    /// `IncompleteInit` if no output path is configured, `AmbiguousDirType` if `dir_type`
    /// is `Unset` and a sub-directory is requested.
    pub fn get_output_directory(
        &self,
        label: &str,
        sub_dir: Option<&str>,
        dir_type: &DirType,
        test: bool,
    ) -> SimtoolsResult<PathBuf> {
        if sub_dir.is_some() && *dir_type == DirType::Unset {
            return Err(SimtoolsError::AmbiguousDirType);
        }

        let root = self
            .output_path
            .as_ref()
            .ok_or_else(|| SimtoolsError::IncompleteInit("output_path".to_string()))?;
        let mut path = root.join(OUTPUT_DIR);

        if !self.use_plain_output_path {
            let type_dir = if test {
                DirType::Test.directory_name()
            } else {
                dir_type.directory_name()
            };
            path = path.join(type_dir).join(label);
        }

        if let Some(sub_dir) = sub_dir {
            if dir_type.allows_sub_dir() {
                path = path.join(sub_dir);
            }
        }

        Ok(path)
    }

    /// Resolve an output file: the output directory joined with `file_name`.
    pub fn get_output_file(
        &self,
        file_name: &str,
        label: &str,
        sub_dir: Option<&str>,
        dir_type: &DirType,
        test: bool,
    ) -> SimtoolsResult<PathBuf> {
        Ok(self
            .get_output_directory(label, sub_dir, dir_type, test)?
            .join(file_name))
    }

    /// Resolve an output directory and create it (with parents) if needed.
    pub fn ensure_output_directory(
        &self,
        label: &str,
        sub_dir: Option<&str>,
        dir_type: &DirType,
        test: bool,
    ) -> SimtoolsResult<PathBuf> {
        let path = self.get_output_directory(label, sub_dir, dir_type, test)?;
        if let Err(err) = std::fs::create_dir_all(&path) {
            tracing::error!("Error creating directory {}", path.display());
            return Err(err.into());
        }
        tracing::info!("Output directory {}", path.display());
        Ok(path)
    }

    /// Absolute path of an input data file.
    ///
    /// Test mode resolves to `tests/resources/{file_name}` relative to the working
    /// directory and ignores `parent_dir`.
    ///
    /// # Errors
    ///
    /// `IncompleteInit` if `data_path` is unset outside test mode.
    pub fn get_input_data_file(
        &self,
        parent_dir: Option<&str>,
        file_name: &str,
        test: bool,
    ) -> SimtoolsResult<PathBuf> {
        let prefix = if test {
            PathBuf::from(TEST_RESOURCES_DIR)
        } else {
            let data_path = self.data_path.as_ref().ok_or_else(|| {
                tracing::error!("IoHandler: data_path is not set");
                SimtoolsError::IncompleteInit("data_path".to_string())
            })?;
            match parent_dir {
                Some(parent) => data_path.join(parent),
                None => data_path.clone(),
            }
        };
        Ok(std::path::absolute(prefix.join(file_name))?)
    }

    /// Path of a model file under `model_path`.
    pub fn get_model_file(&self, file_name: &str) -> SimtoolsResult<PathBuf> {
        let model_path = self
            .model_path
            .as_ref()
            .ok_or_else(|| SimtoolsError::IncompleteInit("model_path".to_string()))?;
        Ok(model_path.join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(plain: bool) -> IoHandler {
        IoHandler::new(&PathSettings {
            output_path: Some(PathBuf::from("/sim")),
            data_path: Some(PathBuf::from("/sim/data")),
            model_path: None,
            use_plain_output_path: plain,
        })
    }

    #[test]
    fn test_dir_type_parsing() {
        assert_eq!("test".parse::<DirType>().unwrap(), DirType::Test);
        assert_eq!(
            "simtools-result".parse::<DirType>().unwrap(),
            DirType::SimtoolsResult
        );
        assert_eq!(
            "ray-tracing".parse::<DirType>().unwrap(),
            DirType::Custom("ray-tracing".to_string())
        );
        assert_eq!(DirType::from(None), DirType::Unset);
        assert_eq!(DirType::from(Some("test")), DirType::Test);
    }

    #[test]
    fn test_labeled_default() {
        let path = handler(false)
            .get_output_directory("L", None, &DirType::default(), false)
            .unwrap();
        assert_eq!(path, PathBuf::from("/sim/output/simtools-output/L"));
    }

    #[test]
    fn test_labeled_test_flag_overrides_type() {
        let path = handler(false)
            .get_output_directory("L", Some("model"), &DirType::SimtoolsOutput, true)
            .unwrap();
        assert_eq!(path, PathBuf::from("/sim/output/test-output/L/model"));
    }

    #[test]
    fn test_custom_dir_type() {
        let path = handler(false)
            .get_output_directory("L", None, &DirType::Custom("ray-tracing".into()), false)
            .unwrap();
        assert_eq!(path, PathBuf::from("/sim/output/ray-tracing/L"));
    }

    #[test]
    fn test_unset_dir_type_without_sub_dir() {
        let path = handler(false)
            .get_output_directory("L", None, &DirType::Unset, false)
            .unwrap();
        assert_eq!(path, PathBuf::from("/sim/output/simtools-output/L"));
    }

    #[test]
    fn test_missing_output_path() {
        let err = IoHandler::default()
            .get_output_directory("L", None, &DirType::default(), false)
            .unwrap_err();
        assert!(matches!(err, SimtoolsError::IncompleteInit(_)));
    }

    #[test]
    fn test_model_file() {
        let mut io = handler(false);
        assert!(matches!(
            io.get_model_file("mirrors.dat"),
            Err(SimtoolsError::IncompleteInit(_))
        ));
        io.set_paths(None, None, Some(PathBuf::from("/models")));
        assert_eq!(
            io.get_model_file("mirrors.dat").unwrap(),
            PathBuf::from("/models/mirrors.dat")
        );
    }
}
