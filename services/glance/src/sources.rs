//! Reading variables out of input files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use delta::{DataSet, Shape};
use glance_common::{GlanceError, GlanceResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A file holding named numeric variables.
pub trait DataFile: Send + Sync {
    fn path(&self) -> &Path;

    /// Variable names, sorted.
    fn variable_names(&self) -> Vec<String>;

    fn shape(&self, name: &str) -> GlanceResult<Shape>;

    /// The variable's values. The file's missing value is not applied;
    /// callers decide which sentinel to use.
    fn read(&self, name: &str) -> GlanceResult<DataSet>;

    /// The missing value the file declares for `name`, if any.
    fn missing_value(&self, name: &str) -> Option<f64>;

    fn contains(&self, name: &str) -> bool {
        self.variable_names().iter().any(|n| n == name)
    }
}

// ============================================================================
// JSON files
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct JsonDocument {
    variables: BTreeMap<String, JsonVariable>,
}

#[derive(Debug, Clone, Deserialize)]
struct JsonVariable {
    shape: Vec<usize>,
    /// `null` entries are NaN.
    data: Vec<Option<f64>>,
    #[serde(default)]
    missing_value: Option<f64>,
}

/// Variables stored as a JSON document:
///
/// ```json
/// {"variables": {"tpw": {"shape": [2, 2], "data": [1.0, null, 3.0, -999.0], "missing_value": -999.0}}}
/// ```
#[derive(Debug, Clone)]
pub struct JsonDataFile {
    path: PathBuf,
    variables: BTreeMap<String, JsonVariable>,
}

impl JsonDataFile {
    pub fn open(path: impl AsRef<Path>) -> GlanceResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            GlanceError::DataReadError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let doc: JsonDocument = serde_json::from_str(&content).map_err(|e| {
            GlanceError::DataReadError(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        for (name, var) in &doc.variables {
            let expected: usize = var.shape.iter().product();
            if var.data.len() != expected {
                return Err(GlanceError::shape_mismatch(
                    format!("variable '{}' in {}", name, path.display()),
                    &var.shape,
                    &[var.data.len()],
                ));
            }
        }

        debug!(path = %path.display(), variables = doc.variables.len(), "Opened JSON data file");
        Ok(Self {
            path: path.to_path_buf(),
            variables: doc.variables,
        })
    }

    fn variable(&self, name: &str) -> GlanceResult<&JsonVariable> {
        self.variables
            .get(name)
            .ok_or_else(|| GlanceError::VariableNotFound(name.to_string()))
    }
}

impl DataFile for JsonDataFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    fn shape(&self, name: &str) -> GlanceResult<Shape> {
        Ok(Shape::from(self.variable(name)?.shape.clone()))
    }

    fn read(&self, name: &str) -> GlanceResult<DataSet> {
        let var = self.variable(name)?;
        let values = var.data.iter().map(|v| v.unwrap_or(f64::NAN)).collect();
        DataSet::new(values, var.shape.clone())
    }

    fn missing_value(&self, name: &str) -> Option<f64> {
        self.variables.get(name).and_then(|v| v.missing_value)
    }

    fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }
}

/// Open a data file, choosing the reader from the extension.
pub fn open_data_file(path: impl AsRef<Path>) -> GlanceResult<Box<dyn DataFile>> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(Box::new(JsonDataFile::open(path)?)),
        other => Err(GlanceError::DataReadError(format!(
            "Unsupported file type {:?} for {}",
            other.unwrap_or(""),
            path.display()
        ))),
    }
}

// ============================================================================
// File information
// ============================================================================

/// Identifying information recorded in reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub path: String,
    pub size_bytes: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl FileInfo {
    pub fn from_path(path: impl AsRef<Path>) -> GlanceResult<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path)?;
        let last_modified = metadata.modified().ok().map(DateTime::<Utc>::from);

        info!(
            path = %path.display(),
            size = metadata.len(),
            last_modified = ?last_modified,
            "Opened input file"
        );

        Ok(Self {
            path: path.display().to_string(),
            size_bytes: metadata.len(),
            last_modified,
        })
    }
}
