//! Service configuration.
//!
//! Stored as YAML in `~/.rollcall/config.yaml`. A missing file is created
//! with defaults on first load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use rollcall_faceindex::{Persistence, RegistryConfig};
use rollcall_roster::StudentId;

use crate::error::AttendanceError;

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".rollcall";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Roster database filename inside the data directory.
pub const DATABASE_FILE: &str = "attendance.redb";
/// Index blob directory inside the data directory.
pub const INDEX_DIR: &str = "index";

/// When index appends reach disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexPersistence {
    #[default]
    WriteThrough,
    Deferred,
}

impl From<IndexPersistence> for Persistence {
    fn from(p: IndexPersistence) -> Self {
        match p {
            IndexPersistence::WriteThrough => Persistence::WriteThrough,
            IndexPersistence::Deferred => Persistence::Deferred,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Embedding width every course index is held to.
    pub embedding_dim: usize,

    /// Maximum squared L2 distance accepted as a match (exclusive).
    pub threshold: f32,

    /// Course code to display name.
    pub courses: BTreeMap<String, String>,

    pub student_id_min: StudentId,
    pub student_id_max: StudentId,

    /// Directory holding the roster database and index blobs.
    pub data_dir: PathBuf,

    pub index_persistence: IndexPersistence,

    /// Window in seconds during which a repeated recognition of the same
    /// student is not logged again. 0 logs every recognition.
    pub attendance_debounce_secs: u64,

    #[serde(skip)]
    pub(crate) config_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let mut courses = BTreeMap::new();
        courses.insert("AI".to_string(), "Artificial Intelligence".to_string());
        courses.insert("GD".to_string(), "Graphic Design".to_string());

        Self {
            embedding_dim: 512,
            threshold: 0.4,
            courses,
            student_id_min: 1000,
            student_id_max: 9999,
            data_dir: default_data_dir(),
            index_persistence: IndexPersistence::default(),
            attendance_debounce_secs: 0,
            config_path: PathBuf::new(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(DEFAULT_BASE_DIR).join("data"),
        None => PathBuf::from(DEFAULT_BASE_DIR).join("data"),
    }
}

impl Config {
    /// Gets the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration from `custom_path`, or the default location.
    /// A missing file is written with defaults. The result is validated.
    pub fn load(custom_path: Option<&Path>) -> Result<Config, AttendanceError> {
        let config_path = match custom_path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()
                .ok_or_else(|| AttendanceError::Config("cannot determine config path".into()))?,
        };

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut cfg = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_yaml::from_str(&content).map_err(|e| AttendanceError::Config(e.to_string()))?
        } else {
            let cfg = Config::default();
            let content =
                serde_yaml::to_string(&cfg).map_err(|e| AttendanceError::Config(e.to_string()))?;
            std::fs::write(&config_path, content)?;
            debug!(path = %config_path.display(), "default config written");
            cfg
        };
        cfg.config_path = config_path;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Returns the path the config was loaded from, empty if built in code.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Saves the configuration to the path it was loaded from.
    pub fn save(&self) -> Result<(), AttendanceError> {
        if self.config_path.as_os_str().is_empty() {
            return Err(AttendanceError::Config("config has no path".into()));
        }
        let content =
            serde_yaml::to_string(self).map_err(|e| AttendanceError::Config(e.to_string()))?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AttendanceError> {
        if self.embedding_dim == 0 {
            return Err(AttendanceError::Config("embedding_dim must be positive".into()));
        }
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(AttendanceError::Config("threshold must be positive".into()));
        }
        if self.student_id_min > self.student_id_max {
            return Err(AttendanceError::Config(format!(
                "student id range is inverted: {} > {}",
                self.student_id_min, self.student_id_max
            )));
        }
        for code in self.courses.keys() {
            if code.is_empty() {
                return Err(AttendanceError::Config("course code must not be empty".into()));
            }
            if code.contains([':', '/', '\\']) {
                return Err(AttendanceError::Config(format!(
                    "course code {code:?} contains a reserved character"
                )));
            }
        }
        Ok(())
    }

    /// Display name of a configured course.
    pub fn course_name(&self, course_id: &str) -> Option<&str> {
        self.courses.get(course_id).map(String::as_str)
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            dim: self.embedding_dim,
            persistence: self.index_persistence.into(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join(INDEX_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.embedding_dim, 512);
        assert_eq!(cfg.threshold, 0.4);
        assert_eq!(cfg.course_name("AI"), Some("Artificial Intelligence"));
        assert_eq!(cfg.course_name("GD"), Some("Graphic Design"));
        assert_eq!((cfg.student_id_min, cfg.student_id_max), (1000, 9999));
        assert_eq!(cfg.registry_config().persistence, Persistence::WriteThrough);
        cfg.validate().unwrap();
    }

    #[test]
    fn load_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let cfg = Config::load(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.path(), path.as_path());
        assert_eq!(cfg.embedding_dim, 512);
    }

    #[test]
    fn load_partial_yaml_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "embedding_dim: 128\nindex_persistence: deferred\ncourses:\n  ML: Machine Learning\n",
        )
        .unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.embedding_dim, 128);
        assert_eq!(cfg.threshold, 0.4);
        assert_eq!(cfg.index_persistence, IndexPersistence::Deferred);
        assert_eq!(cfg.courses.len(), 1);
        assert_eq!(cfg.course_name("ML"), Some("Machine Learning"));
    }

    #[test]
    fn save_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut cfg = Config::load(Some(&path)).unwrap();
        cfg.attendance_debounce_secs = 300;
        cfg.save().unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.attendance_debounce_secs, 300);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.embedding_dim = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.threshold = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.student_id_min = 5000;
        cfg.student_id_max = 4000;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.courses.insert("A:B".into(), "bad".into());
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.courses.insert(String::new(), "bad".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn invalid_yaml_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "embedding_dim: [not, a, number]\n").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, AttendanceError::Config(_)));
    }
}
