//! Candidate configuration file checks.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// A candidate configuration file that must not be uploaded.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("file: {} could not be read: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file: {} does not contain valid json", path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("file: {} does not contain a json object", path.display())]
    NotAnObject { path: PathBuf },
}

/// Turn what a file picker hands over into a filesystem path.
///
/// Pickers may report `file:///home/op/doors.json`; only the `file://`
/// scheme is removed.
pub fn strip_file_uri(raw: &str) -> PathBuf {
    PathBuf::from(raw.strip_prefix("file://").unwrap_or(raw))
}

/// Check that `path` holds a JSON object mapping door names to door configs.
///
/// The per-door values are not inspected; the controller validates them
/// after the reset and reports problems through `get_config_errors`.
pub fn validate_config_file(path: &Path) -> Result<(), ValidationError> {
    let content = std::fs::read_to_string(path).map_err(|source| ValidationError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| ValidationError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })?;

    if !value.is_object() {
        return Err(ValidationError::NotAnObject {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file_with(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_strip_file_uri() {
        assert_eq!(
            strip_file_uri("file:///home/op/doors.json"),
            PathBuf::from("/home/op/doors.json")
        );
        assert_eq!(strip_file_uri("/tmp/doors.json"), PathBuf::from("/tmp/doors.json"));
        assert_eq!(strip_file_uri("C:/doors.json"), PathBuf::from("C:/doors.json"));
    }

    #[test]
    fn test_valid_object_passes() {
        let file = file_with(r#"{"south": {"pin": 3}}"#);
        assert!(validate_config_file(file.path()).is_ok());
    }

    #[test]
    fn test_broken_json_is_rejected_with_filename() {
        let file = file_with("{not valid json");
        let err = validate_config_file(file.path()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidJson { .. }));
        assert_eq!(
            err.to_string(),
            format!("file: {} does not contain valid json", file.path().display())
        );
    }

    #[test]
    fn test_top_level_array_is_rejected() {
        let file = file_with(r#"[{"south": {}}]"#);
        let err = validate_config_file(file.path()).unwrap_err();
        assert!(matches!(err, ValidationError::NotAnObject { .. }));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_config_file(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ValidationError::Unreadable { .. }));
    }
}
