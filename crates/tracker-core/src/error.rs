use std::path::PathBuf;
use thiserror::Error;

/// Failure to enumerate the activities directory. Fatal for the run.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// The supplied path does not exist.
    #[error("Activities directory not found: {0}")]
    NotFound(PathBuf),

    /// The supplied path exists but is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The directory could not be listed.
    #[error("Failed to read directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to turn one activity's files into a record.
///
/// Recorded per activity and never fatal for the batch.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON in {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A binary FIT file is truncated, malformed or fails its CRC check.
    #[error("Corrupt FIT file {path}: {reason}")]
    CorruptFit { path: PathBuf, reason: String },

    /// A mandatory field (timestamp or duration) was found in no source file.
    #[error("Activity {id} is missing mandatory field '{field}'")]
    MissingField { id: String, field: &'static str },

    /// A group contained no file the extractor could use.
    #[error("Activity {0} has no usable files")]
    NoUsableFiles(String),
}

/// All errors produced by the tracker crates.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Filtering left nothing to report.
    #[error("No {0} activities found")]
    NoActivities(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = DirectoryError::NotFound(PathBuf::from("/missing/dir"));
        assert_eq!(err.to_string(), "Activities directory not found: /missing/dir");
    }

    #[test]
    fn test_error_display_unreadable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = DirectoryError::Unreadable {
            path: PathBuf::from("/locked"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("/locked"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ExtractionError::FileRead {
            path: PathBuf::from("/some/123_summary.json"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("123_summary.json"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_missing_field() {
        let err = ExtractionError::MissingField {
            id: "123".to_string(),
            field: "duration",
        };
        assert_eq!(
            err.to_string(),
            "Activity 123 is missing mandatory field 'duration'"
        );
    }

    #[test]
    fn test_error_display_corrupt_fit() {
        let err = ExtractionError::CorruptFit {
            path: PathBuf::from("a.fit"),
            reason: "CRC mismatch".to_string(),
        };
        assert_eq!(err.to_string(), "Corrupt FIT file a.fit: CRC mismatch");
    }

    #[test]
    fn test_tracker_error_from_directory_is_transparent() {
        let err: TrackerError = DirectoryError::NotADirectory(PathBuf::from("/etc/hosts")).into();
        assert_eq!(err.to_string(), "Not a directory: /etc/hosts");
    }

    #[test]
    fn test_tracker_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: TrackerError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_tracker_error_no_activities() {
        let err = TrackerError::NoActivities("running".to_string());
        assert_eq!(err.to_string(), "No running activities found");
    }
}
