//! Core error taxonomy shared by dataset, registry, trainer, prediction and
//! batch modules.

use std::fmt;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug)]
pub enum CoreError {
    /// Dataset source missing or malformed. Fatal at startup.
    DataLoad(String),
    /// Crop type not present in the dataset.
    UnknownCropType(String),
    /// No rows to fit for this crop type.
    InsufficientData { crop_type: String },
    /// Cache miss. Internal signal that triggers train-on-miss.
    ArtifactNotFound { family: String, crop_type: String },
    /// A batch job is already active.
    AlreadyRunning,
    /// Artifact I/O failure or corrupt artifact.
    Storage(String),
    /// Model fit failed (shape mismatch etc).
    Training(String),
    /// Settings file could not be read or parsed.
    Config(String),
}

impl CoreError {
    /// Errors a shell should show as a validation/notice message rather than
    /// as an internal failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            CoreError::UnknownCropType(_)
                | CoreError::InsufficientData { .. }
                | CoreError::AlreadyRunning
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::ArtifactNotFound { .. })
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::DataLoad(msg) => write!(f, "Data load error: {}", msg),
            CoreError::UnknownCropType(crop) => write!(f, "Unknown crop type: '{}'", crop),
            CoreError::InsufficientData { crop_type } => {
                write!(f, "Insufficient data: no rows for crop type '{}'", crop_type)
            }
            CoreError::ArtifactNotFound { family, crop_type } => {
                write!(f, "Artifact not found: {} / '{}'", family, crop_type)
            }
            CoreError::AlreadyRunning => write!(f, "A training job is already running"),
            CoreError::Storage(msg) => write!(f, "Storage error: {}", msg),
            CoreError::Training(msg) => write!(f, "Training error: {}", msg),
            CoreError::Config(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for CoreError {}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_classification() {
        assert!(CoreError::UnknownCropType("Corn".into()).is_user_facing());
        assert!(CoreError::AlreadyRunning.is_user_facing());
        assert!(!CoreError::Storage("disk full".into()).is_user_facing());
        assert!(!CoreError::ArtifactNotFound {
            family: "RandomForest".into(),
            crop_type: "Wheat".into(),
        }
        .is_user_facing());
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::Storage(_)));
        assert!(err.to_string().contains("denied"));
    }
}
