//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed configuration document
    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// File watch could not be installed
    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// File sink error with path
    #[error("File sink error for '{path}': {message}")]
    FileSinkError { path: String, message: String },

    /// A target panicked while writing
    #[error("Target '{target}' panicked: {message}")]
    TargetPanicked { target: String, message: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file sink error
    pub fn file_sink(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileSinkError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn target_panicked(target: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::TargetPanicked {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::config("microlog", "unbalanced element");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::file_sink("logs/app.log", "Permission denied");
        assert!(matches!(err, LoggerError::FileSinkError { .. }));

        let err = LoggerError::target_panicked("console", "boom");
        assert!(matches!(err, LoggerError::TargetPanicked { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::config("microlog", "unclosed element 'target'");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for microlog: unclosed element 'target'"
        );

        let err = LoggerError::file_sink("logs/app.log", "Disk full");
        assert_eq!(err.to_string(), "File sink error for 'logs/app.log': Disk full");

        let err = LoggerError::target_panicked("file", "index out of bounds");
        assert_eq!(err.to_string(), "Target 'file' panicked: index out of bounds");
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = LoggerError::io_operation("reading config file", "cannot open app.config", io_err);

        assert!(matches!(err, LoggerError::IoOperation { .. }));
        assert!(err.to_string().contains("reading config file"));
        assert!(err.to_string().contains("cannot open app.config"));
    }
}
