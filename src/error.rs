use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("D-Bus error: {0}")]
    DBus(#[from] zbus::Error),

    #[error("D-Bus call failed: {0}")]
    Fdo(#[from] zbus::fdo::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Process control failed: {0}")]
    Process(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IndicatorError {
    pub fn service_unavailable<T>(msg: impl Into<String>) -> Result<T> {
        Err(IndicatorError::ServiceUnavailable(msg.into()))
    }
}

impl From<IndicatorError> for zbus::fdo::Error {
    fn from(err: IndicatorError) -> Self {
        match err {
            IndicatorError::InvalidArgument(msg) => zbus::fdo::Error::InvalidArgs(msg),
            IndicatorError::Fdo(e) => e,
            other => zbus::fdo::Error::Failed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, IndicatorError>;

#[macro_export]
macro_rules! indicator_error {
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::IndicatorError::ServiceUnavailable(format!($($arg)*))
    };
    (process, $($arg:tt)*) => {
        $crate::error::IndicatorError::Process(format!($($arg)*))
    };
    (invalid_argument, $($arg:tt)*) => {
        $crate::error::IndicatorError::InvalidArgument(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::IndicatorError::Internal(format!($($arg)*))
    };
}
