use crate::commands::CommandError;
use crate::config::ConfigError;
use crate::report::ReportError;
use crate::session::SessionError;
use crate::telemetry::TelemetryError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Script(CommandError),
    Output(ReportError),
    Session(SessionError),
    Serialization(serde_json::Error),
    /// A script failed the parse-only check.
    InvalidScript { rejected: usize },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Script(err) => write!(f, "script error: {}", err),
            AppError::Output(err) => write!(f, "output error: {}", err),
            AppError::Session(err) => write!(f, "session error: {}", err),
            AppError::Serialization(err) => write!(f, "serialization error: {}", err),
            AppError::InvalidScript { rejected } => {
                write!(f, "script has {} malformed line(s)", rejected)
            }
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Script(err) => Some(err),
            AppError::Output(err) => Some(err),
            AppError::Session(err) => Some(err),
            AppError::Serialization(err) => Some(err),
            AppError::InvalidScript { .. } => None,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<CommandError> for AppError {
    fn from(value: CommandError) -> Self {
        Self::Script(value)
    }
}

impl From<ReportError> for AppError {
    fn from(value: ReportError) -> Self {
        Self::Output(value)
    }
}

impl From<SessionError> for AppError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}
