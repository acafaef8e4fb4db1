use crate::types::Pose;

/// [Result] alias for return types of the crate API
pub type Result<T> = std::result::Result<T, Error>;

/// Error enum type
///
/// Command rejections by the autopilot are not errors: [set_mode](crate::subsystems::supervisor::Supervisor::set_mode)
/// and [send_arming_request](crate::subsystems::supervisor::Supervisor::send_arming_request) return `Ok(false)`
/// in that case. An `Err` means the request could not be delivered at all.
#[derive(Debug)]
pub enum Error {
    /// The link to the flight stack is closed or the vehicle handle was disconnected.
    Disconnected,
    /// Invalid mission configuration. The String contains the reason.
    ConfigError(String),
    /// Error with the async runtime. The String contains the reason.
    SystemError(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Disconnected => write!(f, "link to the flight stack is disconnected"),
            Error::ConfigError(reason) => write!(f, "invalid configuration: {}", reason),
            Error::SystemError(reason) => write!(f, "runtime error: {}", reason),
        }
    }
}

impl std::error::Error for Error {}

impl From<flume::SendError<Pose>> for Error {
    fn from(_: flume::SendError<Pose>) -> Self {
        self::Error::Disconnected
    }
}

impl From<tokio::sync::watch::error::RecvError> for Error {
    fn from(_: tokio::sync::watch::error::RecvError) -> Self {
        self::Error::Disconnected
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::SystemError(format!("{}", error))
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::ConfigError(format!("{}", error))
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::ConfigError(format!("{}", error))
    }
}
