use std::fmt::{Display, Formatter, Result as FmtResult};

/// Root error type for the widget core
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    Datafeed(DatafeedError),
    Annotation(AnnotationError),
    Persistence(PersistenceError),
}

/// Failures of the market-data protocol surface
#[derive(Debug, Clone, PartialEq)]
pub enum DatafeedError {
    /// Network failure before a response arrived
    Transport(String),
    /// The request did not finish inside its time budget
    Timeout { timeout_ms: u64 },
    /// Response arrived but failed schema/validation checks
    MalformedResponse(String),
    /// The backend answered with an error status
    Backend { status: u16, message: String },
    UnresolvedSymbol(String),
    /// 401 or an expired bearer token
    SessionExpired,
}

impl DatafeedError {
    /// Transport-level problems may succeed on the next attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. })
    }

    /// Errors that must never be degraded into an empty result.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

/// Failures while capturing or restoring drawings
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationError {
    /// The operation lost ownership of its configuration id
    StaleOperation,
    /// The engine lacks a primitive the chosen strategy needs
    EngineCapabilityMissing(&'static str),
    /// The chart handle was released by teardown
    EngineDetached,
    Engine(String),
}

/// Failures of the configuration GET/PUT cycle
#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceError {
    Request(DatafeedError),
    NoSelection,
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AppError::Datafeed(e) => write!(f, "Datafeed: {}", e),
            AppError::Annotation(e) => write!(f, "Annotation: {}", e),
            AppError::Persistence(e) => write!(f, "Persistence: {}", e),
        }
    }
}

impl Display for DatafeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DatafeedError::Transport(msg) => write!(f, "transport error: {}", msg),
            DatafeedError::Timeout { timeout_ms } => {
                write!(f, "request timed out after {} ms", timeout_ms)
            }
            DatafeedError::MalformedResponse(msg) => write!(f, "malformed response: {}", msg),
            DatafeedError::Backend { status, message } => {
                write!(f, "backend error {}: {}", status, message)
            }
            DatafeedError::UnresolvedSymbol(symbol) => write!(f, "cannot resolve {}", symbol),
            DatafeedError::SessionExpired => write!(f, "session expired"),
        }
    }
}

impl Display for AnnotationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AnnotationError::StaleOperation => write!(f, "operation superseded"),
            AnnotationError::EngineCapabilityMissing(what) => {
                write!(f, "chart engine does not support {}", what)
            }
            AnnotationError::EngineDetached => write!(f, "chart engine detached"),
            AnnotationError::Engine(msg) => write!(f, "chart engine error: {}", msg),
        }
    }
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PersistenceError::Request(e) => write!(f, "{}", e),
            PersistenceError::NoSelection => write!(f, "no configuration selected"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for DatafeedError {}
impl std::error::Error for AnnotationError {}
impl std::error::Error for PersistenceError {}

impl From<DatafeedError> for AppError {
    fn from(error: DatafeedError) -> Self {
        AppError::Datafeed(error)
    }
}

impl From<AnnotationError> for AppError {
    fn from(error: AnnotationError) -> Self {
        AppError::Annotation(error)
    }
}

impl From<PersistenceError> for AppError {
    fn from(error: PersistenceError) -> Self {
        AppError::Persistence(error)
    }
}

impl From<DatafeedError> for PersistenceError {
    fn from(error: DatafeedError) -> Self {
        PersistenceError::Request(error)
    }
}

pub type DatafeedResult<T> = Result<T, DatafeedError>;
pub type AnnotationResult<T> = Result<T, AnnotationError>;
