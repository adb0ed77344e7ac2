use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("{0}")]
    Validation(String),
    #[error("malformed permission context: {0}")]
    MalformedContext(String),
    #[error("upstream reasoning engine failed: {0}")]
    Upstream(String),
}

/// Error tag carried in every error body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ValidationError,
    MalformedContextError,
    UpstreamError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "ValidationError",
            Self::MalformedContextError => "MalformedContextError",
            Self::UpstreamError => "UpstreamError",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { kind: ErrorKind, message: String, correlation_id: String },
    #[error("bad gateway: {message}")]
    BadGateway { kind: ErrorKind, message: String, correlation_id: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: ErrorKind,
    pub correlation_id: String,
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::MalformedContext(_) => ErrorKind::MalformedContextError,
            Self::Upstream(_) => ErrorKind::UpstreamError,
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::BadGateway { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl InterfaceError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::BadGateway { .. } => 502,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            Self::BadRequest { kind, message, correlation_id }
            | Self::BadGateway { kind, message, correlation_id } => ErrorBody {
                error: message.clone(),
                kind: *kind,
                correlation_id: correlation_id.clone(),
            },
        }
    }
}

impl From<QueryError> for InterfaceError {
    fn from(value: QueryError) -> Self {
        let kind = value.kind();
        let message = value.to_string();
        match value {
            QueryError::Validation(_) | QueryError::MalformedContext(_) => {
                Self::BadRequest { kind, message, correlation_id: "unassigned".to_owned() }
            }
            QueryError::Upstream(_) => {
                Self::BadGateway { kind, message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
