pub mod config;
pub mod domain;
pub mod errors;
pub mod formatter;
pub mod normalizer;

pub use domain::permission::{
    AccessVerdict, FieldPermission, FieldRef, ObjectPermission, PermissionContext,
};
pub use domain::request::{CanonicalRequest, QueryRequest, UserId};
pub use domain::response::{
    ChartType, FieldAccess, ModelInfo, PingStatus, QueryResponse, ServiceStatus, Visualization,
};
pub use domain::result::{PermissionCheck, RawResult};
pub use errors::{ErrorBody, ErrorKind, InterfaceError, QueryError};
pub use formatter::format_response;
pub use normalizer::normalize;
