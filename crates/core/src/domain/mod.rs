pub mod permission;
pub mod request;
pub mod response;
pub mod result;
