//! Dashboard API: wire types, endpoint table and HTTP transport.

pub mod endpoint;
pub mod error;
pub mod transport;
pub mod types;

pub use endpoint::{EndpointKind, Mutation, Query};
pub use error::{ApiError, ErrorBody};
pub use transport::{Credentials, HttpTransport, Transport};
