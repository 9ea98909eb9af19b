//! HTTP plumbing shared by every service: request/response types, the
//! transport seam, and the refresh coordinator that authenticated calls
//! go through.

pub mod coordinator;
pub mod response;
pub mod transport;

pub use coordinator::{RefreshCoordinator, RefreshedCredentials, TokenRefresher};
pub use response::{ApiError, Envelope, MessageResponse};
pub use transport::{ApiRequest, HttpTransport, RawResponse, Transport};
