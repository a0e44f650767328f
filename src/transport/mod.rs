//! HTTP transport for the remote model API.

mod http;

pub use http::{HttpResponse, HttpTransport, TransportError};
