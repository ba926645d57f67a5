//! Backend client module for HTTP communication

mod body;
mod client;
mod error;
mod traits;

pub use body::{MultipartBody, MultipartPart};
pub use client::BackendClient;
pub use error::BackendError;
pub use traits::BackendTransport;

#[cfg(test)]
pub use traits::MockBackendTransport;
