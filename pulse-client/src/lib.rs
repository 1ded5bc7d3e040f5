pub mod admin;
pub mod client;
pub mod community;
pub mod endpoint;
pub mod error;
pub mod goals;
pub mod record;
pub mod story;

pub use client::{ApiClient, AuthMode, ClientConfig};
pub use endpoint::{Endpoint, Resource};
pub use error::{ApiError, ErrorKind};
