mod error;

pub mod auth;
pub mod batch;
pub mod config;
pub mod engine;
pub mod manifest;
pub mod retry;
pub mod transport;
pub mod types;

#[cfg(feature = "dropbox")]
pub mod dropbox;

#[cfg(test)]
mod testing;

pub use auth::{CredentialManager, Credentials};
pub use batch::{progress_stream, Uploader};
pub use config::Config;
pub use engine::Engine;
pub use error::UploadError;
pub use manifest::ManifestBuilder;
pub use transport::Transport;
pub use types::{Payload, UploadBatch, UploadItem};
