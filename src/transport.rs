use bytes::Bytes;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::UploadError;

/// Position in an open upload session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub session_id: String,
    pub offset: u64,
}

/// Response of the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: u64,
}

/// Registered application credentials, used for token refresh.
#[derive(Debug, Clone)]
pub struct AppKey {
    pub key: String,
    pub secret: String,
}

/// Operations of the remote store.
///
/// Every write commits with overwrite semantics and renames automatically on
/// a conflicting concurrent write. Implementations map HTTP failures with
/// [`UploadError::from_status`].
pub trait Transport: Send + Sync {
    /// Writes `body` to `path` in one request.
    fn upload(
        &self,
        token: String,
        path: String,
        body: Bytes,
    ) -> BoxFuture<'_, Result<(), UploadError>>;

    /// Opens a session seeded with the first chunk. Returns the session id.
    fn session_start(
        &self,
        token: String,
        body: Bytes,
    ) -> BoxFuture<'_, Result<String, UploadError>>;

    fn session_append(
        &self,
        token: String,
        cursor: Cursor,
        body: Bytes,
    ) -> BoxFuture<'_, Result<(), UploadError>>;

    /// Sends the last chunk and commits the session to `path`.
    fn session_finish(
        &self,
        token: String,
        cursor: Cursor,
        path: String,
        body: Bytes,
    ) -> BoxFuture<'_, Result<(), UploadError>>;

    fn refresh_token(
        &self,
        app: AppKey,
        refresh_token: String,
    ) -> BoxFuture<'_, Result<RefreshedToken, UploadError>>;

    /// Display name of the account that owns `token`.
    fn current_account(&self, token: String) -> BoxFuture<'_, Result<String, UploadError>>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn upload(
        &self,
        token: String,
        path: String,
        body: Bytes,
    ) -> BoxFuture<'_, Result<(), UploadError>> {
        (**self).upload(token, path, body)
    }

    fn session_start(
        &self,
        token: String,
        body: Bytes,
    ) -> BoxFuture<'_, Result<String, UploadError>> {
        (**self).session_start(token, body)
    }

    fn session_append(
        &self,
        token: String,
        cursor: Cursor,
        body: Bytes,
    ) -> BoxFuture<'_, Result<(), UploadError>> {
        (**self).session_append(token, cursor, body)
    }

    fn session_finish(
        &self,
        token: String,
        cursor: Cursor,
        path: String,
        body: Bytes,
    ) -> BoxFuture<'_, Result<(), UploadError>> {
        (**self).session_finish(token, cursor, path, body)
    }

    fn refresh_token(
        &self,
        app: AppKey,
        refresh_token: String,
    ) -> BoxFuture<'_, Result<RefreshedToken, UploadError>> {
        (**self).refresh_token(app, refresh_token)
    }

    fn current_account(&self, token: String) -> BoxFuture<'_, Result<String, UploadError>> {
        (**self).current_account(token)
    }
}
