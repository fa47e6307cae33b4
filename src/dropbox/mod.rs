mod api;
mod types;

use bytes::Bytes;
use futures::{future::BoxFuture, FutureExt};
use reqwest::Client;

use crate::{
    transport::{AppKey, Cursor, RefreshedToken, Transport},
    UploadError,
};

pub use api::*;

lazy_static::lazy_static! {
    pub static ref HTTP: Client = Client::new();
}

/// Dropbox API v2 over HTTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropboxClient;

impl Transport for DropboxClient {
    fn upload(
        &self,
        token: String,
        path: String,
        body: Bytes,
    ) -> BoxFuture<'_, Result<(), UploadError>> {
        async move { api::upload(&token, &path, body).await }.boxed()
    }

    fn session_start(
        &self,
        token: String,
        body: Bytes,
    ) -> BoxFuture<'_, Result<String, UploadError>> {
        async move { api::session_start(&token, body).await }.boxed()
    }

    fn session_append(
        &self,
        token: String,
        cursor: Cursor,
        body: Bytes,
    ) -> BoxFuture<'_, Result<(), UploadError>> {
        async move { api::session_append(&token, &cursor, body).await }.boxed()
    }

    fn session_finish(
        &self,
        token: String,
        cursor: Cursor,
        path: String,
        body: Bytes,
    ) -> BoxFuture<'_, Result<(), UploadError>> {
        async move { api::session_finish(&token, &cursor, &path, body).await }.boxed()
    }

    fn refresh_token(
        &self,
        app: AppKey,
        refresh_token: String,
    ) -> BoxFuture<'_, Result<RefreshedToken, UploadError>> {
        async move { api::refresh_token(&app, &refresh_token).await }.boxed()
    }

    fn current_account(&self, token: String) -> BoxFuture<'_, Result<String, UploadError>> {
        async move { api::current_account(&token).await }.boxed()
    }
}
