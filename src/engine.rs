use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::{
    auth::{Clock, CredentialManager, SystemClock},
    retry::RetryPolicy,
    transport::{Cursor, Transport},
    types::{Payload, MIB},
    UploadError,
};

/// Payloads up to this size are written in one request.
pub const CHUNK_SIZE: u64 = 8 * MIB;

/// Uploads single files, in chunks when they are large.
pub struct Engine<T, C = SystemClock> {
    transport: T,
    credentials: CredentialManager<C>,
    policy: RetryPolicy,
    chunk_size: u64,
}

impl<T: Transport, C: Clock> Engine<T, C> {
    pub fn new(transport: T, credentials: CredentialManager<C>) -> Self {
        Self {
            transport,
            credentials,
            policy: RetryPolicy::default(),
            chunk_size: CHUNK_SIZE,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn credentials(&self) -> &CredentialManager<C> {
        &self.credentials
    }

    /// Writes `payload` to `path`, replacing what is there.
    ///
    /// `on_progress` receives the percentage of the payload sent so far.
    pub async fn upload<P>(
        &mut self,
        payload: &Payload,
        path: &str,
        mut on_progress: P,
    ) -> Result<(), UploadError>
    where
        P: FnMut(u8),
    {
        let size = payload.size();

        if size > self.chunk_size {
            return self.upload_chunked(payload, path, &mut on_progress).await;
        }

        let body = payload.read_chunk(0, size).await?;
        self.call("upload", |t, token| {
            t.upload(token, path.to_string(), body.clone())
        })
        .await?;

        on_progress(100);
        info!(path, size, "file uploaded");
        Ok(())
    }

    /// Account display name, confirming the credentials work.
    pub async fn current_account(&mut self) -> Result<String, UploadError> {
        self.call("account check", |t, token| t.current_account(token))
            .await
    }

    async fn upload_chunked<P>(
        &mut self,
        payload: &Payload,
        path: &str,
        on_progress: &mut P,
    ) -> Result<(), UploadError>
    where
        P: FnMut(u8),
    {
        let size = payload.size();
        let chunk_size = self.chunk_size;

        let first = payload.read_chunk(0, chunk_size).await?;
        let session_id = self
            .call("session start", |t, token| {
                t.session_start(token, first.clone())
            })
            .await
            .map_err(|e| chunk_error(0, e))?;

        let mut offset = first.len() as u64;
        drop(first);
        debug!(path, %session_id, offset, size, "upload session started");
        on_progress(percent(offset, size));

        while offset < size {
            let body = payload.read_chunk(offset, chunk_size).await?;
            let cursor = Cursor {
                session_id: session_id.clone(),
                offset,
            };

            let res = if offset + chunk_size >= size {
                self.call("session finish", |t, token| {
                    t.session_finish(token, cursor.clone(), path.to_string(), body.clone())
                })
                .await
            } else {
                self.call("session append", |t, token| {
                    t.session_append(token, cursor.clone(), body.clone())
                })
                .await
            };
            res.map_err(|e| chunk_error(offset, e))?;

            offset += body.len() as u64;
            debug!(path, offset, size, "chunk uploaded");
            on_progress(percent(offset, size));
        }

        info!(path, size, "file uploaded");
        Ok(())
    }

    /// Runs one network operation with a valid token under the retry
    /// policy. A 401 is answered with a single refresh and another run.
    async fn call<R, F>(&mut self, op: &'static str, f: F) -> Result<R, UploadError>
    where
        F: for<'a> Fn(&'a T, String) -> BoxFuture<'a, Result<R, UploadError>>,
    {
        let mut refreshed = false;

        loop {
            self.credentials.ensure_valid_token(&self.transport).await?;

            let transport = &self.transport;
            let token = self.credentials.access_token();
            let res = self
                .policy
                .run(op, || f(transport, token.to_string()))
                .await;

            match res {
                Err(UploadError::Authentication)
                    if !refreshed && self.credentials.can_refresh() =>
                {
                    warn!(op, "authentication failed, refreshing access token");
                    refreshed = true;
                    self.credentials.refresh(&self.transport).await?;
                }
                r => return r,
            }
        }
    }
}

fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

/// Retries exhausted on a session step. Errors the retry policy does not
/// handle pass through unchanged.
fn chunk_error(offset: u64, e: UploadError) -> UploadError {
    match e.is_transient() {
        true => UploadError::ChunkTransfer {
            offset,
            source: Box::new(e),
        },
        false => e,
    }
}
