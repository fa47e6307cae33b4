use async_stream::stream;
use futures::Stream;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::{
    auth::{Clock, CredentialManager, SystemClock},
    config::Config,
    engine::Engine,
    transport::Transport,
    types::{UploadBatch, UploadItem},
    UploadError,
};

enum Step {
    Sending(u8),
    Done,
}

/// Uploads batches one item at a time through a single engine.
pub struct Uploader<T, C = SystemClock> {
    engine: Engine<T, C>,
}

impl<T: Transport> Uploader<T> {
    pub fn from_config(transport: T, config: &Config) -> Self {
        let credentials = CredentialManager::new(config.app(), config.credentials.clone());
        let engine = Engine::new(transport, credentials)
            .with_policy(config.transfer.retry_policy())
            .with_chunk_size(config.transfer.chunk_size);

        Self::new(engine)
    }
}

impl<T: Transport, C: Clock> Uploader<T, C> {
    pub fn new(engine: Engine<T, C>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine<T, C> {
        &self.engine
    }

    /// Checks the credentials against the account endpoint and returns the
    /// account display name.
    pub async fn verify_connection(&mut self) -> Result<String, UploadError> {
        let name = self.engine.current_account().await?;
        info!(account = %name, "storage connection verified");
        Ok(name)
    }

    /// Uploads every item in order, reporting overall progress weighted by
    /// item weight. Stops at the first failure; items already uploaded stay.
    pub async fn upload_batch<P>(
        &mut self,
        batch: &UploadBatch,
        mut on_progress: P,
    ) -> Result<(), UploadError>
    where
        P: FnMut(u8),
    {
        self.run(batch, |_, _, overall| on_progress(overall)).await
    }

    /// Whole-artist flow: verifies the connection first, then uploads the
    /// batch with a status line per item and per 10% of large files.
    pub async fn upload_with_status<S>(
        &mut self,
        batch: &UploadBatch,
        mut on_status: S,
    ) -> Result<(), UploadError>
    where
        S: FnMut(&str, u8),
    {
        on_status("Verifying connection...", 0);
        self.verify_connection().await?;

        let mut next = 10;
        self.run(batch, |item, step, overall| match step {
            Step::Sending(p) if p >= next && p < 100 => {
                next = (p / 10 + 1) * 10;
                on_status(&format!("Uploading {}: {p}%", item.label), overall);
            }
            Step::Sending(_) => {}
            Step::Done => {
                next = 10;
                on_status(&format!("Uploaded {}", item.label), overall);
            }
        })
        .await
    }

    async fn run<F>(&mut self, batch: &UploadBatch, mut report: F) -> Result<(), UploadError>
    where
        F: FnMut(&UploadItem, Step, u8),
    {
        let total = batch.total_weight();
        let mut completed = 0u64;
        let mut last = 0u8;

        info!(files = batch.len(), total_weight = total, "batch upload started");

        for item in batch.items() {
            let start = completed;
            let weight = item.weight as u64;

            self.engine
                .upload(&item.payload, &item.path, |p| {
                    let done = start as f64 + p as f64 / 100.0 * weight as f64;
                    last = last.max(percent(done, total));
                    report(item, Step::Sending(p), last);
                })
                .await
                .map_err(|e| {
                    error!(path = %item.path, error = %e, "batch upload aborted");
                    e
                })?;

            completed += weight;
            last = last.max(percent(completed as f64, total));
            report(item, Step::Done, last);
        }

        info!(files = batch.len(), "batch upload finished");
        Ok(())
    }
}

fn percent(done: f64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (done / total as f64 * 100.0).round().clamp(0.0, 100.0) as u8
}

/// The batch upload as a stream of overall progress values. A failed batch
/// ends the stream with its error.
pub fn progress_stream<'a, T, C>(
    uploader: &'a mut Uploader<T, C>,
    batch: &'a UploadBatch,
) -> impl Stream<Item = Result<u8, UploadError>> + 'a
where
    T: Transport,
    C: Clock,
{
    stream! {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let upload = uploader.upload_batch(batch, move |p| {
            let _ = tx.send(p);
        });
        tokio::pin!(upload);

        let res = loop {
            let event = tokio::select! {
                biased;
                Some(p) = rx.recv() => Ok(p),
                r = &mut upload => Err(r),
            };

            match event {
                Ok(p) => yield Ok(p),
                Err(r) => break r,
            }
        };

        while let Ok(p) = rx.try_recv() {
            yield Ok(p);
        }

        if let Err(e) = res {
            yield Err(e);
        }
    }
}
