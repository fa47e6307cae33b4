use std::{collections::HashSet, io::SeekFrom, path::PathBuf};

use anyhow::Context;
use bytes::Bytes;
use tokio::{
    fs,
    io::{AsyncReadExt, AsyncSeekExt},
};

use crate::UploadError;

pub const MIB: u64 = 1024 * 1024;

/// Minimum weight of an audio file.
pub const AUDIO_WEIGHT_FLOOR: u32 = 5;
/// Minimum weight of a video file.
pub const VIDEO_WEIGHT_FLOOR: u32 = 10;

/// Content of a file to upload. File payloads are read one chunk at a time.
#[derive(Debug, Clone)]
pub enum Payload {
    Memory(Bytes),
    File { path: PathBuf, size: u64 },
}

impl Payload {
    pub fn from_bytes(b: impl Into<Bytes>) -> Self {
        Self::Memory(b.into())
    }

    /// Captures the size of the file at `path`. The file must not change
    /// until it has been uploaded.
    pub async fn from_file(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let meta = fs::metadata(&path)
            .await
            .with_context(|| format!("Could not get metadata for file '{}'", path.display()))?;

        if !meta.is_file() {
            anyhow::bail!("'{}' is not a file", path.display());
        }

        Ok(Self::File {
            path,
            size: meta.len(),
        })
    }

    pub fn size(&self) -> u64 {
        match self {
            Self::Memory(b) => b.len() as u64,
            Self::File { size, .. } => *size,
        }
    }

    /// Reads at most `len` bytes starting at `offset`.
    pub async fn read_chunk(&self, offset: u64, len: u64) -> Result<Bytes, UploadError> {
        let end = self.size().min(offset.saturating_add(len));
        if offset >= end {
            return Ok(Bytes::new());
        }

        match self {
            Self::Memory(b) => Ok(b.slice(offset as usize..end as usize)),
            Self::File { path, .. } => {
                let mut file = fs::File::open(path).await?;
                file.seek(SeekFrom::Start(offset)).await?;

                let mut buf = vec![0u8; (end - offset) as usize];
                file.read_exact(&mut buf).await?;
                Ok(buf.into())
            }
        }
    }
}

/// Weight of a media file: its size in whole MiB, never less than `floor`.
pub fn size_weight(size: u64, floor: u32) -> u32 {
    let mib = (size + MIB - 1) / MIB;
    (mib.min(u32::MAX as u64) as u32).max(floor)
}

/// A file and where it goes.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub payload: Payload,
    pub path: String,
    pub weight: u32,
    pub label: String,
}

impl UploadItem {
    pub fn new(payload: Payload, path: impl Into<String>) -> Self {
        let path = path.into();
        let label = path.rsplit('/').next().unwrap_or_default().to_string();

        Self {
            payload,
            path,
            weight: 1,
            label,
        }
    }

    /// Weights below 1 are raised to 1.
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight.max(1);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Items in upload order. Destination paths are unique.
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    items: Vec<UploadItem>,
    paths: HashSet<String>,
}

impl UploadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: UploadItem) -> Result<(), UploadError> {
        if !self.paths.insert(item.path.clone()) {
            return Err(UploadError::InvalidBatch(format!(
                "destination '{}' appears more than once",
                item.path
            )));
        }

        self.items.push(item);
        Ok(())
    }

    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_weight(&self) -> u64 {
        self.items.iter().map(|i| i.weight as u64).sum()
    }
}

impl TryFrom<Vec<UploadItem>> for UploadBatch {
    type Error = UploadError;

    fn try_from(items: Vec<UploadItem>) -> Result<Self, Self::Error> {
        let mut batch = Self::new();
        for i in items {
            batch.push(i)?;
        }
        Ok(batch)
    }
}
