//! Destination paths and metadata files for artist submissions.
//!
//! Every submission lands under `/{root}/{artist}/{title}/`, videos under
//! `/{root}/{artist}/Videos/{title}/`. Metadata is written as pretty JSON next
//! to the media files.

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{
    types::{
        size_weight, Payload, UploadBatch, UploadItem, AUDIO_WEIGHT_FLOOR, VIDEO_WEIGHT_FLOOR,
    },
    UploadError,
};

#[derive(Debug, Clone, Default)]
pub struct CreditsInput {
    pub songwriter: String,
    pub producer: String,
    pub engineer: String,
    pub additional: String,
}

impl CreditsInput {
    fn entries(&self) -> Vec<Credit<'_>> {
        [
            ("songwriter", &self.songwriter),
            ("producer", &self.producer),
            ("engineer", &self.engineer),
            ("additional", &self.additional),
        ]
        .into_iter()
        .filter(|(_, name)| !name.trim().is_empty())
        .map(|(role, name)| Credit {
            name: name.as_str(),
            role,
        })
        .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Single {
    pub title: String,
    pub genre: String,
    pub credits: CreditsInput,
    pub artwork: Option<Payload>,
    pub lyrics: Option<Payload>,
    pub audio: Option<Payload>,
}

#[derive(Debug, Clone, Default)]
pub struct Track {
    pub title: String,
    pub genre: String,
    pub credits: CreditsInput,
    pub lyrics: Option<Payload>,
    pub audio: Option<Payload>,
}

#[derive(Debug, Clone, Default)]
pub struct Album {
    pub title: String,
    pub artwork: Option<Payload>,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Default)]
pub struct Video {
    pub title: String,
    pub video: Option<Payload>,
    pub thumbnail: Option<Payload>,
}

#[derive(Debug, Clone, Default)]
pub struct Artist {
    pub name: String,
    pub bio: String,
    pub support_link: Option<String>,
    pub picture: Option<Payload>,
}

#[derive(Debug, Clone)]
pub enum Release {
    Single(Single),
    Album(Album),
    Video(Video),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Info<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    genre: Option<&'a str>,
    release_date: NaiveDate,
}

#[derive(Serialize)]
struct Credit<'a> {
    name: &'a str,
    role: &'a str,
}

#[derive(Serialize)]
struct Credits<'a> {
    song: &'a str,
    credits: Vec<Credit<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArtistInfo<'a> {
    artist_name: &'a str,
    bio: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    support_link: Option<&'a str>,
    created_at: DateTime<Utc>,
}

/// `"My new Song!"` becomes `"myNewSong"`.
pub fn camel_case(s: &str) -> String {
    let cleaned: String = s
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .enumerate()
        .map(|(i, w)| match i {
            0 => w.to_string(),
            _ => {
                let mut c = w.chars();
                match c.next() {
                    Some(f) => f.to_ascii_uppercase().to_string() + c.as_str(),
                    None => String::new(),
                }
            }
        })
        .collect()
}

fn json<T: Serialize>(value: &T) -> Result<Payload, UploadError> {
    let v = serde_json::to_vec_pretty(value)?;
    Ok(Payload::Memory(Bytes::from(v)))
}

/// Builds upload batches for artist submissions.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    root: String,
    now: DateTime<Utc>,
}

impl ManifestBuilder {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            now: Utc::now(),
        }
    }

    /// Time used for release dates and creation timestamps.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn artist_dir(&self, artist: &str) -> String {
        format!("/{}/{}", self.root, artist)
    }

    pub fn release_dir(&self, artist: &str, title: &str) -> String {
        format!("/{}/{}/{}", self.root, artist, title)
    }

    pub fn video_dir(&self, artist: &str, title: &str) -> String {
        format!("/{}/{}/Videos/{}", self.root, artist, title)
    }

    /// Artist profile on its own: `artist-info.json` and `{artist}.jpg`.
    pub fn artist_profile(&self, artist: &Artist) -> Result<UploadBatch, UploadError> {
        let mut batch = UploadBatch::new();
        self.push_artist(&mut batch, artist, "")?;
        Ok(batch)
    }

    /// A new artist with their first release.
    pub fn new_artist(
        &self,
        artist: &Artist,
        release: &Release,
    ) -> Result<UploadBatch, UploadError> {
        let mut batch = UploadBatch::new();
        self.push_artist(&mut batch, artist, "-profile")?;

        match release {
            Release::Single(s) => self.push_single(&mut batch, &artist.name, s)?,
            Release::Album(a) => self.push_album(&mut batch, &artist.name, a)?,
            Release::Video(v) => self.push_video(&mut batch, &artist.name, v)?,
        }
        Ok(batch)
    }

    pub fn single(&self, artist: &str, single: &Single) -> Result<UploadBatch, UploadError> {
        let mut batch = UploadBatch::new();
        self.push_single(&mut batch, artist, single)?;
        Ok(batch)
    }

    pub fn album(&self, artist: &str, album: &Album) -> Result<UploadBatch, UploadError> {
        let mut batch = UploadBatch::new();
        self.push_album(&mut batch, artist, album)?;
        Ok(batch)
    }

    pub fn video(&self, artist: &str, video: &Video) -> Result<UploadBatch, UploadError> {
        let mut batch = UploadBatch::new();
        self.push_video(&mut batch, artist, video)?;
        Ok(batch)
    }

    fn release_date(&self) -> NaiveDate {
        self.now.date_naive()
    }

    fn push_artist(
        &self,
        batch: &mut UploadBatch,
        artist: &Artist,
        picture_suffix: &str,
    ) -> Result<(), UploadError> {
        let dir = self.artist_dir(&artist.name);

        let info = json(&ArtistInfo {
            artist_name: &artist.name,
            bio: &artist.bio,
            support_link: artist.support_link.as_deref(),
            created_at: self.now,
        })?;
        batch.push(
            UploadItem::new(info, format!("{dir}/artist-info.json")).with_label("artist info"),
        )?;

        if let Some(p) = &artist.picture {
            let name = camel_case(&artist.name);
            batch.push(
                UploadItem::new(p.clone(), format!("{dir}/{name}{picture_suffix}.jpg"))
                    .with_label("profile picture"),
            )?;
        }
        Ok(())
    }

    fn push_song_meta(
        &self,
        batch: &mut UploadBatch,
        dir: &str,
        title: &str,
        genre: &str,
        credits: &CreditsInput,
        label_prefix: Option<&str>,
    ) -> Result<(), UploadError> {
        let (info_label, credits_label) = match label_prefix {
            Some(p) => (format!("{p} info"), format!("{p} credits")),
            None => ("song info".to_string(), "credits".to_string()),
        };

        let info = json(&Info {
            title,
            genre: Some(genre),
            release_date: self.release_date(),
        })?;
        batch.push(
            UploadItem::new(info, format!("{dir}/{title} info.json")).with_label(info_label),
        )?;

        let credits = credits.entries();
        if !credits.is_empty() {
            let credits = json(&Credits {
                song: title,
                credits,
            })?;
            batch.push(
                UploadItem::new(credits, format!("{dir}/{title} credits.json"))
                    .with_label(credits_label),
            )?;
        }
        Ok(())
    }

    fn push_audio(
        &self,
        batch: &mut UploadBatch,
        dir: &str,
        title: &str,
        audio: &Payload,
        label: String,
    ) -> Result<(), UploadError> {
        let weight = size_weight(audio.size(), AUDIO_WEIGHT_FLOOR);
        let path = format!("{dir}/{}.mp3", camel_case(title));

        batch.push(
            UploadItem::new(audio.clone(), path)
                .with_weight(weight)
                .with_label(label),
        )
    }

    fn push_single(
        &self,
        batch: &mut UploadBatch,
        artist: &str,
        single: &Single,
    ) -> Result<(), UploadError> {
        let dir = self.release_dir(artist, &single.title);

        self.push_song_meta(batch, &dir, &single.title, &single.genre, &single.credits, None)?;

        if let Some(p) = &single.artwork {
            batch.push(
                UploadItem::new(p.clone(), format!("{dir}/artwork.jpg")).with_label("artwork"),
            )?;
        }
        if let Some(p) = &single.lyrics {
            batch.push(
                UploadItem::new(p.clone(), format!("{dir}/lyrics.json")).with_label("lyrics"),
            )?;
        }
        if let Some(p) = &single.audio {
            self.push_audio(batch, &dir, &single.title, p, "audio file".into())?;
        }
        Ok(())
    }

    fn push_album(
        &self,
        batch: &mut UploadBatch,
        artist: &str,
        album: &Album,
    ) -> Result<(), UploadError> {
        let dir = self.release_dir(artist, &album.title);

        if let Some(p) = &album.artwork {
            batch.push(
                UploadItem::new(p.clone(), format!("{dir}/album-artwork.jpg"))
                    .with_label("album artwork"),
            )?;
        }

        for track in album.tracks.iter().filter(|t| !t.title.trim().is_empty()) {
            let title = track.title.as_str();

            self.push_song_meta(batch, &dir, title, &track.genre, &track.credits, Some(title))?;

            if let Some(p) = &track.lyrics {
                batch.push(
                    UploadItem::new(p.clone(), format!("{dir}/{title} lyrics.json"))
                        .with_label(format!("{title} lyrics")),
                )?;
            }
            if let Some(p) = &track.audio {
                self.push_audio(batch, &dir, title, p, format!("{title} audio"))?;
            }
        }
        Ok(())
    }

    fn push_video(
        &self,
        batch: &mut UploadBatch,
        artist: &str,
        video: &Video,
    ) -> Result<(), UploadError> {
        let dir = self.video_dir(artist, &video.title);
        let title = video.title.as_str();
        let name = camel_case(title);

        let info = json(&Info {
            title,
            genre: None,
            release_date: self.release_date(),
        })?;
        batch.push(
            UploadItem::new(info, format!("{dir}/{title} info.json")).with_label("video info"),
        )?;

        if let Some(p) = &video.thumbnail {
            batch.push(
                UploadItem::new(p.clone(), format!("{dir}/{name}.jpg")).with_label("thumbnail"),
            )?;
        }
        if let Some(p) = &video.video {
            let weight = size_weight(p.size(), VIDEO_WEIGHT_FLOOR);
            batch.push(
                UploadItem::new(p.clone(), format!("{dir}/{name}.mp4"))
                    .with_weight(weight)
                    .with_label("video file"),
            )?;
        }
        Ok(())
    }
}
