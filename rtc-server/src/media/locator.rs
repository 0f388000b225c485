//! Media locator
//!
//! Resolves a person's still image and the interaction clip whose duration
//! is closest to the target length. Layout on disk:
//! - `<faces_dir>/<person>/*.jpg`
//! - `<interactions_dir>/<person>/*.mov`
//!
//! Candidates are sorted by file name so ties resolve the same way every time.

use futures::future::join_all;
use rtc_common::config::MediaConfig;
use rtc_common::db::validate_person_id;
use rtc_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::probe::DurationProbe;

/// A resolved media file ready to be served
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub struct MediaLocator {
    faces_dir: PathBuf,
    interactions_dir: PathBuf,
    target_duration_secs: f64,
    video_extensions: Vec<String>,
    image_extensions: Vec<String>,
    probe: Arc<dyn DurationProbe>,
}

impl MediaLocator {
    pub fn new(
        faces_dir: PathBuf,
        interactions_dir: PathBuf,
        config: &MediaConfig,
        probe: Arc<dyn DurationProbe>,
    ) -> Self {
        Self {
            faces_dir,
            interactions_dir,
            target_duration_secs: config.target_duration_secs,
            video_extensions: config.video_extensions.clone(),
            image_extensions: config.image_extensions.clone(),
            probe,
        }
    }

    /// Configured target clip duration in seconds
    pub fn target_duration_secs(&self) -> f64 {
        self.target_duration_secs
    }

    /// First still image of the person in file name order
    pub async fn resolve_still_image(&self, person_id: &str) -> Result<MediaFile> {
        validate_person_id(person_id)?;
        let dir = self.faces_dir.join(person_id);

        let candidates = list_candidates(&dir, &self.image_extensions).await?;
        let path = candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("No images found for {}", person_id)))?;

        read_media(path).await
    }

    /// The clip whose probed duration is nearest `target_secs`
    pub async fn resolve_closest_video(
        &self,
        person_id: &str,
        target_secs: f64,
    ) -> Result<MediaFile> {
        let (path, duration) = self.find_closest_video(person_id, target_secs).await?;
        debug!(
            person = %person_id,
            file = %path.display(),
            duration,
            target = target_secs,
            "Selected closest clip"
        );
        read_media(path).await
    }

    /// Probe every candidate clip concurrently and pick the nearest duration
    ///
    /// Files whose probe fails are skipped. NotFound when no candidate survives.
    pub async fn find_closest_video(
        &self,
        person_id: &str,
        target_secs: f64,
    ) -> Result<(PathBuf, f64)> {
        validate_person_id(person_id)?;
        let dir = self.interactions_dir.join(person_id);
        let candidates = list_candidates(&dir, &self.video_extensions).await?;

        let probes = candidates.iter().map(|path| self.probe.probe_duration(path));
        let results = join_all(probes).await;

        let mut durations = Vec::with_capacity(candidates.len());
        for (path, result) in candidates.into_iter().zip(results) {
            match result {
                Ok(seconds) => durations.push((path, seconds)),
                Err(e) => warn!(
                    person = %person_id,
                    file = %path.display(),
                    error = %e,
                    "Skipping clip with unreadable duration"
                ),
            }
        }

        select_closest(durations, target_secs)
            .ok_or_else(|| Error::NotFound(format!("No videos found for {}", person_id)))
    }

    /// Names of persons that have at least one clip on disk, sorted
    pub async fn list_clip_owners(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.interactions_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut owners = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_person_id(&name).is_err() {
                debug!(dir = %entry.path().display(), "Ignoring clip directory with invalid name");
                continue;
            }
            if !list_candidates(&entry.path(), &self.video_extensions).await?.is_empty() {
                owners.push(name);
            }
        }

        owners.sort();
        Ok(owners)
    }

    /// Remove a person's clip directory once its clips have been rated
    pub async fn purge_clips(&self, person_id: &str) -> Result<()> {
        validate_person_id(person_id)?;
        let dir = self.interactions_dir.join(person_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!(person = %person_id, dir = %dir.display(), "Purged rated clips");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Pick the candidate minimising |duration - target|
///
/// The first candidate wins a tie, so callers control tie-breaking by order.
pub fn select_closest<I>(durations: I, target_secs: f64) -> Option<(PathBuf, f64)>
where
    I: IntoIterator<Item = (PathBuf, f64)>,
{
    let mut best: Option<(PathBuf, f64)> = None;
    let mut best_diff = f64::INFINITY;

    for (path, duration) in durations {
        let diff = (duration - target_secs).abs();
        if diff < best_diff {
            best_diff = diff;
            best = Some((path, duration));
        }
    }
    best
}

/// Media content type by file extension
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "mov" => "video/quicktime",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// Regular files in `dir` with an accepted extension, sorted by name
async fn list_candidates(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound(format!("No media directory: {}", dir.display())));
        }
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if has_extension(&path, extensions) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

async fn read_media(path: PathBuf) -> Result<MediaFile> {
    let bytes = tokio::fs::read(&path).await?;
    Ok(MediaFile {
        content_type: content_type_for(&path),
        path,
        bytes,
    })
}
