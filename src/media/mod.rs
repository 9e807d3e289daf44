//! Staging of listing media before submission: one showcase photo, a
//! gallery, videos and an optional expertise report. Every staged file owns
//! a preview handle for exactly as long as it is staged.

pub mod preview;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub use preview::{BlobPreviews, PreviewBackend, PreviewHandle};

pub const MB: u64 = 1024 * 1024;
pub const MAX_PHOTOS: usize = 15;
pub const MAX_VIDEOS: usize = 3;
pub const REPORT_MAX_BYTES: u64 = 25 * MB;
const REPORT_MIME: &str = "application/pdf";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("at most {max} photos can be uploaded ({current} staged, {adding} selected)")]
    TooManyPhotos {
        current: usize,
        adding: usize,
        max: usize,
    },
    #[error("at most {max} videos can be uploaded ({current} staged, {adding} selected)")]
    TooManyVideos {
        current: usize,
        adding: usize,
        max: usize,
    },
    #[error("video files cannot exceed {limit_mb}MB. Oversized files: {}", files.join(", "))]
    VideoTooLarge { files: Vec<String>, limit_mb: u64 },
    #[error("only video files can be uploaded. Invalid files: {}", files.join(", "))]
    NotAVideo { files: Vec<String> },
    #[error("only PDF files can be uploaded ({file})")]
    NotAPdf { file: String },
    #[error("file size can be at most {limit_mb} MB ({file})")]
    ReportTooLarge { file: String, limit_mb: u64 },
    #[error("cannot read {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

/// A user-selected file. Path-backed files are only read at submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub name: String,
    pub mime: String,
    pub size: u64,
    pub source: MediaSource,
}

impl MediaFile {
    pub fn from_bytes(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            size: bytes.len() as u64,
            source: MediaSource::Bytes(bytes),
        }
    }

    /// Stats `path` and guesses the MIME type from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, MediaError> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|err| MediaError::Unreadable {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            mime: mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
            size: meta.len(),
            source: MediaSource::Path(path.to_path_buf()),
        })
    }

    pub async fn read(&self) -> Result<Vec<u8>, MediaError> {
        match &self.source {
            MediaSource::Bytes(bytes) => Ok(bytes.clone()),
            MediaSource::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|err| MediaError::Unreadable {
                        path: path.display().to_string(),
                        reason: err.to_string(),
                    })
            }
        }
    }
}

#[derive(Debug)]
pub struct StagedMedia {
    file: MediaFile,
    preview: PreviewHandle,
}

impl StagedMedia {
    pub fn file(&self) -> &MediaFile {
        &self.file
    }

    pub fn preview_url(&self) -> &str {
        self.preview.url()
    }
}

pub struct MediaStager {
    backend: Arc<dyn PreviewBackend>,
    video_limit_bytes: u64,
    showcase: Option<StagedMedia>,
    photos: Vec<StagedMedia>,
    videos: Vec<StagedMedia>,
    report: Option<StagedMedia>,
}

impl MediaStager {
    pub fn new(backend: Arc<dyn PreviewBackend>, video_limit_bytes: u64) -> Self {
        Self {
            backend,
            video_limit_bytes,
            showcase: None,
            photos: Vec::new(),
            videos: Vec::new(),
            report: None,
        }
    }

    pub fn showcase(&self) -> Option<&StagedMedia> {
        self.showcase.as_ref()
    }

    pub fn photos(&self) -> &[StagedMedia] {
        &self.photos
    }

    pub fn videos(&self) -> &[StagedMedia] {
        &self.videos
    }

    pub fn report(&self) -> Option<&StagedMedia> {
        self.report.as_ref()
    }

    pub fn has_showcase(&self) -> bool {
        self.showcase.is_some()
    }

    /// Showcase, gallery and video items together; the report is not counted.
    pub fn media_count(&self) -> usize {
        usize::from(self.showcase.is_some()) + self.photos.len() + self.videos.len()
    }

    pub fn set_showcase(&mut self, file: MediaFile) -> &str {
        // release the previous preview before issuing the new one
        self.showcase = None;
        let staged = self.stage(file);
        self.showcase.insert(staged).preview_url()
    }

    pub fn clear_showcase(&mut self) {
        self.showcase = None;
    }

    /// Adds the whole batch or nothing.
    pub fn add_photos(&mut self, files: Vec<MediaFile>) -> Result<(), MediaError> {
        if self.photos.len() + files.len() > MAX_PHOTOS {
            return Err(MediaError::TooManyPhotos {
                current: self.photos.len(),
                adding: files.len(),
                max: MAX_PHOTOS,
            });
        }
        for file in files {
            let staged = self.stage(file);
            self.photos.push(staged);
        }
        Ok(())
    }

    pub fn remove_photo(&mut self, index: usize) -> bool {
        if index >= self.photos.len() {
            return false;
        }
        self.photos.remove(index);
        true
    }

    /// Checks count, then size, then type across the whole batch; the first
    /// failing check rejects it.
    pub fn add_videos(&mut self, files: Vec<MediaFile>) -> Result<(), MediaError> {
        if self.videos.len() + files.len() > MAX_VIDEOS {
            return Err(MediaError::TooManyVideos {
                current: self.videos.len(),
                adding: files.len(),
                max: MAX_VIDEOS,
            });
        }
        let oversized = names_where(&files, |f| f.size > self.video_limit_bytes);
        if !oversized.is_empty() {
            return Err(MediaError::VideoTooLarge {
                files: oversized,
                limit_mb: self.video_limit_bytes / MB,
            });
        }
        let invalid = names_where(&files, |f| !f.mime.starts_with("video/"));
        if !invalid.is_empty() {
            return Err(MediaError::NotAVideo { files: invalid });
        }
        for file in files {
            let staged = self.stage(file);
            self.videos.push(staged);
        }
        Ok(())
    }

    pub fn remove_video(&mut self, index: usize) -> bool {
        if index >= self.videos.len() {
            return false;
        }
        self.videos.remove(index);
        true
    }

    pub fn set_report(&mut self, file: MediaFile) -> Result<&str, MediaError> {
        if file.mime != REPORT_MIME {
            return Err(MediaError::NotAPdf { file: file.name });
        }
        if file.size > REPORT_MAX_BYTES {
            return Err(MediaError::ReportTooLarge {
                file: file.name,
                limit_mb: REPORT_MAX_BYTES / MB,
            });
        }
        self.report = None;
        let staged = self.stage(file);
        Ok(self.report.insert(staged).preview_url())
    }

    pub fn remove_report(&mut self) {
        self.report = None;
    }

    /// Drops every staged file and its preview.
    pub fn clear(&mut self) {
        self.showcase = None;
        self.photos.clear();
        self.videos.clear();
        self.report = None;
    }

    fn stage(&self, file: MediaFile) -> StagedMedia {
        let preview = PreviewHandle::issue(&self.backend, &file);
        debug!(
            target = "trucksbus.media",
            name = %file.name,
            size = file.size,
            url = preview.url(),
            "staged"
        );
        StagedMedia { file, preview }
    }
}

fn names_where(files: &[MediaFile], pred: impl Fn(&MediaFile) -> bool) -> Vec<String> {
    files
        .iter()
        .filter(|f| pred(f))
        .map(|f| f.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stager(limit: u64) -> (MediaStager, Arc<BlobPreviews>) {
        let blobs = Arc::new(BlobPreviews::new());
        (MediaStager::new(blobs.clone(), limit), blobs)
    }

    fn photo(i: usize) -> MediaFile {
        MediaFile::from_bytes(format!("photo-{i}.jpg"), "image/jpeg", vec![0; 8])
    }

    fn video(name: &str, mime: &str, size: u64) -> MediaFile {
        MediaFile {
            size,
            ..MediaFile::from_bytes(name, mime, Vec::new())
        }
    }

    #[test]
    fn gallery_batch_over_limit_is_rejected_whole() {
        let (mut stager, blobs) = stager(50 * MB);
        stager.add_photos((0..10).map(photo).collect()).unwrap();

        let err = stager.add_photos((10..16).map(photo).collect()).unwrap_err();
        assert!(matches!(err, MediaError::TooManyPhotos { current: 10, adding: 6, .. }));
        assert_eq!(stager.photos().len(), 10);
        assert_eq!(blobs.issued(), 10);

        stager.add_photos((10..15).map(photo).collect()).unwrap();
        assert_eq!(stager.photos().len(), MAX_PHOTOS);
    }

    #[test]
    fn every_issued_preview_is_revoked_once() {
        let (mut stager, blobs) = stager(50 * MB);
        stager.set_showcase(photo(0));
        stager.set_showcase(photo(1));
        stager.add_photos((2..6).map(photo).collect()).unwrap();
        assert!(stager.remove_photo(1));
        assert!(!stager.remove_photo(10));
        stager
            .add_videos(vec![video("a.mp4", "video/mp4", MB)])
            .unwrap();
        stager
            .set_report(MediaFile::from_bytes("r.pdf", "application/pdf", vec![1]))
            .unwrap();

        // showcase x2, photos x4, video, report
        assert_eq!(blobs.issued(), 8);
        assert_eq!(blobs.revoked(), 2);
        stager.clear();
        assert_eq!(blobs.revoked(), 8);
        assert_eq!(blobs.live(), 0);
        assert_eq!(blobs.stray_revokes(), 0);
    }

    #[test]
    fn removing_each_video_revokes_its_preview_once() {
        let (mut stager, blobs) = stager(50 * MB);
        stager
            .add_videos(vec![
                video("a.mp4", "video/mp4", MB),
                video("b.mp4", "video/mp4", MB),
                video("c.mp4", "video/mp4", MB),
            ])
            .unwrap();
        let urls: Vec<String> = stager
            .videos()
            .iter()
            .map(|v| v.preview_url().to_string())
            .collect();

        while stager.remove_video(0) {}
        assert!(stager.videos().is_empty());
        assert!(urls.iter().all(|url| !blobs.is_live(url)));
        assert_eq!(blobs.issued(), MAX_VIDEOS);
        assert_eq!(blobs.revoked(), MAX_VIDEOS);
        assert_eq!(blobs.stray_revokes(), 0);

        drop(stager);
        assert_eq!(blobs.revoked(), MAX_VIDEOS);
    }

    #[test]
    fn dropping_the_stager_revokes_remaining_previews() {
        let (mut stager, blobs) = stager(50 * MB);
        stager.add_photos((0..3).map(photo).collect()).unwrap();
        drop(stager);
        assert_eq!(blobs.live(), 0);
        assert_eq!(blobs.revoked(), 3);
    }

    #[test]
    fn replacing_showcase_revokes_previous_url() {
        let (mut stager, blobs) = stager(50 * MB);
        let first = stager.set_showcase(photo(0)).to_string();
        let second = stager.set_showcase(photo(1)).to_string();
        assert_ne!(first, second);
        assert!(!blobs.is_live(&first));
        assert!(blobs.is_live(&second));
    }

    #[test]
    fn video_checks_run_count_then_size_then_type() {
        let (mut stager, _) = stager(50 * MB);
        let four: Vec<MediaFile> = (0..4)
            .map(|i| video(&format!("{i}.txt"), "text/plain", 60 * MB))
            .collect();
        assert!(matches!(
            stager.add_videos(four).unwrap_err(),
            MediaError::TooManyVideos { .. }
        ));

        let err = stager
            .add_videos(vec![
                video("big.mp4", "video/mp4", 51 * MB),
                video("notes.txt", "text/plain", MB),
            ])
            .unwrap_err();
        assert_eq!(
            err,
            MediaError::VideoTooLarge {
                files: vec!["big.mp4".into()],
                limit_mb: 50
            }
        );
        assert!(err.to_string().contains("big.mp4"));

        let err = stager
            .add_videos(vec![
                video("ok.mp4", "video/mp4", MB),
                video("notes.txt", "text/plain", MB),
            ])
            .unwrap_err();
        assert_eq!(
            err,
            MediaError::NotAVideo {
                files: vec!["notes.txt".into()]
            }
        );
        assert!(stager.videos().is_empty());
    }

    #[test]
    fn heavy_vehicle_limit_admits_larger_videos() {
        let (mut stager, _) = stager(100 * MB);
        stager
            .add_videos(vec![video("walkaround.mp4", "video/mp4", 80 * MB)])
            .unwrap();
        assert_eq!(stager.videos().len(), 1);
    }

    #[test]
    fn report_must_be_small_pdf() {
        let (mut stager, _) = stager(50 * MB);
        assert!(matches!(
            stager.set_report(MediaFile::from_bytes("r.docx", "application/msword", vec![1])),
            Err(MediaError::NotAPdf { .. })
        ));
        let big = MediaFile {
            size: 26 * MB,
            ..MediaFile::from_bytes("r.pdf", "application/pdf", Vec::new())
        };
        assert!(matches!(
            stager.set_report(big),
            Err(MediaError::ReportTooLarge { limit_mb: 25, .. })
        ));
        assert!(stager.report().is_none());
    }

    #[test]
    fn media_count_excludes_report() {
        let (mut stager, _) = stager(50 * MB);
        stager.set_showcase(photo(0));
        stager.add_photos(vec![photo(1), photo(2)]).unwrap();
        stager
            .set_report(MediaFile::from_bytes("r.pdf", "application/pdf", vec![1]))
            .unwrap();
        assert_eq!(stager.media_count(), 3);
    }

    #[tokio::test]
    async fn path_backed_file_guesses_mime_and_reads_lazily() {
        let path = std::env::temp_dir().join(format!("trucksbus-{}.mp4", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"0123456789").await.unwrap();

        let file = MediaFile::from_path(&path).await.unwrap();
        assert_eq!(file.mime, "video/mp4");
        assert_eq!(file.size, 10);
        assert_eq!(file.read().await.unwrap(), b"0123456789".to_vec());

        tokio::fs::remove_file(&path).await.unwrap();
        assert!(matches!(file.read().await, Err(MediaError::Unreadable { .. })));
    }
}
