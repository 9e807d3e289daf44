use crate::media::MediaFile;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Issues and revokes preview URLs for staged files.
pub trait PreviewBackend: Send + Sync {
    fn create(&self, file: &MediaFile) -> String;
    fn revoke(&self, url: &str);
}

/// A live preview URL. Dropping the handle revokes it.
pub struct PreviewHandle {
    url: String,
    backend: Arc<dyn PreviewBackend>,
}

impl PreviewHandle {
    pub fn issue(backend: &Arc<dyn PreviewBackend>, file: &MediaFile) -> Self {
        Self {
            url: backend.create(file),
            backend: backend.clone(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PreviewHandle").field(&self.url).finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.backend.revoke(&self.url);
    }
}

/// In-process backend handing out `blob:<uuid>` URLs.
#[derive(Debug, Default)]
pub struct BlobPreviews {
    state: Mutex<BlobState>,
}

#[derive(Debug, Default)]
struct BlobState {
    live: HashSet<String>,
    issued: usize,
    revoked: usize,
    /// Revokes of URLs that were never issued or are already revoked.
    stray: usize,
}

impl BlobPreviews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> usize {
        self.with_state(|s| s.live.len())
    }

    pub fn issued(&self) -> usize {
        self.with_state(|s| s.issued)
    }

    /// Every `revoke` call, including stray ones.
    pub fn revoked(&self) -> usize {
        self.with_state(|s| s.revoked)
    }

    pub fn stray_revokes(&self) -> usize {
        self.with_state(|s| s.stray)
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.with_state(|s| s.live.contains(url))
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut BlobState) -> T) -> T {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

impl PreviewBackend for BlobPreviews {
    fn create(&self, _file: &MediaFile) -> String {
        let url = format!("blob:{}", Uuid::new_v4());
        self.with_state(|s| {
            s.issued += 1;
            s.live.insert(url.clone());
        });
        url
    }

    fn revoke(&self, url: &str) {
        self.with_state(|s| {
            s.revoked += 1;
            if !s.live.remove(url) {
                s.stray += 1;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_handle_revokes_exactly_once() {
        let blobs = Arc::new(BlobPreviews::new());
        let backend: Arc<dyn PreviewBackend> = blobs.clone();
        let file = MediaFile::from_bytes("a.jpg", "image/jpeg", vec![1, 2, 3]);

        let handle = PreviewHandle::issue(&backend, &file);
        assert!(handle.url().starts_with("blob:"));
        assert!(blobs.is_live(handle.url()));
        drop(handle);

        assert_eq!(blobs.issued(), 1);
        assert_eq!(blobs.revoked(), 1);
        assert_eq!(blobs.live(), 0);
        assert_eq!(blobs.stray_revokes(), 0);
    }

    #[test]
    fn repeated_or_unknown_revokes_are_counted_as_stray() {
        let blobs = BlobPreviews::new();
        let url = blobs.create(&MediaFile::from_bytes("a.jpg", "image/jpeg", vec![0]));
        blobs.revoke(&url);
        blobs.revoke(&url);
        blobs.revoke("blob:never-issued");
        assert_eq!(blobs.revoked(), 3);
        assert_eq!(blobs.stray_revokes(), 2);
        assert_eq!(blobs.live(), 0);
    }
}
