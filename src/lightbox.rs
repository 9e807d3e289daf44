//! Full-screen video viewer over the staged video list.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    ArrowLeft,
    ArrowRight,
    Other,
}

/// Somewhere key events come from. Binding returns a guard; the host stops
/// routing keys to the lightbox once the guard is dropped.
pub trait KeyboardHost: Send + Sync {
    fn bind(&self) -> KeyBinding;
}

pub struct KeyBinding {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl KeyBinding {
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for KeyBinding {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// Host with no real input source that tracks how many bindings are live.
#[derive(Debug, Default)]
pub struct DetachedKeyboard {
    live: Arc<AtomicUsize>,
}

impl DetachedKeyboard {
    pub fn live_bindings(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl KeyboardHost for DetachedKeyboard {
    fn bind(&self) -> KeyBinding {
        self.live.fetch_add(1, Ordering::SeqCst);
        let live = self.live.clone();
        KeyBinding::new(move || {
            live.fetch_sub(1, Ordering::SeqCst);
        })
    }
}

pub struct VideoLightbox {
    host: Arc<dyn KeyboardHost>,
    index: usize,
    count: usize,
    binding: Option<KeyBinding>,
}

impl VideoLightbox {
    pub fn new(host: Arc<dyn KeyboardHost>) -> Self {
        Self {
            host,
            index: 0,
            count: 0,
            binding: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.binding.is_some()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn open(&mut self, index: usize, count: usize) {
        self.count = count;
        if count == 0 {
            return;
        }
        self.index = index.min(count - 1);
        if self.binding.is_none() {
            self.binding = Some(self.host.bind());
        }
    }

    pub fn close(&mut self) {
        self.binding = None;
    }

    pub fn prev(&mut self) {
        if self.is_open() && self.index > 0 {
            self.index -= 1;
        }
    }

    pub fn next(&mut self) {
        if self.is_open() && self.index + 1 < self.count {
            self.index += 1;
        }
    }

    /// Routes a key while open; returns whether it was consumed.
    pub fn handle_key(&mut self, key: Key) -> bool {
        if !self.is_open() {
            return false;
        }
        match key {
            Key::Escape => self.close(),
            Key::ArrowLeft => self.prev(),
            Key::ArrowRight => self.next(),
            Key::Other => return false,
        }
        true
    }

    /// Follows the staged video count after removals.
    pub fn sync(&mut self, count: usize) {
        self.count = count;
        if count == 0 {
            self.close();
            self.index = 0;
        } else if self.index >= count {
            self.index = count - 1;
        }
    }
}
