//! Scoped release of the frame source.

use crate::capture::FrameSource;
use std::ops::{Deref, DerefMut};

/// Borrows a frame source for the duration of a run and releases its
/// preview (and any recording in progress) when dropped, whichever way the
/// run ends.
pub struct PreviewGuard<'a, S: FrameSource + ?Sized> {
    source: &'a mut S,
}

impl<'a, S: FrameSource + ?Sized> PreviewGuard<'a, S> {
    /// Guards `source` until the guard is dropped.
    pub fn new(source: &'a mut S) -> Self {
        Self { source }
    }
}

impl<S: FrameSource + ?Sized> Deref for PreviewGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.source
    }
}

impl<S: FrameSource + ?Sized> DerefMut for PreviewGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.source
    }
}

impl<S: FrameSource + ?Sized> Drop for PreviewGuard<'_, S> {
    fn drop(&mut self) {
        if self.source.is_recording() {
            tracing::warn!("Run ended during a recording; stopping it");
        }
        self.source.release_preview();
    }
}
