//! Compression unit - owns one tile's image across its raw/compressed states
//!
//! The unit is shared between the owning thread (painter, controller) and the
//! background codec worker. Two primitives keep that safe: an atomic in-use
//! latch the painter holds while drawing, and an internal mutex around the
//! buffers. Destructive operations (discard, destroy) must win the latch
//! first and retry with a fixed backoff when they lose it; they never park
//! the caller indefinitely. Reading a buffer without the latch is a bug.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{trace, warn};

use crate::codec::{self, CodecFault, RawBitmap};
use crate::geometry::Size;

/// Attempts a destructive op makes to win the latch before giving up.
pub(crate) const LOCK_RETRY_ATTEMPTS: u32 = 10;
/// Fixed backoff between latch attempts.
pub(crate) const LOCK_RETRY_BACKOFF: Duration = Duration::from_millis(2);

#[derive(Default)]
struct Buffers {
    raw: Option<RawBitmap>,
    color: Option<Vec<u8>>,
    alpha: Option<Vec<u8>>,
}

impl Buffers {
    fn has_encoding(&self) -> bool {
        self.color.is_some() && self.alpha.is_some()
    }
}

/// One tile's image data, raw and/or compressed.
pub struct CompressionUnit {
    in_use: AtomicBool,
    buffers: Mutex<Buffers>,
    size: Size,
}

impl CompressionUnit {
    /// Create a unit holding a freshly received raw bitmap.
    #[must_use]
    pub fn new(bitmap: RawBitmap) -> Self {
        let size = bitmap.size();
        Self {
            in_use: AtomicBool::new(false),
            buffers: Mutex::new(Buffers {
                raw: Some(bitmap),
                color: None,
                alpha: None,
            }),
            size,
        }
    }

    /// Tile pixel dimensions; fixed for the unit's lifetime.
    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    /// Non-blocking acquire of the in-use latch. Fails if already held.
    pub fn lock(&self) -> bool {
        self.in_use
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Release the in-use latch. Fails if it was not held.
    pub fn unlock(&self) -> bool {
        self.in_use
            .compare_exchange(true, false, Ordering::Release, Ordering::Relaxed)
            .is_ok()
    }

    #[must_use]
    pub fn has_raw(&self) -> bool {
        self.guard().raw.is_some()
    }

    #[must_use]
    pub fn has_encoding(&self) -> bool {
        self.guard().has_encoding()
    }

    /// Run `f` against the raw buffer, if present. The caller is expected to
    /// hold the latch for the duration of any draw built on the result.
    pub fn with_raw<R>(&self, f: impl FnOnce(&RawBitmap) -> R) -> Option<R> {
        self.guard().raw.as_ref().map(f)
    }

    /// Compress the raw buffer: alpha plane first (lossless), then the color
    /// plane (lossy). Runs on the background queue. When `keep_raw` is false
    /// the raw buffer is discarded right after both encodings exist.
    pub fn compress(&self, keep_raw: bool, jpeg_quality: u8) -> Result<(), CodecFault> {
        // Clone the raw buffer out so the owning thread never waits on the
        // mutex for the duration of an encode.
        let Some(raw) = self.guard().raw.clone() else {
            // Nothing to do; already compressed and released.
            return Ok(());
        };
        let alpha = codec::compress_alpha(&raw)?;
        let color = codec::compress_color(&raw, jpeg_quality)?;

        {
            let mut guard = self.guard();
            guard.alpha = Some(alpha);
            guard.color = Some(color);
        }
        trace!("tile {}x{} compressed", self.size.width, self.size.height);

        if !keep_raw {
            self.discard_bitmap();
        }
        Ok(())
    }

    /// Decompress back to a raw buffer. Runs on the background queue. On any
    /// decode failure the raw buffer is left absent; a half-valid image is
    /// never stored.
    pub fn inflate(&self) -> Result<(), CodecFault> {
        let (color, alpha) = {
            let guard = self.guard();
            if guard.raw.is_some() {
                return Ok(());
            }
            match (guard.color.clone(), guard.alpha.clone()) {
                (Some(color), Some(alpha)) => (color, alpha),
                _ => return Err(CodecFault::mismatch("no compressed encoding to inflate")),
            }
        };

        let bitmap = codec::inflate(&color, &alpha, self.size)?;
        debug_assert!(bitmap.is_premultiplied());
        self.guard().raw = Some(bitmap);
        Ok(())
    }

    /// Release the raw buffer, keeping the compressed encodings. A no-op when
    /// no encoding exists: never destroy the only copy of the data. Returns
    /// whether the buffer is gone.
    pub fn discard_bitmap(&self) -> bool {
        if !self.with_latch(|| {
            let mut guard = self.guard();
            if guard.has_encoding() {
                guard.raw = None;
            }
        }) {
            warn!("tile buffer discard lost the latch, will retry on next pass");
            return false;
        }
        !self.has_raw()
    }

    /// Release every buffer. Respects the latch, retrying with backoff.
    pub fn destroy(&self) -> bool {
        self.with_latch(|| {
            let mut guard = self.guard();
            guard.raw = None;
            guard.color = None;
            guard.alpha = None;
        })
    }

    /// Teardown-only destroy that bypasses the latch. In-flight draws no
    /// longer matter once the frame itself is going away.
    pub fn force_destroy(&self) {
        let mut guard = self.guard();
        guard.raw = None;
        guard.color = None;
        guard.alpha = None;
    }

    fn with_latch(&self, op: impl FnOnce()) -> bool {
        for attempt in 0..LOCK_RETRY_ATTEMPTS {
            if self.lock() {
                op();
                self.unlock();
                return true;
            }
            trace!("latch busy, attempt {attempt}");
            std::thread::sleep(LOCK_RETRY_BACKOFF);
        }
        false
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, Buffers> {
        self.buffers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
