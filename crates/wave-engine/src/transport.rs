//! Transport state shared between the engine facade and the CPAL callback.
//!
//! Everything lives in atomics so the real-time callback never takes a lock. The play
//! cursor is a fixed-point frame index ([`CURSOR_ONE`] units per frame) so non-integer
//! rates advance smoothly.
//!
//! A seek made before the track is loaded is parked and applied by [`Transport::mark_loaded`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Fixed-point units per output frame.
pub const CURSOR_ONE: u64 = 1 << 16;

/// Playback rate used when nothing else was requested.
pub const NORMAL_RATE: f32 = 1.0;

/// Empty pending-seek slot (a NaN pattern `seek_secs` never stores).
const NO_SEEK: u64 = u64::MAX;

#[derive(Debug)]
pub struct Transport {
    /// Fixed-point play cursor at the output rate.
    cursor: AtomicU64,
    /// When true the callback outputs silence and does not advance.
    paused: AtomicBool,
    /// Playback rate as `f32` bits.
    rate_bits: AtomicU32,
    /// Track length in output frames.
    total_frames: AtomicU64,
    /// Output sample rate in Hz.
    sample_rate: AtomicU32,
    loaded: AtomicBool,
    /// Seek target in seconds (`f64` bits) requested before the track was loaded.
    pending_seek: AtomicU64,
}

impl Transport {
    pub fn new() -> Self {
        Self {
            cursor: AtomicU64::new(0),
            paused: AtomicBool::new(true),
            rate_bits: AtomicU32::new(NORMAL_RATE.to_bits()),
            total_frames: AtomicU64::new(0),
            sample_rate: AtomicU32::new(0),
            loaded: AtomicBool::new(false),
            pending_seek: AtomicU64::new(NO_SEEK),
        }
    }

    /// Create a shared transport.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Publish the loaded track length. The cursor starts at the pending seek, if any.
    pub fn mark_loaded(&self, total_frames: u64, sample_rate: u32) {
        self.cursor.store(0, Ordering::Relaxed);
        self.total_frames.store(total_frames, Ordering::Relaxed);
        self.sample_rate.store(sample_rate, Ordering::Relaxed);
        self.loaded.store(sample_rate > 0, Ordering::SeqCst);
        // Whoever swaps the slot out applies it: here, or a racing `seek_secs`.
        self.apply_pending_seek();
    }

    /// Forget the loaded track (keeps pause state and rate).
    pub fn clear(&self) {
        self.loaded.store(false, Ordering::SeqCst);
        self.pending_seek.store(NO_SEEK, Ordering::SeqCst);
        self.cursor.store(0, Ordering::Relaxed);
        self.total_frames.store(0, Ordering::Relaxed);
        self.sample_rate.store(0, Ordering::Relaxed);
    }

    fn apply_pending_seek(&self) {
        let bits = self.pending_seek.swap(NO_SEEK, Ordering::SeqCst);
        if bits != NO_SEEK {
            self.store_cursor_secs(f64::from_bits(bits));
        }
    }

    fn store_cursor_secs(&self, secs: f64) {
        let rate = self.sample_rate.load(Ordering::Relaxed);
        let frame = ((secs * rate as f64) as u64).min(self.total_frames());
        self.cursor.store(frame.saturating_mul(CURSOR_ONE), Ordering::Release);
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames.load(Ordering::Relaxed)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    /// Set the playback rate; non-finite or non-positive values fall back to normal speed.
    pub fn set_rate(&self, rate: f32) {
        let rate = if rate.is_finite() && rate > 0.0 { rate } else { NORMAL_RATE };
        self.rate_bits.store(rate.to_bits(), Ordering::Relaxed);
    }

    pub fn rate(&self) -> f32 {
        f32::from_bits(self.rate_bits.load(Ordering::Relaxed))
    }

    /// Cursor advance per output frame, in fixed-point units.
    pub fn step(&self) -> u64 {
        ((self.rate() as f64) * CURSOR_ONE as f64).round().max(1.0) as u64
    }

    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }

    /// Advance the cursor from `from` to `to` unless someone moved it in between.
    ///
    /// Returns false when a concurrent seek won.
    pub fn advance(&self, from: u64, to: u64) -> bool {
        self.cursor
            .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Move the cursor to `secs`, clamped to the track. Before the track is loaded the
    /// target is kept and applied once it is.
    pub fn seek_secs(&self, secs: f64) {
        let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        if self.is_loaded() {
            self.store_cursor_secs(secs);
            return;
        }
        self.pending_seek.store(secs.to_bits(), Ordering::SeqCst);
        if self.is_loaded() {
            self.apply_pending_seek();
        }
    }

    /// Current position in seconds; the pending seek target until loaded.
    pub fn position_secs(&self) -> f64 {
        let rate = self.sample_rate.load(Ordering::Relaxed);
        if !self.is_loaded() || rate == 0 {
            let bits = self.pending_seek.load(Ordering::SeqCst);
            return if bits == NO_SEEK { 0.0 } else { f64::from_bits(bits) };
        }
        let frame = (self.cursor() / CURSOR_ONE).min(self.total_frames());
        frame as f64 / rate as f64
    }

    /// Track duration in seconds once loaded.
    pub fn duration_secs(&self) -> Option<f64> {
        if !self.is_loaded() {
            return None;
        }
        let rate = self.sample_rate.load(Ordering::Relaxed);
        Some(self.total_frames() as f64 / rate as f64)
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transport_is_paused_and_unloaded() {
        let t = Transport::new();
        assert!(t.is_paused());
        assert!(!t.is_loaded());
        assert_eq!(t.duration_secs(), None);
        assert_eq!(t.position_secs(), 0.0);
        assert_eq!(t.rate(), NORMAL_RATE);
    }

    #[test]
    fn seek_is_clamped_to_track() {
        let t = Transport::new();
        t.mark_loaded(48_000 * 10, 48_000);
        t.seek_secs(4.5);
        assert!((t.position_secs() - 4.5).abs() < 1e-6);
        t.seek_secs(99.0);
        assert_eq!(t.position_secs(), 10.0);
        t.seek_secs(-3.0);
        assert_eq!(t.position_secs(), 0.0);
        assert_eq!(t.duration_secs(), Some(10.0));
    }

    #[test]
    fn step_follows_rate() {
        let t = Transport::new();
        assert_eq!(t.step(), CURSOR_ONE);
        t.set_rate(2.0);
        assert_eq!(t.step(), 2 * CURSOR_ONE);
        t.set_rate(f32::NAN);
        assert_eq!(t.rate(), NORMAL_RATE);
        t.set_rate(-1.0);
        assert_eq!(t.rate(), NORMAL_RATE);
    }

    #[test]
    fn advance_loses_to_concurrent_seek() {
        let t = Transport::new();
        t.mark_loaded(1_000, 100);
        let start = t.cursor();
        t.seek_secs(5.0);
        assert!(!t.advance(start, start + 10 * CURSOR_ONE));
        assert!((t.position_secs() - 5.0).abs() < 1e-9);
        let now = t.cursor();
        assert!(t.advance(now, now + CURSOR_ONE));
    }

    #[test]
    fn seek_before_load_is_applied_on_load() {
        let t = Transport::new();
        t.seek_secs(42.0);
        assert_eq!(t.position_secs(), 42.0);
        t.mark_loaded(48_000 * 100, 48_000);
        assert_eq!(t.position_secs(), 42.0);
        assert_eq!(t.cursor(), 42 * 48_000 * CURSOR_ONE);
    }

    #[test]
    fn pending_seek_is_clamped_on_load() {
        let t = Transport::new();
        t.seek_secs(500.0);
        t.mark_loaded(1_000, 100);
        assert_eq!(t.position_secs(), 10.0);
    }

    #[test]
    fn load_without_pending_seek_starts_at_zero() {
        let t = Transport::new();
        t.mark_loaded(1_000, 100);
        assert_eq!(t.position_secs(), 0.0);
        t.seek_secs(3.0);
        t.mark_loaded(2_000, 100);
        assert_eq!(t.position_secs(), 0.0);
    }

    #[test]
    fn clear_forgets_track_and_pending_seek() {
        let t = Transport::new();
        t.mark_loaded(1_000, 100);
        t.seek_secs(2.0);
        t.clear();
        assert!(!t.is_loaded());
        assert_eq!(t.duration_secs(), None);
        assert_eq!(t.position_secs(), 0.0);

        t.seek_secs(4.0);
        t.clear();
        t.mark_loaded(1_000, 100);
        assert_eq!(t.position_secs(), 0.0);
    }
}
