//! Decoder registries shared by waveform extraction and playback.
//!
//! A [`DecodeContext`] owns the Symphonia codec registry and format probe. Callers do not
//! reach for a process-wide instance; they hold a [`SharedContext`], which builds the
//! context on first use and lets it go once the last holder drops it.

use std::sync::{Arc, Mutex, Weak};

use symphonia::core::codecs::CodecRegistry;
use symphonia::core::probe::Probe;

/// Codec registry and format probe used to open and decode sources.
pub struct DecodeContext {
    codecs: CodecRegistry,
    probe: Probe,
}

impl DecodeContext {
    /// Build a context with every codec and format enabled at compile time.
    pub fn new() -> Self {
        let mut codecs = CodecRegistry::new();
        symphonia::default::register_enabled_codecs(&mut codecs);
        let mut probe = Probe::default();
        symphonia::default::register_enabled_formats(&mut probe);
        Self { codecs, probe }
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn probe(&self) -> &Probe {
        &self.probe
    }
}

impl Default for DecodeContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazily created, reference-counted [`DecodeContext`].
#[derive(Default)]
pub struct SharedContext {
    slot: Mutex<Weak<DecodeContext>>,
}

impl SharedContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live context, creating one if nobody holds it.
    pub fn acquire(&self) -> Arc<DecodeContext> {
        let mut slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(ctx) = slot.upgrade() {
            return ctx;
        }
        tracing::debug!("creating decode context");
        let ctx = Arc::new(DecodeContext::new());
        *slot = Arc::downgrade(&ctx);
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_reuses_live_context() {
        let shared = SharedContext::new();
        let a = shared.acquire();
        let b = shared.acquire();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn context_is_released_when_unreferenced() {
        let shared = SharedContext::new();
        let first = shared.acquire();
        let released = Arc::downgrade(&first);
        drop(first);
        assert!(released.upgrade().is_none());

        let second = shared.acquire();
        assert_eq!(Arc::strong_count(&second), 1);
    }
}
