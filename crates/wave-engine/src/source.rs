//! Audio source fetching.
//!
//! Sources are either `http(s)://` URLs (fetched with `ureq`) or local files given as a
//! plain path or `file://` URL. Bodies are read in chunks so a [`CancelToken`] can stop a
//! fetch that is no longer wanted.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};

/// Configuration for source fetching.
#[derive(Clone, Debug)]
pub struct FetchConfig {
    /// Overall timeout for a remote fetch, headers and body included.
    pub timeout: Duration,
    /// Bytes read between cancellation checks.
    pub chunk_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            chunk_bytes: 64 * 1024,
        }
    }
}

/// Cooperative cancel flag shared between an owner and its worker thread.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Fetch the full body of `source`.
///
/// Returns `Ok(None)` when `cancel` fires before the body is complete.
pub fn fetch_bytes(source: &str, cfg: &FetchConfig, cancel: &CancelToken) -> Result<Option<Vec<u8>>> {
    if cancel.is_cancelled() {
        return Ok(None);
    }
    if is_remote(source) {
        let resp = ureq::get(source)
            .config()
            .timeout_global(Some(cfg.timeout))
            .build()
            .call()
            .with_context(|| format!("fetch {source}"))?;
        let (_, body) = resp.into_parts();
        let reader = body.into_reader();
        let bytes = read_cancellable(reader, cfg.chunk_bytes, cancel)
            .with_context(|| format!("read body of {source}"))?;
        if let Some(bytes) = &bytes {
            tracing::debug!(source, bytes = bytes.len(), "remote source fetched");
        }
        Ok(bytes)
    } else {
        let path = local_path(source);
        let file = File::open(&path).with_context(|| format!("open {:?}", path))?;
        read_cancellable(file, cfg.chunk_bytes, cancel).with_context(|| format!("read {:?}", path))
    }
}

/// True for `http://` and `https://` sources.
pub fn is_remote(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn local_path(source: &str) -> PathBuf {
    let trimmed = source.trim();
    PathBuf::from(trimmed.strip_prefix("file://").unwrap_or(trimmed))
}

/// Read `reader` to the end in `chunk_bytes` pieces, checking `cancel` between reads.
fn read_cancellable<R: Read>(
    mut reader: R,
    chunk_bytes: usize,
    cancel: &CancelToken,
) -> io::Result<Option<Vec<u8>>> {
    let mut out = Vec::new();
    let mut chunk = vec![0u8; chunk_bytes.max(1)];
    loop {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => out.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    if cancel.is_cancelled() {
        return Ok(None);
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn is_remote_matches_http_schemes_only() {
        assert!(is_remote("http://host/a.mp3"));
        assert!(is_remote("HTTPS://host/a.mp3"));
        assert!(!is_remote("file:///tmp/a.mp3"));
        assert!(!is_remote("/tmp/a.mp3"));
    }

    #[test]
    fn local_path_strips_file_scheme() {
        assert_eq!(local_path("file:///tmp/a.wav"), PathBuf::from("/tmp/a.wav"));
        assert_eq!(local_path(" clip.wav "), PathBuf::from("clip.wav"));
    }

    #[test]
    fn read_cancellable_reads_in_small_chunks() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let out = read_cancellable(Cursor::new(data.clone()), 7, &CancelToken::new())
            .unwrap()
            .unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn read_cancellable_stops_when_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let out = read_cancellable(Cursor::new(vec![1u8; 128]), 16, &cancel).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn fetch_bytes_reads_local_file() {
        let path = std::env::temp_dir().join(format!("wave-engine-fetch-{}.bin", std::process::id()));
        std::fs::write(&path, b"abc123").unwrap();
        let source = format!("file://{}", path.display());
        let bytes = fetch_bytes(&source, &FetchConfig::default(), &CancelToken::new()).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(bytes.as_deref(), Some(&b"abc123"[..]));
    }

    #[test]
    fn fetch_bytes_missing_file_is_error() {
        let err = fetch_bytes(
            "/definitely/not/here.mp3",
            &FetchConfig::default(),
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("open"));
    }
}
