//! Waveform peak extraction.
//!
//! A [`Waveform`] summarizes a decoded track as min/max amplitude pairs, one pair per
//! `scale` frames (mixed down to mono). It is built once per source and never mutated;
//! [`Waveform::resample`] returns a coarser copy and [`Waveform::fit_width`] buckets the
//! peaks into display columns.

use anyhow::{Result, bail};
use symphonia::core::probe::Hint;

use crate::context::DecodeContext;
use crate::decode::{self, DecodedAudio};

/// Frames per peak used when building from decoded audio.
pub const DEFAULT_SCALE: usize = 512;

#[derive(Clone, Debug, PartialEq)]
pub struct Waveform {
    duration: f64,
    scale: usize,
    min: Vec<f32>,
    max: Vec<f32>,
}

impl Waveform {
    /// Decode `bytes` and build a waveform at `scale` frames per peak.
    pub fn from_bytes(ctx: &DecodeContext, bytes: Vec<u8>, hint: Hint, scale: usize) -> Result<Self> {
        let audio = decode::decode_all(ctx, bytes, hint)?;
        Self::from_decoded(&audio, scale)
    }

    /// Bucket decoded audio into min/max pairs of `scale` frames each.
    pub fn from_decoded(audio: &DecodedAudio, scale: usize) -> Result<Self> {
        if scale == 0 {
            bail!("waveform scale must be positive");
        }
        if audio.channels == 0 || audio.sample_rate == 0 {
            bail!("decoded audio has no channels or sample rate");
        }
        let channels = audio.channels;
        let buckets = audio.frames().div_ceil(scale);
        let mut min = Vec::with_capacity(buckets);
        let mut max = Vec::with_capacity(buckets);

        for bucket in audio.samples.chunks(scale * channels) {
            let mut lo = f32::MAX;
            let mut hi = f32::MIN;
            for frame in bucket.chunks_exact(channels) {
                let mono = frame.iter().sum::<f32>() / channels as f32;
                lo = lo.min(mono);
                hi = hi.max(mono);
            }
            if lo > hi {
                lo = 0.0;
                hi = 0.0;
            }
            min.push(lo);
            max.push(hi);
        }

        Ok(Self {
            duration: audio.duration_secs(),
            scale,
            min,
            max,
        })
    }

    /// Build a waveform from precomputed peaks; minima mirror the peaks.
    pub fn from_peaks(duration: f64, peaks: Vec<f32>) -> Self {
        Self {
            duration: duration.max(0.0),
            scale: DEFAULT_SCALE,
            min: peaks.iter().map(|p| -p.abs()).collect(),
            max: peaks,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Per-bucket maxima.
    pub fn peaks(&self) -> &[f32] {
        &self.max
    }

    pub fn len(&self) -> usize {
        self.max.len()
    }

    pub fn is_empty(&self) -> bool {
        self.max.is_empty()
    }

    /// Rebucket to a coarser `scale`. Finer scales cannot be recovered from peaks.
    pub fn resample(&self, scale: usize) -> Result<Self> {
        if scale < self.scale {
            bail!("zoom level {scale} too low, minimum: {}", self.scale);
        }
        if scale == self.scale {
            return Ok(self.clone());
        }
        let len = self.len();
        let out_len = (len * self.scale).div_ceil(scale);
        let mut min = Vec::with_capacity(out_len);
        let mut max = Vec::with_capacity(out_len);
        for i in 0..out_len {
            let (start, end) = bucket_range(i, out_len, len);
            min.push(self.min[start..end].iter().copied().fold(f32::MAX, f32::min));
            max.push(self.max[start..end].iter().copied().fold(f32::MIN, f32::max));
        }
        Ok(Self {
            duration: self.duration,
            scale,
            min,
            max,
        })
    }

    /// Absolute peak per display column, `width` values in `[0, 1]`.
    pub fn fit_width(&self, width: usize) -> Vec<f32> {
        if width == 0 || self.is_empty() {
            return Vec::new();
        }
        let len = self.len();
        (0..width)
            .map(|col| {
                let (start, end) = bucket_range(col, width, len);
                self.max[start..end]
                    .iter()
                    .zip(&self.min[start..end])
                    .map(|(hi, lo)| hi.abs().max(lo.abs()))
                    .fold(0.0f32, f32::max)
                    .min(1.0)
            })
            .collect()
    }
}

/// Input range feeding output bucket `i` of `out_len` over `len` inputs (never empty).
fn bucket_range(i: usize, out_len: usize, len: usize) -> (usize, usize) {
    let start = (i * len / out_len).min(len.saturating_sub(1));
    let end = ((i + 1) * len / out_len).clamp(start + 1, len);
    (start, end)
}
