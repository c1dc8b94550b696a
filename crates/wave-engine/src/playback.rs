//! Playback stage (CPAL output stream).
//!
//! Builds the CPAL output stream and provides the real-time audio callback.
//! The callback:
//! - reads frames from an in-memory [`PcmTrack`] at the [`Transport`] cursor
//! - advances the cursor by the current rate (2.0 skips every other frame)
//! - applies basic channel mapping (mono↔stereo, best-effort otherwise)
//! - converts `f32` samples to the device sample format

use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use cpal::traits::DeviceTrait;

use crate::transport::{CURSOR_ONE, Transport};

/// Decoded, device-rate interleaved samples for one track.
#[derive(Debug)]
pub struct PcmTrack {
    samples: Vec<f32>,
    channels: usize,
}

impl PcmTrack {
    pub fn new(samples: Vec<f32>, channels: usize) -> Self {
        Self {
            samples,
            channels: channels.max(1),
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    fn frame(&self, idx: usize) -> &[f32] {
        let start = idx * self.channels;
        &self.samples[start..start + self.channels]
    }
}

/// Build a CPAL output stream that plays `track` under `transport` control.
///
/// `track` must already be at the device sample rate.
///
/// ## Real-time constraints
/// The callback only touches atomics plus a scratch buffer it owns; a concurrent seek is
/// never overwritten (see [`Transport::advance`]).
pub fn build_output_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    track: Arc<PcmTrack>,
    transport: Arc<Transport>,
) -> Result<cpal::Stream> {
    match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, config, track, transport),
        cpal::SampleFormat::I16 => build_stream::<i16>(device, config, track, transport),
        cpal::SampleFormat::I32 => build_stream::<i32>(device, config, track, transport),
        cpal::SampleFormat::U16 => build_stream::<u16>(device, config, track, transport),
        other => Err(anyhow!("Unsupported sample format: {other:?}")),
    }
}

/// Type-specialized stream builder for CPAL sample formats.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    track: Arc<PcmTrack>,
    transport: Arc<Transport>,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels_out = config.channels as usize;
    let scratch = Mutex::new(Vec::<f32>::new());

    let err_fn = |err| tracing::warn!("stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            let Ok(mut buf) = scratch.lock() else {
                data.fill(<T as cpal::Sample>::from_sample::<f32>(0.0));
                return;
            };
            if buf.len() != data.len() {
                buf.resize(data.len(), 0.0);
            }
            fill_block(&track, &transport, &mut buf, channels_out);
            for (out, sample) in data.iter_mut().zip(buf.iter()) {
                *out = <T as cpal::Sample>::from_sample::<f32>(*sample);
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

/// Render one callback block of interleaved `f32` into `out`.
///
/// Paused transport and frames past the end produce silence. The cursor stops at the
/// last frame so position reads as the full duration once the track has played out.
fn fill_block(track: &PcmTrack, transport: &Transport, out: &mut [f32], channels_out: usize) {
    if channels_out == 0 {
        return;
    }
    if transport.is_paused() {
        out.fill(0.0);
        return;
    }

    let total = track.frames();
    let end_cursor = total as u64 * CURSOR_ONE;
    let start = transport.cursor();
    let step = transport.step();
    let mut cursor = start;

    for frame in out.chunks_mut(channels_out) {
        let idx = (cursor / CURSOR_ONE) as usize;
        if idx >= total {
            frame.fill(0.0);
            continue;
        }
        let src = track.frame(idx);
        for (ch, sample) in frame.iter_mut().enumerate() {
            *sample = map_channel(src, channels_out, ch);
        }
        cursor = cursor.saturating_add(step);
    }

    transport.advance(start, cursor.min(end_cursor));
}

/// Fetch the output sample for `dst_ch` from one source frame.
///
/// Mapping rules:
/// - mono → any: duplicate channel 0
/// - stereo → mono: average L/R
/// - other layouts: best-effort "clamp to available channels"
fn map_channel(src: &[f32], dst_channels: usize, dst_ch: usize) -> f32 {
    match (src.len(), dst_channels) {
        (0, _) => 0.0,
        (1, _) => src[0],
        (2, 1) => 0.5 * (src[0] + src[1]),
        (n, _) => src[dst_ch.min(n - 1)],
    }
}
