//! Whole-buffer resampling.
//!
//! Uses Rubato to convert decoded interleaved `f32` audio from the source rate to the
//! output device rate before playback starts. The track is processed in fixed-size input
//! chunks with a final partial chunk, so memory stays bounded by one chunk of scratch space
//! on top of the output buffer.

use anyhow::{Result, anyhow};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{
    calculate_cutoff, Async, FixedAsync, Indexing, Resampler, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};

/// Resample interleaved `samples` from `src_rate` to `dst_rate`.
///
/// Returns the input unchanged when the rates already match.
pub fn resample_interleaved(
    samples: &[f32],
    channels: usize,
    src_rate: u32,
    dst_rate: u32,
    chunk_frames: usize,
) -> Result<Vec<f32>> {
    if channels == 0 || src_rate == 0 || dst_rate == 0 {
        return Err(anyhow!(
            "invalid resample request: {channels} channels, {src_rate} Hz -> {dst_rate} Hz"
        ));
    }
    if src_rate == dst_rate {
        tracing::info!(rate_hz = dst_rate, "resample skipped");
        return Ok(samples.to_vec());
    }

    let f_ratio = dst_rate as f64 / src_rate as f64;

    let sinc_len = 128;
    let oversampling_factor = 256;
    let interpolation = SincInterpolationType::Cubic;
    let window = WindowFunction::BlackmanHarris2;
    let f_cutoff = calculate_cutoff(sinc_len, window);

    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff,
        interpolation,
        oversampling_factor,
        window,
    };

    let chunk_in_frames = chunk_frames.max(1);
    let mut resampler = Async::<f32>::new_sinc(
        f_ratio,
        1.1,
        &params,
        chunk_in_frames,
        channels,
        FixedAsync::Input,
    )
    .map_err(|e| anyhow!("resampler init error: {e}"))?;

    let total_frames = samples.len() / channels;
    let expected_frames = (total_frames as f64 * f_ratio).round() as usize;
    let delay = resampler.output_delay();
    let mut out = Vec::with_capacity((expected_frames + delay + chunk_in_frames * 2) * channels);
    let mut out_chunk = vec![0.0f32; resampler.output_frames_max() * channels];

    let mut indexing = Indexing {
        input_offset: 0,
        output_offset: 0,
        active_channels_mask: None,
        partial_len: None,
    };

    for chunk in samples.chunks(chunk_in_frames * channels) {
        let frames = chunk.len() / channels;
        if frames == 0 {
            continue;
        }
        let partial = (frames < chunk_in_frames).then_some(frames);
        let nbr_out = process_chunk(
            &mut resampler,
            &chunk[..frames * channels],
            channels,
            &mut out_chunk,
            &mut indexing,
            partial,
        )?;
        out.extend_from_slice(&out_chunk[..nbr_out * channels]);
    }

    // Flush the filter tail, then drop the leading delay so the output lines up with the
    // input and lasts exactly as long.
    let silence = vec![0.0f32; chunk_in_frames * channels];
    while out.len() / channels < delay + expected_frames {
        let nbr_out = process_chunk(
            &mut resampler,
            &silence,
            channels,
            &mut out_chunk,
            &mut indexing,
            None,
        )?;
        if nbr_out == 0 {
            break;
        }
        out.extend_from_slice(&out_chunk[..nbr_out * channels]);
    }
    out.drain(..(delay * channels).min(out.len()));
    out.truncate(expected_frames * channels);

    tracing::info!(
        from_hz = src_rate,
        to_hz = dst_rate,
        frames_in = total_frames,
        frames_out = out.len() / channels,
        "resampled"
    );
    Ok(out)
}

/// Run one input chunk through `resampler`; returns the output frame count.
fn process_chunk(
    resampler: &mut Async<f32>,
    chunk: &[f32],
    channels: usize,
    out_chunk: &mut [f32],
    indexing: &mut Indexing,
    partial_len: Option<usize>,
) -> Result<usize> {
    let frames = chunk.len() / channels;
    let input_adapter = InterleavedSlice::new(chunk, channels, frames)
        .map_err(|e| anyhow!("interleaved slice (input) error: {e}"))?;
    let out_capacity_frames = out_chunk.len() / channels;
    let mut output_adapter = InterleavedSlice::new_mut(out_chunk, channels, out_capacity_frames)
        .map_err(|e| anyhow!("interleaved slice (output) error: {e}"))?;

    indexing.input_offset = 0;
    indexing.output_offset = 0;
    indexing.partial_len = partial_len;

    let (_nbr_in, nbr_out) = resampler
        .process_into_buffer(&input_adapter, &mut output_adapter, Some(&*indexing))
        .map_err(|e| anyhow!("resampler process error: {e}"))?;
    Ok(nbr_out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(rate: u32, secs: f32) -> Vec<f32> {
        let n = (rate as f32 * secs) as usize;
        (0..n)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn same_rate_is_passthrough() {
        let input = vec![0.1, -0.1, 0.2, -0.2];
        let out = resample_interleaved(&input, 2, 48_000, 48_000, 1024).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn upsample_length_tracks_ratio() {
        let input = sine(44_100, 1.0);
        let out = resample_interleaved(&input, 1, 44_100, 48_000, 1024).unwrap();
        assert_eq!(out.len(), 48_000);
        assert!(out.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
    }

    #[test]
    fn stereo_output_stays_interleaved() {
        let mono = sine(22_050, 0.5);
        let stereo: Vec<f32> = mono.iter().flat_map(|s| [*s, -*s]).collect();
        let out = resample_interleaved(&stereo, 2, 22_050, 44_100, 512).unwrap();
        assert_eq!(out.len(), 2 * 22_050);
        // Channels stay in antiphase once the signal is up.
        let mid = out.len() / 2 & !1;
        assert!((out[mid] + out[mid + 1]).abs() < 1e-3);
    }

    #[test]
    fn downsample_keeps_duration_and_alignment() {
        // Silence, then a step at 0.25 s.
        let mut input = vec![0.0f32; 48_000 / 2];
        for s in &mut input[12_000..] {
            *s = 0.5;
        }
        let out = resample_interleaved(&input, 1, 48_000, 44_100, 1024).unwrap();
        assert_eq!(out.len(), 22_050);
        // The step lands near 0.25 s at the new rate, not one filter delay later.
        assert!(out[11_025 - 200].abs() < 0.05);
        assert!((out[11_025 + 200] - 0.5).abs() < 0.05);
    }

    #[test]
    fn rejects_zero_rates() {
        assert!(resample_interleaved(&[0.0], 1, 0, 48_000, 1024).is_err());
        assert!(resample_interleaved(&[0.0], 0, 44_100, 48_000, 1024).is_err());
    }
}
