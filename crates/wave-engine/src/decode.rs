//! Full-buffer audio decode.
//!
//! Uses Symphonia (through a [`DecodeContext`]) to:
//! - probe the container/codec of an in-memory source
//! - decode every packet of the default track into interleaved `f32` samples
//!
//! Sources handled by the player are single clips, so the whole track is decoded up front.
//! Both the waveform builder and the playback engine consume the result.

use std::io::Cursor;

use anyhow::{Context, Result, anyhow, bail};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::CodecParameters;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::{
    codecs::DecoderOptions, formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions,
    probe::Hint,
};

use crate::context::DecodeContext;

/// Metadata captured while probing the source.
#[derive(Clone, Debug, Default)]
pub struct SourceInfo {
    /// Codec name (best-effort).
    pub codec: Option<String>,
}

/// A fully decoded track.
#[derive(Clone, Debug)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: usize,
    /// Interleaved samples: `frame0[ch0], frame0[ch1], ..., frame1[ch0], ...`.
    pub samples: Vec<f32>,
    pub info: SourceInfo,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Build a probe hint from the extension of `source`.
pub fn hint_for_source(source: &str) -> Hint {
    let mut hint = Hint::new();
    if let Some(ext) = extension_of(source) {
        hint.with_extension(&ext);
    }
    hint
}

/// Lowercase file extension of a path or URL, ignoring any query string or fragment.
fn extension_of(source: &str) -> Option<String> {
    let path = source.split(['?', '#']).next().unwrap_or(source);
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Decode every frame of the default track in `bytes`.
pub fn decode_all(ctx: &DecodeContext, bytes: Vec<u8>, hint: Hint) -> Result<DecodedAudio> {
    if bytes.is_empty() {
        bail!("empty audio source");
    }
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let probed = ctx
        .probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("probe audio format")?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| anyhow!("No default audio track"))?;
    let track_id = track.id;
    let codec_params: CodecParameters = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| anyhow!("Unknown sample rate"))?;
    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let info = SourceInfo {
        codec: codec_name_from_params(&codec_params),
    };

    let mut decoder = ctx
        .codecs()
        .make(&codec_params, &DecoderOptions::default())
        .context("create decoder")?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e).context("read packet"),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!(error = e, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(e).context("decode packet"),
        };
        if channels == 0 {
            channels = decoded.spec().channels.count();
        }

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, *decoded.spec());
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    if channels == 0 || samples.is_empty() {
        bail!("no audio frames decoded");
    }

    let audio = DecodedAudio {
        sample_rate,
        channels,
        samples,
        info,
    };
    tracing::debug!(
        rate_hz = audio.sample_rate,
        channels = audio.channels,
        frames = audio.frames(),
        codec = audio.info.codec.as_deref().unwrap_or("-"),
        "decoded source"
    );
    Ok(audio)
}

/// Best-effort codec label for logs.
fn codec_name_from_params(params: &CodecParameters) -> Option<String> {
    use symphonia::core::codecs::*;
    let name = match params.codec {
        CODEC_TYPE_FLAC => "FLAC",
        CODEC_TYPE_MP3 => "MP3",
        CODEC_TYPE_AAC => "AAC",
        CODEC_TYPE_ALAC => "ALAC",
        CODEC_TYPE_VORBIS => "VORBIS",
        CODEC_TYPE_OPUS => "OPUS",
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE => "PCM_S16",
        CODEC_TYPE_PCM_S24LE | CODEC_TYPE_PCM_S24BE => "PCM_S24",
        CODEC_TYPE_PCM_S32LE | CODEC_TYPE_PCM_S32BE => "PCM_S32",
        CODEC_TYPE_PCM_F32LE | CODEC_TYPE_PCM_F32BE => "PCM_F32",
        _ => return None,
    };
    Some(name.to_string())
}

/// In-memory 16-bit PCM WAV file, for tests here and in dependent crates.
#[cfg(any(test, feature = "test-util"))]
pub fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let block_align = channels * 2;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::codecs::*;

    #[test]
    fn decode_all_reads_every_frame_of_a_wav() {
        let ctx = DecodeContext::new();
        let pcm: Vec<i16> = (0..8_000).map(|i| ((i % 100) * 100) as i16).collect();
        let audio = decode_all(&ctx, wav_bytes(8_000, 1, &pcm), hint_for_source("a.wav")).unwrap();
        assert_eq!(audio.sample_rate, 8_000);
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.frames(), 8_000);
        assert!((audio.duration_secs() - 1.0).abs() < 1e-9);
        assert_eq!(audio.info.codec.as_deref(), Some("PCM_S16"));
    }

    #[test]
    fn decode_all_keeps_stereo_interleaved() {
        let ctx = DecodeContext::new();
        let pcm: Vec<i16> = (0..2_000).map(|i| if i % 2 == 0 { 16_384 } else { -16_384 }).collect();
        let audio = decode_all(&ctx, wav_bytes(4_000, 2, &pcm), Hint::new()).unwrap();
        assert_eq!(audio.channels, 2);
        assert_eq!(audio.frames(), 1_000);
        assert!(audio.samples[0] > 0.4);
        assert!(audio.samples[1] < -0.4);
    }

    #[test]
    fn decode_all_rejects_garbage() {
        let ctx = DecodeContext::new();
        assert!(decode_all(&ctx, vec![0x42; 512], Hint::new()).is_err());
        assert!(decode_all(&ctx, Vec::new(), Hint::new()).is_err());
    }

    #[test]
    fn extension_of_ignores_query_strings() {
        assert_eq!(
            extension_of("https://cdn.example.com/audio/clip.MP3?sig=abc#t=1").as_deref(),
            Some("mp3")
        );
        assert_eq!(extension_of("/music/a.flac").as_deref(), Some("flac"));
        assert_eq!(extension_of("https://example.com/v1.2/stream"), None);
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn codec_name_from_params_maps_known_codecs() {
        let mut params = CodecParameters::new();
        params.codec = CODEC_TYPE_MP3;
        assert_eq!(codec_name_from_params(&params), Some("MP3".to_string()));
        params.codec = CODEC_TYPE_PCM_S16LE;
        assert_eq!(codec_name_from_params(&params), Some("PCM_S16".to_string()));
    }

    #[test]
    fn codec_name_from_params_unknown_returns_none() {
        let params = CodecParameters::new();
        assert!(codec_name_from_params(&params).is_none());
    }
}
