//! `wave-player`: play an audio file or URL with a waveform view in the terminal.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use wave_player::config::{PlayerConfig, PlayerConfigFile};
use wave_player::logging;

#[derive(Parser, Debug)]
#[command(name = "wave-player", version)]
struct Args {
    /// Audio source: a local path, `file://` URL or `http(s)://` URL.
    #[arg(required_unless_present = "list_devices")]
    source: Option<String>,

    /// TOML config file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output device name (substring match).
    #[arg(long)]
    device: Option<String>,

    /// List output devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// Poll interval in milliseconds.
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Playback rate while speedup is on.
    #[arg(long)]
    speedup_rate: Option<f32>,

    /// Frames per waveform peak (at least 512).
    #[arg(long)]
    scale: Option<usize>,

    /// Fetch timeout in seconds.
    #[arg(long)]
    fetch_timeout_secs: Option<u64>,

    /// Resampler chunk size in frames.
    #[arg(long)]
    chunk_frames: Option<usize>,
}

impl Args {
    fn overrides(&self) -> PlayerConfigFile {
        PlayerConfigFile {
            poll_ms: self.poll_ms,
            speedup_rate: self.speedup_rate,
            scale: self.scale,
            device: self.device.clone(),
            chunk_frames: self.chunk_frames,
            fetch_timeout_secs: self.fetch_timeout_secs,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_devices {
        let host = cpal::default_host();
        for (i, name) in wave_engine::device::list_devices(&host)?.iter().enumerate() {
            println!("#{i}: {name}");
        }
        return Ok(());
    }

    let (log_tx, log_rx) = crossbeam_channel::unbounded();
    logging::init(log_tx);

    let file = match args.config.as_deref() {
        Some(path) => PlayerConfigFile::load(path)?,
        None => PlayerConfigFile::default(),
    };
    let config = PlayerConfig::resolve(file.with_overrides(args.overrides()))?;

    let Some(source) = args.source else {
        anyhow::bail!("missing audio source");
    };
    wave_player::ui::run_tui(source, config, log_rx)
}
