//! Audio Player (oasis-ap) - Main entry point
//!
//! Decodes the given file, assembles it into one PCM buffer and plays it
//! with keyboard transport control. The process exit code is the
//! [`ResultCode`] of the outcome.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use oasis_ap::audio::output::list_devices;
use oasis_ap::audio::{assemble, decode, open_preferred_sink, SinkKind, StreamDescription};
use oasis_ap::audio::{AudioStreamInfo, PcmBuffer};
use oasis_ap::config::{PlaybackSettings, PlayerConfig};
use oasis_ap::playback::control::{print_controls, spawn_stdin_reader};
use oasis_ap::playback::{play, NoInput};
use oasis_common::config::{resolve_config_source, ConfigSource, CONFIG_ENV_VAR};
use oasis_common::logging::{resolve_level, LOG_LEVEL_ENV_VAR};
use oasis_common::ResultCode;
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for oasis-ap
#[derive(Parser, Debug)]
#[command(name = "oasis-ap")]
#[command(about = "Decode an audio file and play it with keyboard transport control")]
#[command(version)]
struct Args {
    /// Audio file to play
    #[arg(required_unless_present = "list_devices")]
    file: Option<PathBuf>,

    /// Configuration file (default: OASIS_CONFIG, then ~/.config/oasis/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output preference, tried in order: default, null, device:<name>, host:<name>
    #[arg(long = "sink", value_name = "SINK")]
    sinks: Vec<SinkKind>,

    /// Seek step in seconds
    #[arg(long, env = "OASIS_SEEK_SECONDS")]
    seek_seconds: Option<u64>,

    /// Ignore the terminal; play to the end
    #[arg(long)]
    no_input: bool,

    /// Decode and assemble only, then print stream information
    #[arg(long)]
    decode_only: bool,

    /// List output devices of each audio host
    #[arg(long)]
    list_devices: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let source = resolve_config_source(args.config.as_deref(), CONFIG_ENV_VAR);
    let config = PlayerConfig::load(&source);
    init_tracing(
        config
            .as_ref()
            .ok()
            .and_then(|c| c.logging.level.as_deref()),
    );

    let result = config
        .map_err(anyhow::Error::from)
        .and_then(|config| run(args, config, &source));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = result_code(&e);
            error!("{:#}", e);
            error!("Exiting with {} ({})", code.exit_code(), code);
            ExitCode::from(code.exit_code())
        }
    }
}

/// Filter priority: RUST_LOG, OASIS_LOG_LEVEL, config file, info
fn init_tracing(configured: Option<&str>) {
    let (filter, unknown) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, None),
        Err(_) => {
            let (level, unknown) = resolve_level(configured);
            (
                EnvFilter::default().add_directive(LevelFilter::from_level(level).into()),
                unknown,
            )
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(value) = unknown {
        warn!(
            "Unknown log level '{}' (from {} or config), using info",
            value, LOG_LEVEL_ENV_VAR
        );
    }
}

fn result_code(e: &anyhow::Error) -> ResultCode {
    if let Some(e) = e.downcast_ref::<oasis_ap::Error>() {
        e.code()
    } else if let Some(e) = e.downcast_ref::<oasis_common::Error>() {
        e.code()
    } else {
        ResultCode::Error
    }
}

fn run(args: Args, config: PlayerConfig, source: &ConfigSource) -> Result<()> {
    match source.path() {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    if args.list_devices {
        print_devices();
        return Ok(());
    }

    let file = args
        .file
        .ok_or_else(|| oasis_ap::Error::InvalidArgument("no input file given".into()))?;
    if !file.exists() {
        return Err(oasis_ap::Error::FileNotFound(file).into());
    }

    let (frames, mut info) =
        decode(&file).with_context(|| format!("Failed to decode {}", file.display()))?;
    let pcm = assemble(&frames, &mut info).context("Failed to assemble PCM")?;
    drop(frames);

    if !info.metadata.is_empty() {
        info!(
            "Now playing: {} - {} ({})",
            info.metadata.artists.join(", "),
            info.metadata.title.as_deref().unwrap_or("untitled"),
            info.metadata.album.as_deref().unwrap_or("no album")
        );
    }

    if args.decode_only {
        print_stream_info(&file, &info, &pcm);
        return Ok(());
    }

    let mut settings = PlaybackSettings::from(config.playback.clone());
    if let Some(seconds) = args.seek_seconds {
        settings.seek_seconds = seconds;
    }

    let preferences = if args.sinks.is_empty() {
        config.output.sinks.clone()
    } else {
        args.sinks
    };
    let desc = StreamDescription::from_info(&info, settings.frame_size);
    let mut sink = open_preferred_sink(&preferences, &desc, &config.output)
        .context("Failed to open audio output")?;

    let result = if args.no_input {
        play(pcm, &info, sink.as_mut(), &mut NoInput, &settings)
    } else {
        let mut commands = spawn_stdin_reader().context("Failed to start control input")?;
        print_controls();
        play(pcm, &info, sink.as_mut(), &mut commands, &settings)
    };
    let outcome = result.context("Playback failed")?;

    info!("Playback {}: {}", outcome, file.display());
    Ok(())
}

fn print_stream_info(file: &std::path::Path, info: &AudioStreamInfo, pcm: &PcmBuffer) {
    let frames = pcm.len() / info.bytes_per_frame().max(1);
    let seconds = frames as f64 / info.sample_rate.max(1) as f64;

    println!("File:          {}", file.display());
    println!("Source codec:  {}", info.source_codec);
    println!("Sample format: {}", info.sample_format);
    println!("PCM codec:     {}", info.codec);
    println!("Sample rate:   {} Hz", info.sample_rate);
    println!("Channels:      {}", info.channels);
    if let Some(bit_rate) = info.bit_rate {
        println!("Bit rate:      {} bit/s", bit_rate);
    }
    println!("Duration:      {:.3} s ({} samples)", seconds, frames);
    println!("PCM bytes:     {}", pcm.len());
    if let Some(title) = &info.metadata.title {
        println!("Title:         {}", title);
    }
    if !info.metadata.artists.is_empty() {
        println!("Artists:       {}", info.metadata.artists.join(", "));
    }
    if let Some(album) = &info.metadata.album {
        println!("Album:         {}", album);
    }
    if let Some(bytes) = info.metadata.cover_art_bytes {
        println!("Cover art:     {} bytes", bytes);
    }
}

fn print_devices() {
    for (host, devices) in list_devices() {
        println!("{}:", host);
        if devices.is_empty() {
            println!("  (no output devices)");
        }
        for device in devices {
            println!("  {}", device);
        }
    }
}
