mod cli;

use mkvsource::{
    config, CollectingSink, ContainerMetadata, DecodedFrame, FileSource, FrameSink, MkvSource,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mkvsource=trace,mkvsource_ebml=debug".to_string()
        } else {
            "mkvsource=info,mkvsource_ebml=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, cli.config.as_deref(), json))
        }
        Commands::Dump {
            file,
            tracks,
            start,
            limit,
            annexb,
            json,
        } => {
            let options = DumpOptions {
                tracks,
                start,
                limit,
                annexb,
                json,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(dump_file(&file, cli.config.as_deref(), options))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("mkvsource {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn open_file(
    file: &Path,
    config_path: Option<&Path>,
    annexb: bool,
    sink: &mut dyn FrameSink,
) -> Result<MkvSource<FileSource>> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }
    let mut config = config::load_config_or_default(config_path)?;
    config.demux.annexb |= annexb;

    let source = FileSource::open(file)
        .await
        .with_context(|| format!("Failed to open {:?}", file))?;
    MkvSource::open(source, config.demux, sink)
        .await
        .with_context(|| format!("Failed to read Matroska header from {:?}", file))
}

async fn probe_file(file: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    let mut sink = CollectingSink::new();
    let mut source = open_file(file, config_path, false, &mut sink).await?;
    let metadata = source
        .metadata()
        .context("Header discovery did not finish")?;

    if json {
        println!("{}", serde_json::to_string_pretty(metadata)?);
    } else {
        print_metadata(file, metadata);
    }
    source.shutdown()?;
    Ok(())
}

fn print_metadata(file: &Path, metadata: &ContainerMetadata) {
    println!("File: {}", file.display());
    println!(
        "DocType: {} (version {}, read version {})",
        metadata.ebml.doc_type,
        metadata.ebml.doc_type_version,
        metadata.ebml.doc_type_read_version
    );
    println!("Segment offset: {}", metadata.segment_offset);
    println!("Timecode scale: {} ns", metadata.info.timecode_scale);
    if let Some(duration) = metadata.duration() {
        let secs = duration.as_secs();
        let mins = secs / 60;
        let hours = mins / 60;
        println!(
            "Duration: {:02}:{:02}:{:02}.{:03}",
            hours,
            mins % 60,
            secs % 60,
            duration.subsec_millis()
        );
    }
    if let Some(ref title) = metadata.info.title {
        println!("Title: {}", title);
    }
    if !metadata.info.muxing_app.is_empty() {
        println!("Muxing app: {}", metadata.info.muxing_app);
    }
    if !metadata.info.writing_app.is_empty() {
        println!("Writing app: {}", metadata.info.writing_app);
    }

    println!("\nTracks: {}", metadata.tracks.len());
    for track in &metadata.tracks {
        print!(
            "  [{}] {} {} ({})",
            track.track_number,
            track.kind,
            track.codec_name(),
            track.codec_id
        );
        if let Some(ref video) = track.video {
            print!(" {}x{}", video.pixel_width, video.pixel_height);
        }
        if let Some(ref audio) = track.audio {
            print!(" {}ch {} Hz", audio.channels, audio.sampling_frequency);
            if let Some(bits) = audio.bit_depth {
                print!(" {} bit", bits);
            }
        }
        if let Some(ref lang) = track.language {
            print!(" ({})", lang);
        }
        if track.default {
            print!(" [default]");
        }
        if track.forced {
            print!(" [forced]");
        }
        println!();
        if let Some(ns) = track.default_duration_ns {
            println!("      default duration {} ns", ns);
        }
    }

    println!("\nSeek head entries: {}", metadata.seek_head.len());
    for entry in &metadata.seek_head {
        println!("  {} @ {}", entry.element_name, entry.seek_position);
    }
    println!("Cue points: {}", metadata.cues.len());
}

struct DumpOptions {
    tracks: Vec<u64>,
    start: Option<f64>,
    limit: Option<usize>,
    annexb: bool,
    json: bool,
}

/// Prints frames as they are delivered.
struct PrintSink {
    json: bool,
    limit: Option<usize>,
    printed: usize,
}

impl FrameSink for PrintSink {
    fn on_streams_ready(&mut self, _metadata: &ContainerMetadata) {}

    fn on_frame(&mut self, frame: DecodedFrame) {
        if !self.wants_more() {
            return;
        }
        self.printed += 1;
        if self.json {
            match serde_json::to_string(&frame) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::error!("Failed to serialize frame: {}", e),
            }
        } else {
            println!(
                "track={} ts={:.3}s ticks={} size={} out={}{}",
                frame.track_number,
                frame.timestamp_ns as f64 / 1e9,
                frame.timestamp_ticks,
                frame.byte_length,
                frame.data.len(),
                if frame.is_keyframe { " key" } else { "" }
            );
        }
    }

    fn on_end_of_stream(&mut self, track_number: u64) {
        tracing::info!("Track {} finished", track_number);
    }

    fn wants_more(&self) -> bool {
        self.limit.map_or(true, |limit| self.printed < limit)
    }
}

async fn dump_file(file: &Path, config_path: Option<&Path>, options: DumpOptions) -> Result<()> {
    let mut sink = PrintSink {
        json: options.json,
        limit: options.limit,
        printed: 0,
    };
    let mut source = open_file(file, config_path, options.annexb, &mut sink).await?;

    let position = match options.start {
        Some(secs) if secs.is_finite() && secs >= 0.0 => Some(Duration::from_secs_f64(secs)),
        Some(secs) => anyhow::bail!("Invalid start position: {}", secs),
        None => None,
    };
    source
        .start(&options.tracks, position)
        .context("Failed to start demuxing")?;
    source.run(&mut sink).await?;

    tracing::info!("Printed {} frames", sink.printed);
    source.shutdown()?;
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    let demux = &config.demux;
    println!("  Read size: {} bytes", demux.read_size);
    println!("  Max read size: {} bytes", demux.max_read_size);
    println!("  Initial buffer: {} bytes", demux.initial_buffer_size);
    println!("  Sample queue: {}", demux.sample_queue);
    println!("  Frame ring capacity: {}", demux.frame_ring_capacity);
    println!("  Max element size: {} bytes", demux.max_element_size);
    println!("  Max frame size: {} bytes", demux.max_frame_size);
    println!("  Annex-B: {}", demux.annexb);

    Ok(())
}
