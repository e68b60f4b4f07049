use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail, ensure};
use clap::{Parser, ValueEnum};

use vidstream::{
    FrameSink, MediaStream, OverflowPolicy, StreamConfig, StreamEvent, SyntheticSource,
    TimedFrame, format_duration,
};

const AUDIO_TICK: Duration = Duration::from_millis(10);
const FALLBACK_VIDEO_TICK: Duration = Duration::from_millis(40);

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Overflow {
    Drop,
    Backpressure,
}

impl From<Overflow> for OverflowPolicy {
    fn from(value: Overflow) -> Self {
        match value {
            Overflow::Drop => OverflowPolicy::Drop,
            Overflow::Backpressure => OverflowPolicy::Backpressure,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "vidstream")]
#[command(about = "Headless playback through the vidstream decode pipeline")]
struct Args {
    /// Media file to play
    #[arg(required_unless_present = "synthetic")]
    path: Option<PathBuf>,

    /// Play a synthetic test pattern of this many seconds instead of a file (at most an hour)
    #[arg(long, value_name = "SECS", conflicts_with = "path")]
    synthetic: Option<f64>,

    /// Leave the audio stream out of the synthetic pattern
    #[arg(long, requires = "synthetic")]
    no_audio: bool,

    /// Seek to this position (seconds) right after opening
    #[arg(long, value_name = "SECS")]
    seek: Option<f64>,

    /// Stop after this many seconds of playback
    #[arg(long, value_name = "SECS")]
    limit: Option<f64>,

    /// Config file (defaults to the per-user config, if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// What to do with packets whose queue is full
    #[arg(long, value_enum)]
    overflow: Option<Overflow>,

    #[arg(long)]
    max_video_frames: Option<usize>,

    #[arg(long)]
    max_audio_frames: Option<usize>,

    #[arg(long)]
    max_video_packets: Option<usize>,

    #[arg(long)]
    max_audio_packets: Option<usize>,

    /// Codec threads for file playback (0 picks automatically)
    #[arg(long)]
    decoder_threads: Option<u16>,

    /// Log every packet and frame at trace level
    #[arg(long)]
    trace_items: bool,
}

impl Args {
    fn stream_config(&self) -> Result<StreamConfig> {
        let mut config = match &self.config {
            Some(path) => StreamConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => StreamConfig::load_or_default().context("loading default config")?,
        };
        if let Some(overflow) = self.overflow {
            config.overflow = overflow.into();
        }
        let overrides = [
            (&mut config.max_video_frames, self.max_video_frames),
            (&mut config.max_audio_frames, self.max_audio_frames),
            (&mut config.max_video_packets, self.max_video_packets),
            (&mut config.max_audio_packets, self.max_audio_packets),
        ];
        for (field, value) in overrides {
            if let Some(value) = value {
                *field = value;
            }
        }
        if let Some(threads) = self.decoder_threads {
            config.decoder_threads = threads;
        }
        config.log.trace_items |= self.trace_items;
        config.validate()?;
        Ok(config)
    }

    fn seek(&self) -> Result<Option<Duration>> {
        self.seek.map(|secs| seconds("--seek", secs)).transpose()
    }

    fn limit(&self) -> Result<Option<Duration>> {
        self.limit.map(|secs| seconds("--limit", secs)).transpose()
    }
}

/**
    A non-negative, finite number of seconds given on the command line.
*/
fn seconds(flag: &str, secs: f64) -> Result<Duration> {
    ensure!(
        secs.is_finite() && secs >= 0.0,
        "{flag} expects a non-negative number of seconds, got {secs}"
    );
    Duration::try_from_secs_f64(secs).with_context(|| format!("{flag} {secs} is out of range"))
}

/**
    Counts what a sink was handed.
*/
#[derive(Debug, Default)]
struct Tally {
    frames: u64,
    first: Option<Duration>,
    last: Duration,
}

impl<F> FrameSink<F> for Tally {
    fn accept(&mut self, frame: TimedFrame<F>) {
        self.frames += 1;
        self.first.get_or_insert(frame.pts);
        self.last = frame.pts;
    }
}

impl std::fmt::Display for Tally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.first {
            Some(first) => write!(
                f,
                "{} frames ({} - {})",
                self.frames,
                format_duration(first),
                format_duration(self.last)
            ),
            None => write!(f, "no frames"),
        }
    }
}

fn init_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .filter_module("ffmpeg_next", log::LevelFilter::Warn)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let config = args.stream_config()?;
    let seek = args.seek()?;
    let limit = args.limit()?;

    let mut stream = MediaStream::with_config(config);
    let events = stream.events();

    match (&args.path, args.synthetic) {
        (_, Some(secs)) => {
            seconds("--synthetic", secs)?;
            let source = SyntheticSource::builder()
                .duration_secs(secs)
                .audio(!args.no_audio)
                .build();
            stream.open_source(source)?;
        }
        (Some(path), None) => stream
            .open(path)
            .with_context(|| format!("opening {}", path.display()))?,
        (None, None) => bail!("nothing to play"),
    }

    println!(
        "Loaded: {} video={} ({}x{} @ {:.2} fps) audio={}",
        stream.duration().map(format_duration).unwrap_or_else(|| "--:--".into()),
        stream.has_video(),
        stream.width(),
        stream.height(),
        stream.fps(),
        stream
            .audio_stream_info()
            .map(|a| format!("{} Hz x{}", a.sample_rate, a.channels))
            .unwrap_or_else(|| "none".into()),
    );

    if let Some(position) = seek {
        stream.seek(position);
    }

    let video_tick = Duration::try_from_secs_f64(1.0 / stream.fps())
        .ok()
        .filter(|tick| !tick.is_zero())
        .unwrap_or(FALLBACK_VIDEO_TICK);

    let mut video = Tally::default();
    let mut audio = Tally::default();
    let mut errors = 0usize;

    stream.play();
    let start = Instant::now();
    let mut next_video = start;
    let mut next_audio = start;

    while stream.is_playing() {
        for event in events.try_iter() {
            match event {
                StreamEvent::EndOfStream => log::info!("end of stream reached"),
                StreamEvent::Error { message } => {
                    errors += 1;
                    eprintln!("[vidstream] error: {message}");
                }
                StreamEvent::LoadFinished { .. } => {}
            }
        }
        if stream.is_finished() || limit.is_some_and(|limit| start.elapsed() >= limit) {
            break;
        }

        let now = Instant::now();
        if now >= next_video {
            next_video += video_tick;
            stream.deliver_video(&mut video);
        }
        if now >= next_audio {
            next_audio += AUDIO_TICK;
            stream.deliver_audio(&mut audio);
        }

        let wake = next_video.min(next_audio);
        thread::sleep(wake.saturating_duration_since(Instant::now()));
    }

    stream.stop();

    println!("Played {} of wall-clock time", format_duration(start.elapsed()));
    println!("  video: {video}");
    println!("  audio: {audio}");
    if errors > 0 {
        println!("  errors: {errors}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("vidstream").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn seconds_must_be_finite_and_non_negative() {
        assert_eq!(seconds("--seek", 1.5).unwrap(), Duration::from_millis(1500));
        assert!(seconds("--seek", f64::INFINITY).is_err());
        assert!(seconds("--seek", f64::NAN).is_err());
        assert!(seconds("--limit", -1.0).is_err());
    }

    #[test]
    fn infinite_seek_and_limit_are_rejected() {
        let args = parse(&["--synthetic", "2", "--seek", "inf"]);
        assert!(args.seek().is_err());

        let args = parse(&["--synthetic", "2", "--limit", "inf"]);
        assert!(args.limit().is_err());

        let args = parse(&["--synthetic", "2", "--seek", "1", "--limit", "3"]);
        assert_eq!(args.seek().unwrap(), Some(Duration::from_secs(1)));
        assert_eq!(args.limit().unwrap(), Some(Duration::from_secs(3)));
    }
}
