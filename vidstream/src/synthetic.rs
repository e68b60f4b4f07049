/*!
    Deterministic in-memory media source.

    Produces a test-pattern container with an optional video stream (small
    YUV 4:2:0 frames, keyframe every `keyframe_interval` frames) and an
    optional audio stream (48 kHz stereo, 1024 samples per packet), with
    packets interleaved by presentation time. Failures can be injected at
    every seam the pipeline handles, which makes it the backend used by the
    tests and by the CLI's `--synthetic` mode.
*/

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use ffmpeg_types::{
    AudioFrame, AudioStreamInfo, CodecId, Error, FrameDecoder, MediaDuration, MediaInfo,
    MediaSource, Packet, PixelFormat, Pts, Rational, Result, SampleFormat, StreamDetails,
    StreamInfo, VideoFrame, VideoStreamInfo,
};

const VIDEO_TIME_BASE: Rational = Rational::new(1, 90_000);
const SAMPLES_PER_PACKET: u32 = 1024;

/// Longest pattern the builder will schedule, in seconds.
pub const MAX_DURATION_SECS: f64 = 3600.0;
/// Highest frame rate the builder accepts.
pub const MAX_FPS: f64 = 240.0;

const KIND_VIDEO: u8 = 0;
const KIND_AUDIO: u8 = 1;

#[derive(Clone, Debug)]
struct Settings {
    duration_secs: f64,
    fps: f64,
    width: u32,
    height: u32,
    keyframe_interval: u64,
    sample_rate: u32,
    channels: u16,
    video: bool,
    audio: bool,
    cover_art: bool,
    fail_read_at: Option<usize>,
    fail_seek: bool,
    fail_video_decoder: bool,
    fail_audio_decoder: bool,
    corrupt: HashSet<u64>,
    decoder_delay: usize,
    fatal_video_after: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            duration_secs: 10.0,
            fps: 30.0,
            width: 64,
            height: 36,
            keyframe_interval: 30,
            sample_rate: 48_000,
            channels: 2,
            video: true,
            audio: true,
            cover_art: false,
            fail_read_at: None,
            fail_seek: false,
            fail_video_decoder: false,
            fail_audio_decoder: false,
            corrupt: HashSet::new(),
            decoder_delay: 0,
            fatal_video_after: None,
        }
    }
}

/**
    Builder for [`SyntheticSource`].
*/
#[derive(Clone, Debug, Default)]
pub struct SyntheticBuilder {
    settings: Settings,
}

impl SyntheticBuilder {
    /// Clamped to `0..=MAX_DURATION_SECS`; NaN counts as zero.
    pub fn duration_secs(mut self, secs: f64) -> Self {
        self.settings.duration_secs = if secs.is_nan() {
            0.0
        } else {
            secs.clamp(0.0, MAX_DURATION_SECS)
        };
        self
    }

    pub fn fps(mut self, fps: f64) -> Self {
        self.settings.fps = if fps > 0.0 && fps.is_finite() {
            fps.min(MAX_FPS)
        } else {
            30.0
        };
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.settings.width = width.max(1);
        self.settings.height = height.max(1);
        self
    }

    /// Frames per GOP; seeks land on multiples of this.
    pub fn keyframe_interval(mut self, frames: u64) -> Self {
        self.settings.keyframe_interval = frames.max(1);
        self
    }

    pub fn video(mut self, enabled: bool) -> Self {
        self.settings.video = enabled;
        self
    }

    pub fn audio(mut self, enabled: bool) -> Self {
        self.settings.audio = enabled;
        self
    }

    /// Add an attached-picture stream ahead of the video stream.
    pub fn cover_art(mut self, enabled: bool) -> Self {
        self.settings.cover_art = enabled;
        self
    }

    /// Make the read with this zero-based index fail.
    pub fn fail_read_at(mut self, read: usize) -> Self {
        self.settings.fail_read_at = Some(read);
        self
    }

    pub fn fail_seek(mut self, fail: bool) -> Self {
        self.settings.fail_seek = fail;
        self
    }

    pub fn fail_video_decoder(mut self, fail: bool) -> Self {
        self.settings.fail_video_decoder = fail;
        self
    }

    pub fn fail_audio_decoder(mut self, fail: bool) -> Self {
        self.settings.fail_audio_decoder = fail;
        self
    }

    /// Per-stream packet sequence numbers the decoders reject as invalid.
    pub fn corrupt_packets(mut self, sequence: impl IntoIterator<Item = u64>) -> Self {
        self.settings.corrupt.extend(sequence);
        self
    }

    /// Number of frames each decoder holds back until more input or a drain.
    pub fn decoder_delay(mut self, frames: usize) -> Self {
        self.settings.decoder_delay = frames;
        self
    }

    /// The video decoder reports itself closed after this many packets.
    pub fn fatal_video_after(mut self, packets: u64) -> Self {
        self.settings.fatal_video_after = Some(packets);
        self
    }

    pub fn build(self) -> SyntheticSource {
        SyntheticSource::new(self.settings)
    }
}

#[derive(Clone, Copy, Debug)]
struct Scheduled {
    kind: u8,
    seq: u64,
    secs: f64,
}

/**
    An in-memory container implementing [`MediaSource`].
*/
#[derive(Debug)]
pub struct SyntheticSource {
    settings: Arc<Settings>,
    info: MediaInfo,
    schedule: Vec<Scheduled>,
    cursor: usize,
    reads: usize,
    video_index: Option<usize>,
    audio_index: Option<usize>,
}

impl SyntheticSource {
    pub fn builder() -> SyntheticBuilder {
        SyntheticBuilder::default()
    }

    fn new(settings: Settings) -> Self {
        let mut streams = Vec::new();
        let mut next_index = 0;

        if settings.cover_art {
            streams.push(StreamInfo {
                index: next_index,
                codec: CodecId::Png,
                time_base: Rational::new(1, 90_000),
                details: StreamDetails::Video(VideoStreamInfo {
                    width: 300,
                    height: 300,
                    avg_frame_rate: Rational::new(0, 0),
                    base_frame_rate: Rational::new(90_000, 1),
                }),
                attached_picture: true,
            });
            next_index += 1;
        }

        let video_index = settings.video.then(|| {
            let fps = fps_rational(settings.fps);
            streams.push(StreamInfo {
                index: next_index,
                codec: CodecId::RawVideo,
                time_base: VIDEO_TIME_BASE,
                details: StreamDetails::Video(VideoStreamInfo {
                    width: settings.width,
                    height: settings.height,
                    avg_frame_rate: fps,
                    base_frame_rate: fps,
                }),
                attached_picture: false,
            });
            next_index += 1;
            next_index - 1
        });

        let audio_index = settings.audio.then(|| {
            streams.push(StreamInfo {
                index: next_index,
                codec: CodecId::PcmF32Le,
                time_base: Rational::new(1, settings.sample_rate as i32),
                details: StreamDetails::Audio(AudioStreamInfo {
                    sample_rate: settings.sample_rate,
                    channels: settings.channels,
                }),
                attached_picture: false,
            });
            next_index
        });

        let schedule = build_schedule(&settings);
        let info = MediaInfo {
            format_name: "synthetic".to_string(),
            duration: Some(Duration::from_secs_f64(settings.duration_secs)),
            streams,
        };

        Self {
            settings: Arc::new(settings),
            info,
            schedule,
            cursor: 0,
            reads: 0,
            video_index,
            audio_index,
        }
    }

    /// Number of video packets in the container.
    pub fn video_packet_count(&self) -> usize {
        self.schedule.iter().filter(|s| s.kind == KIND_VIDEO).count()
    }

    /// Number of audio packets in the container.
    pub fn audio_packet_count(&self) -> usize {
        self.schedule.iter().filter(|s| s.kind == KIND_AUDIO).count()
    }

    /// Keyframe spacing in seconds.
    pub fn keyframe_spacing(&self) -> Duration {
        Duration::from_secs_f64(self.settings.keyframe_interval as f64 / self.settings.fps)
    }

    fn packet(&self, entry: Scheduled) -> Packet {
        let mut data = Vec::with_capacity(9);
        data.push(entry.kind);
        data.extend_from_slice(&entry.seq.to_le_bytes());

        let fps = self.settings.fps;
        let (stream_index, pts, duration, time_base, is_keyframe) = if entry.kind == KIND_VIDEO {
            (
                self.video_index.unwrap_or_default(),
                video_pts(entry.seq, fps),
                video_pts(entry.seq + 1, fps) - video_pts(entry.seq, fps),
                VIDEO_TIME_BASE,
                entry.seq % self.settings.keyframe_interval == 0,
            )
        } else {
            (
                self.audio_index.unwrap_or_default(),
                (entry.seq * u64::from(SAMPLES_PER_PACKET)) as i64,
                i64::from(SAMPLES_PER_PACKET),
                Rational::new(1, self.settings.sample_rate as i32),
                true,
            )
        };

        Packet {
            data,
            stream_index,
            pts: Some(Pts(pts)),
            dts: Some(Pts(pts)),
            duration: MediaDuration(duration),
            time_base,
            is_keyframe,
        }
    }

    /**
        Seek position of the keyframe at or before `target`, clamped to the
        last keyframe of the stream.
    */
    fn keyframe_at_or_before(&self, target: Duration) -> f64 {
        let settings = &self.settings;
        if settings.video {
            let frames = self.video_packet_count() as u64;
            let gop = settings.keyframe_interval;
            let last_key = frames.saturating_sub(1) / gop * gop;
            let wanted = (target.as_secs_f64() * settings.fps + 1e-9).floor() as u64 / gop * gop;
            video_pts(wanted.min(last_key), settings.fps) as f64 / 90_000.0
        } else {
            let packets = self.audio_packet_count() as u64;
            let per_packet = f64::from(SAMPLES_PER_PACKET) / f64::from(settings.sample_rate);
            let wanted = (target.as_secs_f64() / per_packet).floor() as u64;
            wanted.min(packets.saturating_sub(1)) as f64 * per_packet
        }
    }
}

impl MediaSource for SyntheticSource {
    fn info(&self) -> &MediaInfo {
        &self.info
    }

    fn read_packet(&mut self) -> Result<Packet> {
        let read = self.reads;
        self.reads += 1;
        if self.settings.fail_read_at == Some(read) {
            return Err(Error::invalid_data("synthetic read failure"));
        }

        let entry = *self.schedule.get(self.cursor).ok_or(Error::Eof)?;
        self.cursor += 1;
        Ok(self.packet(entry))
    }

    fn seek(&mut self, target: Duration) -> Result<()> {
        if self.settings.fail_seek {
            return Err(Error::seek("synthetic seek failure"));
        }
        let position = self.keyframe_at_or_before(target);
        self.cursor = self
            .schedule
            .iter()
            .position(|entry| entry.secs >= position - 1e-9)
            .unwrap_or(self.schedule.len());
        Ok(())
    }

    fn open_video_decoder(
        &mut self,
        stream_index: usize,
    ) -> Result<Box<dyn FrameDecoder<Frame = VideoFrame>>> {
        if self.video_index != Some(stream_index) {
            return Err(Error::stream_info(format!(
                "stream {stream_index} is not a video stream"
            )));
        }
        if self.settings.fail_video_decoder {
            return Err(Error::codec("synthetic video decoder unavailable"));
        }
        Ok(Box::new(SyntheticVideoDecoder {
            core: CodecCore::new(&self.settings, self.settings.fatal_video_after),
            settings: Arc::clone(&self.settings),
        }))
    }

    fn open_audio_decoder(
        &mut self,
        stream_index: usize,
    ) -> Result<Box<dyn FrameDecoder<Frame = AudioFrame>>> {
        if self.audio_index != Some(stream_index) {
            return Err(Error::stream_info(format!(
                "stream {stream_index} is not an audio stream"
            )));
        }
        if self.settings.fail_audio_decoder {
            return Err(Error::codec("synthetic audio decoder unavailable"));
        }
        Ok(Box::new(SyntheticAudioDecoder {
            core: CodecCore::new(&self.settings, None),
            settings: Arc::clone(&self.settings),
        }))
    }
}

/**
    Packet bookkeeping shared by both synthetic decoders.
*/
#[derive(Debug)]
struct CodecCore {
    held: VecDeque<Decoded>,
    delay: usize,
    corrupt: HashSet<u64>,
    fatal_after: Option<u64>,
    sent: u64,
    eof: bool,
}

#[derive(Clone, Copy, Debug)]
struct Decoded {
    seq: u64,
    pts: i64,
    duration: i64,
}

impl CodecCore {
    fn new(settings: &Settings, fatal_after: Option<u64>) -> Self {
        Self {
            held: VecDeque::new(),
            delay: settings.decoder_delay,
            corrupt: settings.corrupt.clone(),
            fatal_after,
            sent: 0,
            eof: false,
        }
    }

    fn send(&mut self, packet: &Packet, kind: u8) -> Result<()> {
        if self.eof {
            return Err(Error::decoder_closed("codec already drained"));
        }
        self.sent += 1;
        if self.fatal_after.is_some_and(|limit| self.sent > limit) {
            return Err(Error::decoder_closed("synthetic codec torn down"));
        }

        let seq = match packet.data.as_slice() {
            [k, rest @ ..] if *k == kind && rest.len() == 8 => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(rest);
                u64::from_le_bytes(bytes)
            }
            _ => return Err(Error::invalid_data("unrecognized synthetic packet")),
        };
        if self.corrupt.contains(&seq) {
            return Err(Error::invalid_data(format!("corrupt packet {seq}")));
        }

        self.held.push_back(Decoded {
            seq,
            pts: packet.pts.map(|p| p.0).unwrap_or_default(),
            duration: packet.duration.0,
        });
        Ok(())
    }

    fn next(&mut self) -> Option<Decoded> {
        if self.held.len() > self.delay || (self.eof && !self.held.is_empty()) {
            self.held.pop_front()
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.held.clear();
        self.eof = false;
    }
}

#[derive(Debug)]
struct SyntheticVideoDecoder {
    core: CodecCore,
    settings: Arc<Settings>,
}

impl FrameDecoder for SyntheticVideoDecoder {
    type Frame = VideoFrame;

    fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        self.core.send(packet, KIND_VIDEO)
    }

    fn receive_frame(&mut self) -> Result<Option<VideoFrame>> {
        let Some(decoded) = self.core.next() else {
            return Ok(None);
        };
        let (width, height) = (self.settings.width, self.settings.height);
        let format = PixelFormat::Yuv420p;
        Ok(Some(VideoFrame {
            data: vec![(decoded.seq % 256) as u8; format.frame_size(width, height)],
            width,
            height,
            format,
            pts: Some(Pts(decoded.pts)),
            duration: MediaDuration(decoded.duration),
            time_base: VIDEO_TIME_BASE,
        }))
    }

    fn send_eof(&mut self) -> Result<()> {
        self.core.eof = true;
        Ok(())
    }

    fn reset(&mut self) {
        self.core.reset();
    }
}

#[derive(Debug)]
struct SyntheticAudioDecoder {
    core: CodecCore,
    settings: Arc<Settings>,
}

impl FrameDecoder for SyntheticAudioDecoder {
    type Frame = AudioFrame;

    fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        self.core.send(packet, KIND_AUDIO)
    }

    fn receive_frame(&mut self) -> Result<Option<AudioFrame>> {
        let Some(decoded) = self.core.next() else {
            return Ok(None);
        };
        let samples = SAMPLES_PER_PACKET as usize;
        let format = SampleFormat::F32;
        let channels = self.settings.channels;
        Ok(Some(AudioFrame {
            data: vec![0u8; samples * channels as usize * format.bytes_per_sample()],
            samples,
            sample_rate: self.settings.sample_rate,
            channels,
            format,
            pts: Some(Pts(decoded.pts)),
            time_base: Rational::new(1, self.settings.sample_rate as i32),
        }))
    }

    fn send_eof(&mut self) -> Result<()> {
        self.core.eof = true;
        Ok(())
    }

    fn reset(&mut self) {
        self.core.reset();
    }
}

fn fps_rational(fps: f64) -> Rational {
    Rational::new((fps * 1000.0).round() as i32, 1000)
}

fn video_pts(seq: u64, fps: f64) -> i64 {
    (seq as f64 * 90_000.0 / fps).round() as i64
}

/**
    All packets of the container in presentation order, video first on ties.
*/
fn build_schedule(settings: &Settings) -> Vec<Scheduled> {
    let mut schedule = Vec::new();

    if settings.video {
        let frames = (settings.duration_secs * settings.fps + 1e-9).floor() as u64;
        schedule.extend((0..frames).map(|seq| Scheduled {
            kind: KIND_VIDEO,
            seq,
            secs: video_pts(seq, settings.fps) as f64 / 90_000.0,
        }));
    }

    if settings.audio {
        let per_packet = f64::from(SAMPLES_PER_PACKET) / f64::from(settings.sample_rate);
        let packets = (settings.duration_secs / per_packet - 1e-9).ceil().max(0.0) as u64;
        schedule.extend((0..packets).map(|seq| Scheduled {
            kind: KIND_AUDIO,
            seq,
            secs: seq as f64 * per_packet,
        }));
    }

    schedule.sort_by(|a, b| a.secs.total_cmp(&b.secs).then(a.kind.cmp(&b.kind)));
    schedule
}

static_assertions::assert_impl_all!(SyntheticSource: Send, MediaSource);

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_types::MediaKind;

    fn read_all(source: &mut SyntheticSource) -> Vec<Packet> {
        std::iter::from_fn(|| source.read_packet().ok()).collect()
    }

    #[test]
    fn ten_seconds_at_thirty_fps() {
        let mut source = SyntheticSource::builder().build();
        assert_eq!(source.video_packet_count(), 300);
        assert_eq!(source.audio_packet_count(), 469);
        assert_eq!(source.info().primary_kind(), MediaKind::Video);
        assert_eq!(read_all(&mut source).len(), 769);
        assert!(matches!(source.read_packet(), Err(Error::Eof)));
    }

    #[test]
    fn unusable_lengths_are_clamped() {
        let source = SyntheticSource::builder()
            .duration_secs(f64::INFINITY)
            .fps(f64::INFINITY)
            .audio(false)
            .build();
        assert_eq!(source.info().duration, Some(Duration::from_secs(3600)));
        assert_eq!(source.video_packet_count(), 3600 * 30);

        let source = SyntheticSource::builder().duration_secs(f64::NAN).build();
        assert_eq!(source.video_packet_count(), 0);
        assert_eq!(source.audio_packet_count(), 0);
    }

    #[test]
    fn packets_are_interleaved_by_time() {
        let mut source = SyntheticSource::builder().duration_secs(1.0).build();
        let times: Vec<f64> = read_all(&mut source)
            .iter()
            .map(Packet::presentation_seconds)
            .collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1] + 1e-9));
    }

    #[test]
    fn seek_lands_on_preceding_keyframe() {
        let mut source = SyntheticSource::builder().audio(false).build();
        source.seek(Duration::from_millis(4500)).unwrap();
        let packet = source.read_packet().unwrap();
        assert!(packet.is_keyframe);
        assert!((packet.presentation_seconds() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn seek_past_end_replays_last_gop() {
        let mut source = SyntheticSource::builder().audio(false).build();
        source.seek(Duration::from_secs(60)).unwrap();
        assert_eq!(read_all(&mut source).len(), 30);
    }

    #[test]
    fn cover_art_is_not_the_video_stream() {
        let source = SyntheticSource::builder().cover_art(true).build();
        let video = source.info().first_video().unwrap();
        assert_eq!(video.index, 1);
        assert!(source.info().streams[0].attached_picture);
    }

    #[test]
    fn decoder_delay_releases_on_drain() {
        let mut source = SyntheticSource::builder()
            .audio(false)
            .decoder_delay(1)
            .build();
        let mut decoder = source.open_video_decoder(0).unwrap();
        let packet = source.read_packet().unwrap();
        decoder.send_packet(&packet).unwrap();
        assert!(decoder.receive_frame().unwrap().is_none());
        decoder.send_eof().unwrap();
        assert!(decoder.receive_frame().unwrap().is_some());
        assert!(decoder.send_packet(&packet).unwrap_err().is_fatal());
        decoder.reset();
        assert!(decoder.send_packet(&packet).is_ok());
    }

    #[test]
    fn injected_failures() {
        let mut source = SyntheticSource::builder()
            .fail_read_at(1)
            .fail_seek(true)
            .fail_audio_decoder(true)
            .build();
        assert!(source.read_packet().is_ok());
        assert!(matches!(source.read_packet(), Err(Error::InvalidData { .. })));
        assert!(source.seek(Duration::ZERO).is_err());
        assert!(source.open_audio_decoder(1).is_err());
        assert!(source.open_video_decoder(0).is_ok());
    }
}
