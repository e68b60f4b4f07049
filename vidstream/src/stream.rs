/*!
    The stream orchestrator: opens a container, wires the stages together
    and hands decoded frames to whoever pulls them.
*/

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use ffmpeg_decode::{DecoderConfig, FfmpegSource};
use ffmpeg_types::{
    AudioFrame, AudioStreamInfo, MediaInfo, MediaSource, StreamType, VideoFrame,
};

use crate::config::StreamConfig;
use crate::decode::DecodeStage;
use crate::demux::{DemuxStage, Route};
use crate::error::{StreamError, StreamResult};
use crate::event::{EventSender, StreamEvent};
use crate::frame::TimedFrame;
use crate::packet::CodedPacket;
use crate::queue::{BoundedQueue, Flush};
use crate::seek::SeekControl;
use crate::sink::FrameSink;
use crate::stage::{StageContext, StageHandle};
use crate::status::PipelineStatus;

/**
    Everything that belongs to one opened container.
*/
struct Session {
    label: Arc<str>,
    join_timeout: Duration,
    info: MediaInfo,
    fps: f64,
    width: u32,
    height: u32,
    audio_info: Option<AudioStreamInfo>,
    has_video: bool,
    has_audio: bool,
    video_packets: Arc<BoundedQueue<CodedPacket>>,
    audio_packets: Arc<BoundedQueue<CodedPacket>>,
    video_frames: Arc<BoundedQueue<TimedFrame<VideoFrame>>>,
    audio_frames: Arc<BoundedQueue<TimedFrame<AudioFrame>>>,
    seek: Arc<SeekControl>,
    status: Arc<PipelineStatus>,
    demux: Option<StageHandle>,
    /// Holds the demux thread back until the load has been reported.
    demux_gate: Option<Sender<()>>,
    video_stage: Option<StageHandle>,
    audio_stage: Option<StageHandle>,
    stopped: bool,
}

impl Session {
    /**
        Let the demux stage start reading.
    */
    fn release(&mut self) {
        self.demux_gate = None;
    }

    /**
        Stop the demux stage first, then the decoders, joining each one.
    */
    fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.release();

        if let Some(demux) = self.demux.take() {
            demux.request_stop();
            demux.join(&self.label, self.join_timeout);
        }

        let decoders = [
            (self.video_stage.take(), &self.video_packets),
            (self.audio_stage.take(), &self.audio_packets),
        ];
        for (stage, packets) in decoders {
            if let Some(stage) = stage {
                stage.request_stop();
                packets.stop();
                stage.join(&self.label, self.join_timeout);
            }
        }

        self.video_packets.clear();
        self.audio_packets.clear();
        self.video_frames.stop();
        self.audio_frames.stop();
        self.video_frames.clear();
        self.audio_frames.clear();
        log::debug!("[{}] session stopped", self.label);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/**
    A media stream: one demux thread and up to two decode threads feeding
    bounded frame queues.

    Frames are pulled with [`MediaStream::next_video_frame`] and
    [`MediaStream::next_audio_frame`], typically from a timer on the
    rendering side. Nothing is rendered here; pacing and A/V sync are the
    consumer's job.

    ```no_run
    use vidstream::MediaStream;

    let mut stream = MediaStream::new();
    stream.open("clip.mp4")?;
    stream.play();
    while let Some(frame) = stream.next_video_frame() {
        println!("frame at {:.3}s", frame.pts_secs());
    }
    # Ok::<(), vidstream::StreamError>(())
    ```
*/
pub struct MediaStream {
    config: StreamConfig,
    events_tx: Sender<StreamEvent>,
    events_rx: Receiver<StreamEvent>,
    session: Option<Session>,
    playing: bool,
}

impl MediaStream {
    pub fn new() -> Self {
        Self::with_config(StreamConfig::default())
    }

    pub fn with_config(config: StreamConfig) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            config,
            events_tx,
            events_rx,
            session: None,
            playing: false,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /**
        Open a file through FFmpeg, replacing any loaded session.
    */
    pub fn open(&mut self, path: impl AsRef<Path>) -> StreamResult<()> {
        let path = path.as_ref();
        self.close();
        log::info!("[{}] opening {}", self.config.log.label, path.display());

        let decoder_config = DecoderConfig::with_threads(self.config.decoder_threads);
        let result = FfmpegSource::open(path, decoder_config)
            .map_err(StreamError::from)
            .and_then(|source| self.start(Box::new(source)));
        self.finish_open(result)
    }

    /**
        Open any media source, replacing any loaded session.
    */
    pub fn open_source<S: MediaSource + 'static>(&mut self, source: S) -> StreamResult<()> {
        self.close();
        log::info!(
            "[{}] opening {} source",
            self.config.log.label,
            source.info().format_name
        );

        let result = self.start(Box::new(source));
        self.finish_open(result)
    }

    fn finish_open(&mut self, result: StreamResult<Session>) -> StreamResult<()> {
        let events = EventSender::new(self.events_tx.clone());
        match result {
            Ok(mut session) => {
                events.emit(StreamEvent::LoadFinished { success: true });
                session.release();
                log::info!(
                    "[{}] loaded: video={} audio={} duration={:?}",
                    session.label,
                    session.has_video,
                    session.has_audio,
                    session.info.duration
                );
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                log::error!("[{}] open failed: {e}", self.config.log.label);
                events.emit(StreamEvent::LoadFinished { success: false });
                events.error(e.to_string());
                Err(e)
            }
        }
    }

    /**
        Select streams, open their decoders and start the stage threads.
    */
    fn start(&self, mut source: Box<dyn MediaSource>) -> StreamResult<Session> {
        let config = &self.config;
        config.validate()?;
        let label: Arc<str> = Arc::from(config.log.label.as_str());

        let info = source.info().clone();
        let video_stream = info.first_video().cloned();
        let audio_stream = info.first_audio().cloned();
        if video_stream.is_none() && audio_stream.is_none() {
            return Err(StreamError::NoStreams);
        }

        let video_decoder = match &video_stream {
            Some(stream) => match source.open_video_decoder(stream.index) {
                Ok(decoder) => Some(decoder),
                Err(e) => {
                    log::warn!("[{label}] video decoder unavailable, continuing without video: {e}");
                    None
                }
            },
            None => None,
        };
        let audio_decoder = match &audio_stream {
            Some(stream) => match source.open_audio_decoder(stream.index) {
                Ok(decoder) => Some(decoder),
                Err(e) => {
                    log::warn!("[{label}] audio decoder unavailable, continuing without audio: {e}");
                    None
                }
            },
            None => None,
        };
        if video_decoder.is_none() && audio_decoder.is_none() {
            return Err(StreamError::NoDecoders(info.format_name.clone()));
        }

        let video_details = video_stream.as_ref().and_then(|s| s.video().copied());
        let seek = Arc::new(SeekControl::new());
        let status = Arc::new(PipelineStatus::new(
            video_decoder.is_some(),
            audio_decoder.is_some(),
        ));

        let mut session = Session {
            label: Arc::clone(&label),
            join_timeout: config.join_timeout,
            fps: video_details.and_then(|v| v.fps()).unwrap_or(0.0),
            width: video_details.map_or(0, |v| v.width),
            height: video_details.map_or(0, |v| v.height),
            audio_info: audio_stream.as_ref().and_then(|s| s.audio().copied()),
            has_video: video_decoder.is_some(),
            has_audio: audio_decoder.is_some(),
            video_packets: Arc::new(BoundedQueue::new(config.max_video_packets)),
            audio_packets: Arc::new(BoundedQueue::new(config.max_audio_packets)),
            video_frames: Arc::new(BoundedQueue::new(config.max_video_frames)),
            audio_frames: Arc::new(BoundedQueue::new(config.max_audio_frames)),
            seek: Arc::clone(&seek),
            status: Arc::clone(&status),
            demux: None,
            demux_gate: None,
            video_stage: None,
            audio_stage: None,
            stopped: false,
            info,
        };

        let events = EventSender::new(self.events_tx.clone());
        let base = StageContext::new(config, seek, status, events);
        let mut routes = Vec::new();

        if let (Some(stream), Some(decoder)) = (&video_stream, video_decoder) {
            let ctx = base.for_stage();
            let stage = DecodeStage::new(
                ctx.clone(),
                StreamType::Video,
                decoder,
                Arc::clone(&session.video_packets),
                Arc::clone(&session.video_frames),
            );
            // A failed spawn drops the session, which joins what was started
            session.video_stage = Some(StageHandle::spawn("video", &ctx, move || stage.run())?);
            routes.push(Route {
                index: stream.index,
                stream: StreamType::Video,
                queue: Arc::clone(&session.video_packets),
            });
        }

        if let (Some(stream), Some(decoder)) = (&audio_stream, audio_decoder) {
            let ctx = base.for_stage();
            let stage = DecodeStage::new(
                ctx.clone(),
                StreamType::Audio,
                decoder,
                Arc::clone(&session.audio_packets),
                Arc::clone(&session.audio_frames),
            );
            session.audio_stage = Some(StageHandle::spawn("audio", &ctx, move || stage.run())?);
            routes.push(Route {
                index: stream.index,
                stream: StreamType::Audio,
                queue: Arc::clone(&session.audio_packets),
            });
        }

        let frame_queues: Vec<Arc<dyn Flush>> = vec![
            Arc::clone(&session.video_frames) as Arc<dyn Flush>,
            Arc::clone(&session.audio_frames) as Arc<dyn Flush>,
        ];
        let ctx = base.for_stage();
        let demux = DemuxStage::new(ctx.clone(), source, routes, frame_queues);
        let (gate, held) = crossbeam_channel::bounded::<()>(0);
        session.demux = Some(StageHandle::spawn("demux", &ctx, move || {
            // Disconnects once the load is reported or the session stops
            held.recv().ok();
            demux.run();
        })?);
        session.demux_gate = Some(gate);

        Ok(session)
    }

    pub fn play(&mut self) {
        if self.session.as_ref().is_some_and(|s| !s.stopped) {
            self.playing = true;
        }
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /**
        Whether the consumer should currently be pulling frames.
    */
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /**
        Stop every stage and release the queued frames. Metadata stays
        available until [`MediaStream::close`]. Calling it again does nothing.
    */
    pub fn stop(&mut self) {
        self.playing = false;
        if let Some(session) = self.session.as_mut() {
            session.shutdown();
        }
    }

    /**
        Stop and forget the loaded session.
    */
    pub fn close(&mut self) {
        self.stop();
        self.session = None;
    }

    /**
        Reposition playback. The target is clamped to the known duration.

        Frames decoded before the seek are never returned afterwards. Seeking
        once the container has been read to the end is ignored.
    */
    pub fn seek(&mut self, position: Duration) {
        let label = &self.config.log.label;
        let Some(session) = self.session.as_ref().filter(|s| !s.stopped) else {
            log::warn!("[{label}] seek ignored, nothing loaded");
            return;
        };
        if session.status.demux_done() {
            log::warn!("[{label}] seek ignored, end of stream already reached");
            return;
        }

        let target = match session.info.duration {
            Some(duration) => position.min(duration),
            None => position,
        };
        let Some(request) = session.seek.request(target) else {
            log::warn!("[{label}] seek ignored, end of stream already reached");
            return;
        };
        session.video_frames.clear();
        session.audio_frames.clear();
        log::debug!(
            "[{label}] seek to {:.3}s requested (generation {})",
            target.as_secs_f64(),
            request.generation
        );
    }

    /**
        Next decoded video frame, waiting at most the configured pull timeout.
    */
    pub fn next_video_frame(&self) -> Option<TimedFrame<VideoFrame>> {
        let session = self.session.as_ref().filter(|s| s.has_video)?;
        pull(&session.video_frames, &session.seek, self.config.pull_timeout)
    }

    /**
        Next decoded audio frame, waiting at most the configured pull timeout.
    */
    pub fn next_audio_frame(&self) -> Option<TimedFrame<AudioFrame>> {
        let session = self.session.as_ref().filter(|s| s.has_audio)?;
        pull(&session.audio_frames, &session.seek, self.config.pull_timeout)
    }

    /**
        First available video frame, waiting up to `wait` for the decoder to
        produce one. Meant for showing a still right after opening.
    */
    pub fn preview_frame(&self, wait: Duration) -> Option<TimedFrame<VideoFrame>> {
        let session = self.session.as_ref().filter(|s| s.has_video)?;
        pull(&session.video_frames, &session.seek, wait)
    }

    /**
        Pull one video frame into `sink`. Returns false if none was ready.
    */
    pub fn deliver_video<S: FrameSink<VideoFrame> + ?Sized>(&self, sink: &mut S) -> bool {
        self.next_video_frame().map(|f| sink.accept(f)).is_some()
    }

    /**
        Pull one audio frame into `sink`. Returns false if none was ready.
    */
    pub fn deliver_audio<S: FrameSink<AudioFrame> + ?Sized>(&self, sink: &mut S) -> bool {
        self.next_audio_frame().map(|f| sink.accept(f)).is_some()
    }

    /**
        Session notifications. Every call returns a handle to the same channel.
    */
    pub fn events(&self) -> Receiver<StreamEvent> {
        self.events_rx.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.session.is_some()
    }

    /**
        True once the pipeline has nothing more to deliver: the demux stage
        is done, both decoders are drained and both frame queues are empty.
    */
    pub fn is_finished(&self) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        session.stopped
            || (session.status.demux_done()
                && session.status.is_drained(StreamType::Video)
                && session.status.is_drained(StreamType::Audio)
                && session.video_frames.is_empty()
                && session.audio_frames.is_empty())
    }

    pub fn video_frames_buffered(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.video_frames.len())
    }

    pub fn audio_frames_buffered(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.audio_frames.len())
    }

    /// Frame rate of the video stream, zero without video.
    pub fn fps(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.fps)
    }

    pub fn duration(&self) -> Option<Duration> {
        self.session.as_ref().and_then(|s| s.info.duration)
    }

    pub fn width(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.width)
    }

    pub fn height(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.height)
    }

    /// Whether a video stream was found and its decoder opened.
    pub fn has_video(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.has_video)
    }

    /// Whether an audio stream was found and its decoder opened.
    pub fn has_audio(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.has_audio)
    }

    pub fn media_info(&self) -> Option<&MediaInfo> {
        self.session.as_ref().map(|s| &s.info)
    }

    /**
        Sample rate and channel count of the selected audio stream, for
        configuring an audio output.
    */
    pub fn audio_stream_info(&self) -> Option<AudioStreamInfo> {
        self.session
            .as_ref()
            .filter(|s| s.has_audio)
            .and_then(|s| s.audio_info)
    }

    // Queue capacities take effect at the next open

    pub fn set_max_video_frames(&mut self, max: usize) {
        self.config.max_video_frames = max;
    }

    pub fn set_max_audio_frames(&mut self, max: usize) {
        self.config.max_audio_frames = max;
    }

    pub fn set_max_video_packets(&mut self, max: usize) {
        self.config.max_video_packets = max;
    }

    pub fn set_max_audio_packets(&mut self, max: usize) {
        self.config.max_audio_packets = max;
    }
}

impl Default for MediaStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("label", &self.config.log.label)
            .field("loaded", &self.is_loaded())
            .field("playing", &self.playing)
            .field("video_frames", &self.video_frames_buffered())
            .field("audio_frames", &self.audio_frames_buffered())
            .finish()
    }
}

/**
    Pop the next frame of the current seek generation, waiting at most
    `timeout` in total.
*/
fn pull<F>(
    queue: &BoundedQueue<TimedFrame<F>>,
    seek: &SeekControl,
    timeout: Duration,
) -> Option<TimedFrame<F>> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let frame = queue.pop(remaining)?;
        if !seek.is_stale(frame.generation) {
            return Some(frame);
        }
    }
}

static_assertions::assert_impl_all!(MediaStream: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticSource;

    fn drain_events(rx: &Receiver<StreamEvent>) -> Vec<StreamEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn open_reports_metadata() {
        let mut stream = MediaStream::new();
        let events = stream.events();
        let source = SyntheticSource::builder()
            .duration_secs(2.0)
            .fps(25.0)
            .size(32, 18)
            .build();
        stream.open_source(source).unwrap();

        assert!(stream.is_loaded());
        assert!(stream.has_video());
        assert!(stream.has_audio());
        assert_eq!((stream.width(), stream.height()), (32, 18));
        assert!((stream.fps() - 25.0).abs() < 1e-9);
        assert_eq!(stream.duration(), Some(Duration::from_secs(2)));
        let audio = stream.audio_stream_info().unwrap();
        assert_eq!((audio.sample_rate, audio.channels), (48_000, 2));
        assert_eq!(
            drain_events(&events).first(),
            Some(&StreamEvent::LoadFinished { success: true })
        );
    }

    #[test]
    fn open_without_streams_fails() {
        let mut stream = MediaStream::new();
        let events = stream.events();
        let source = SyntheticSource::builder().video(false).audio(false).build();
        let err = stream.open_source(source).unwrap_err();

        assert!(matches!(err, StreamError::NoStreams));
        assert!(!stream.is_loaded());
        let events = drain_events(&events);
        assert_eq!(events[0], StreamEvent::LoadFinished { success: false });
        assert!(matches!(events[1], StreamEvent::Error { .. }));
    }

    #[test]
    fn demux_waits_for_the_load_report() {
        let mut stream = MediaStream::new();
        let events = stream.events();
        let source = SyntheticSource::builder().duration_secs(1.0).build();

        let session = stream.start(Box::new(source)).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert!(drain_events(&events).is_empty());
        assert!(session.video_packets.is_empty());
        assert!(session.video_frames.is_empty());

        stream.finish_open(Ok(session)).unwrap();
        let frame = stream.preview_frame(Duration::from_secs(5));
        assert!(frame.is_some());
        let events = drain_events(&events);
        assert_eq!(events[0], StreamEvent::LoadFinished { success: true });
        let loads = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::LoadFinished { .. }))
            .count();
        assert_eq!(loads, 1);
    }

    #[test]
    fn unreleased_session_still_shuts_down() {
        let stream = MediaStream::new();
        let source = SyntheticSource::builder().duration_secs(1.0).build();
        let mut session = stream.start(Box::new(source)).unwrap();
        session.shutdown();
        assert!(session.demux.is_none());
    }

    #[test]
    fn open_without_any_decoder_fails() {
        let mut stream = MediaStream::new();
        let source = SyntheticSource::builder()
            .fail_video_decoder(true)
            .fail_audio_decoder(true)
            .build();
        let err = stream.open_source(source).unwrap_err();
        assert!(matches!(err, StreamError::NoDecoders(_)));
    }

    #[test]
    fn missing_file_fails_to_open() {
        let mut stream = MediaStream::new();
        let err = stream.open("/definitely/not/here.mkv").unwrap_err();
        assert!(matches!(err, StreamError::Source(_)));
        assert!(!stream.is_loaded());
    }

    #[test]
    fn invalid_config_fails_to_open() {
        let mut stream = MediaStream::new();
        stream.set_max_video_frames(0);
        let err = stream
            .open_source(SyntheticSource::builder().build())
            .unwrap_err();
        assert!(matches!(err, StreamError::Config(_)));
    }

    #[test]
    fn play_requires_a_session() {
        let mut stream = MediaStream::new();
        stream.play();
        assert!(!stream.is_playing());

        stream
            .open_source(SyntheticSource::builder().duration_secs(1.0).build())
            .unwrap();
        stream.play();
        assert!(stream.is_playing());
        stream.pause();
        assert!(!stream.is_playing());
    }

    #[test]
    fn preview_waits_for_first_frame() {
        let mut stream = MediaStream::new();
        stream
            .open_source(SyntheticSource::builder().duration_secs(1.0).build())
            .unwrap();
        let frame = stream.preview_frame(Duration::from_secs(5)).unwrap();
        assert!(frame.pts_secs().abs() < 1e-6);
    }

    #[test]
    fn stop_keeps_metadata_and_close_drops_it() {
        let mut stream = MediaStream::new();
        stream
            .open_source(SyntheticSource::builder().duration_secs(1.0).build())
            .unwrap();
        stream.play();
        stream.stop();
        stream.stop();

        assert!(!stream.is_playing());
        assert!(stream.is_loaded());
        assert!(stream.is_finished());
        assert!(stream.next_video_frame().is_none());
        assert_eq!(stream.duration(), Some(Duration::from_secs(1)));

        stream.close();
        assert!(!stream.is_loaded());
        assert_eq!(stream.duration(), None);
    }

    #[test]
    fn capacities_apply_at_next_open() {
        let mut stream = MediaStream::new();
        stream.set_max_video_frames(3);
        stream.set_max_audio_frames(4);
        stream.set_max_video_packets(5);
        stream.set_max_audio_packets(6);
        assert_eq!(stream.config().max_video_frames, 3);

        stream
            .open_source(SyntheticSource::builder().duration_secs(1.0).build())
            .unwrap();
        std::thread::sleep(Duration::from_millis(200));
        assert!(stream.video_frames_buffered() <= 3);
        assert!(stream.audio_frames_buffered() <= 4);
    }

    #[test]
    fn reopen_replaces_session() {
        let mut stream = MediaStream::new();
        stream
            .open_source(SyntheticSource::builder().duration_secs(1.0).build())
            .unwrap();
        stream
            .open_source(SyntheticSource::builder().duration_secs(3.0).audio(false).build())
            .unwrap();
        assert_eq!(stream.duration(), Some(Duration::from_secs(3)));
        assert!(!stream.has_audio());
    }
}
