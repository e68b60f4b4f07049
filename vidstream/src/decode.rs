/*!
    Decode stage: turns one stream's packets into timestamped frames.
*/

use std::sync::Arc;
use std::time::Duration;

use ffmpeg_types::{FrameDecoder, StreamType, Timestamped};

use crate::frame::TimedFrame;
use crate::packet::CodedPacket;
use crate::queue::BoundedQueue;
use crate::stage::StageContext;

/**
    Timing used for frames the codec does not timestamp itself.
*/
#[derive(Clone, Copy, Debug, Default)]
struct Fallback {
    pts: Duration,
    duration: Duration,
}

impl Fallback {
    fn from_packet(packet: &CodedPacket) -> Self {
        Self {
            pts: packet.pts,
            duration: packet.duration().unwrap_or_default(),
        }
    }
}

/**
    One decode stage, instantiated per elementary stream.
*/
pub(crate) struct DecodeStage<F> {
    ctx: StageContext,
    stream: StreamType,
    decoder: Box<dyn FrameDecoder<Frame = F>>,
    packets: Arc<BoundedQueue<CodedPacket>>,
    frames: Arc<BoundedQueue<TimedFrame<F>>>,
    /// Seek generation the codec state belongs to.
    generation: u64,
    fallback: Fallback,
}

impl<F: Timestamped + Send + 'static> DecodeStage<F> {
    pub(crate) fn new(
        ctx: StageContext,
        stream: StreamType,
        decoder: Box<dyn FrameDecoder<Frame = F>>,
        packets: Arc<BoundedQueue<CodedPacket>>,
        frames: Arc<BoundedQueue<TimedFrame<F>>>,
    ) -> Self {
        Self {
            ctx,
            stream,
            decoder,
            packets,
            frames,
            generation: 0,
            fallback: Fallback::default(),
        }
    }

    pub(crate) fn run(mut self) {
        let label = Arc::clone(&self.ctx.label);
        let name = self.stream.name();
        log::debug!("[{label}] {name}_decode: started");

        while !self.ctx.stop_requested() {
            if self.frames.is_full() {
                self.ctx.idle();
                continue;
            }

            let Some(packet) = self.packets.pop(self.ctx.pop_timeout) else {
                if self.ctx.status.demux_done() && self.packets.is_empty() {
                    self.drain();
                    break;
                }
                continue;
            };

            if self.ctx.seek.is_stale(packet.generation) {
                if self.ctx.trace_items {
                    log::trace!("[{label}] {name}_decode: skipping stale packet");
                }
                continue;
            }
            if packet.generation > self.generation {
                self.decoder.reset();
                self.generation = packet.generation;
                log::debug!(
                    "[{label}] {name}_decode: codec reset for generation {}",
                    self.generation
                );
            }

            self.fallback = Fallback::from_packet(&packet);
            match self.decoder.send_packet(&packet.packet) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    log::error!("[{label}] {name}_decode: {e}, stopping stage");
                    self.ctx.events.error(format!("{name} decoder failed: {e}"));
                    self.ctx.status.set_inactive(self.stream);
                    break;
                }
                Err(e) => {
                    log::warn!(
                        "[{label}] {name}_decode: packet at {:.3}s rejected: {e}",
                        packet.pts_secs()
                    );
                    continue;
                }
            }

            self.receive_frames();
        }

        log::debug!("[{label}] {name}_decode: stopped");
    }

    /**
        Flush the codec at end of input and publish whatever it still holds.
    */
    fn drain(&mut self) {
        let label = Arc::clone(&self.ctx.label);
        let name = self.stream.name();
        if let Err(e) = self.decoder.send_eof() {
            log::warn!("[{label}] {name}_decode: drain failed: {e}");
        } else {
            self.receive_frames();
        }
        self.ctx.status.set_drained(self.stream);
        log::debug!("[{label}] {name}_decode: drained");
    }

    /**
        Publish every frame the codec is ready to emit.
    */
    fn receive_frames(&mut self) {
        loop {
            match self.decoder.receive_frame() {
                Ok(Some(frame)) => {
                    let timed = self.stamp(frame);
                    if !self.publish(timed) {
                        return;
                    }
                }
                Ok(None) => return,
                Err(e) => {
                    log::debug!(
                        "[{}] {}_decode: receive failed: {e}",
                        self.ctx.label,
                        self.stream.name()
                    );
                    return;
                }
            }
        }
    }

    fn stamp(&self, frame: F) -> TimedFrame<F> {
        let pts = frame.presentation_time().unwrap_or(self.fallback.pts);
        let duration = frame.frame_duration().unwrap_or(self.fallback.duration);
        TimedFrame::new(frame, pts, duration, self.generation)
    }

    /**
        Push a frame, retrying while the queue is full.

        Returns false if the frame was abandoned because of a stop or a newer
        seek.
    */
    fn publish(&self, mut frame: TimedFrame<F>) -> bool {
        loop {
            if self.ctx.stop_requested() || self.ctx.seek.is_stale(frame.generation) {
                return false;
            }
            match self.frames.push(frame) {
                Ok(()) => break,
                Err(rejected) => {
                    frame = rejected;
                    std::thread::sleep(self.ctx.backoff);
                }
            }
        }

        if self.ctx.trace_items {
            log::trace!(
                "[{}] {}_decode: queued frame ({} buffered)",
                self.ctx.label,
                self.stream.name(),
                self.frames.len()
            );
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::thread;

    use ffmpeg_types::{MediaSource, VideoFrame};

    use crate::config::StreamConfig;
    use crate::event::{EventSender, StreamEvent};
    use crate::seek::SeekControl;
    use crate::status::PipelineStatus;
    use crate::synthetic::SyntheticSource;

    struct Harness {
        ctx: StageContext,
        packets: Arc<BoundedQueue<CodedPacket>>,
        frames: Arc<BoundedQueue<TimedFrame<VideoFrame>>>,
        events: crossbeam_channel::Receiver<StreamEvent>,
    }

    fn harness(source: &mut SyntheticSource, frames: usize) -> (Harness, DecodeStage<VideoFrame>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let ctx = StageContext::new(
            &StreamConfig::default(),
            Arc::new(SeekControl::new()),
            Arc::new(PipelineStatus::new(true, false)),
            EventSender::new(tx),
        );
        let packets = Arc::new(BoundedQueue::new(64));
        let frame_queue = Arc::new(BoundedQueue::new(frames));
        let index = source.info().first_video().map(|s| s.index).unwrap();
        let decoder = source.open_video_decoder(index).unwrap();
        let stage = DecodeStage::new(
            ctx.clone(),
            StreamType::Video,
            decoder,
            Arc::clone(&packets),
            Arc::clone(&frame_queue),
        );
        let harness = Harness {
            ctx,
            packets,
            frames: frame_queue,
            events: rx,
        };
        (harness, stage)
    }

    fn feed(source: &mut SyntheticSource, packets: &BoundedQueue<CodedPacket>, count: usize) {
        for _ in 0..count {
            let packet = source.read_packet().unwrap();
            packets
                .push(CodedPacket::new(packet, StreamType::Video, 0))
                .unwrap();
        }
    }

    #[test]
    fn decodes_then_drains_at_end_of_input() {
        let mut source = SyntheticSource::builder()
            .duration_secs(0.5)
            .fps(10.0)
            .audio(false)
            .build();
        let (h, stage) = harness(&mut source, 16);
        feed(&mut source, &h.packets, 5);
        h.ctx.status.set_demux_finished();

        stage.run();

        assert_eq!(h.frames.len(), 5);
        assert!(h.ctx.status.is_drained(StreamType::Video));
        let pts: Vec<f64> = std::iter::from_fn(|| h.frames.try_pop())
            .map(|f| f.pts_secs())
            .collect();
        assert!(pts[0].abs() < 1e-6);
        assert!((pts[4] - 0.4).abs() < 1e-6, "{pts:?}");
    }

    #[test]
    fn delayed_codec_frames_survive_the_drain() {
        let mut source = SyntheticSource::builder()
            .duration_secs(0.5)
            .fps(10.0)
            .audio(false)
            .decoder_delay(2)
            .build();
        let (h, stage) = harness(&mut source, 16);
        feed(&mut source, &h.packets, 5);
        h.ctx.status.set_demux_finished();

        stage.run();

        assert_eq!(h.frames.len(), 5);
    }

    #[test]
    fn corrupt_packets_are_skipped() {
        let mut source = SyntheticSource::builder()
            .duration_secs(0.5)
            .fps(10.0)
            .audio(false)
            .corrupt_packets([1, 3])
            .build();
        let (h, stage) = harness(&mut source, 16);
        feed(&mut source, &h.packets, 5);
        h.ctx.status.set_demux_finished();

        stage.run();

        assert_eq!(h.frames.len(), 3);
        assert!(h.events.try_recv().is_err());
    }

    #[test]
    fn stale_packets_are_discarded() {
        let mut source = SyntheticSource::builder()
            .duration_secs(0.5)
            .fps(10.0)
            .audio(false)
            .build();
        let (h, stage) = harness(&mut source, 16);
        feed(&mut source, &h.packets, 3);
        h.ctx.seek.request(Duration::ZERO);
        h.ctx.status.set_demux_finished();

        stage.run();

        assert!(h.frames.is_empty());
    }

    #[test]
    fn full_frame_queue_holds_the_stage_until_stopped() {
        let mut source = SyntheticSource::builder()
            .duration_secs(1.0)
            .fps(10.0)
            .audio(false)
            .build();
        let (h, stage) = harness(&mut source, 2);
        feed(&mut source, &h.packets, 8);

        let handle = thread::spawn(move || stage.run());
        thread::sleep(Duration::from_millis(100));
        assert_eq!(h.frames.len(), 2);

        h.ctx.stop.store(true, Ordering::Release);
        h.packets.stop();
        handle.join().unwrap();
        assert_eq!(h.frames.len(), 2);
    }
}
