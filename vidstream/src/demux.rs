/*!
    Demux stage: reads packets from the container and routes them to the
    per-stream packet queues.
*/

use std::sync::Arc;

use ffmpeg_types::{Error, MediaSource, Packet, StreamType};

use crate::config::OverflowPolicy;
use crate::event::StreamEvent;
use crate::packet::CodedPacket;
use crate::queue::{BoundedQueue, Flush};
use crate::seek::SeekRequest;
use crate::stage::StageContext;

/**
    A container stream feeding one decode stage.
*/
pub(crate) struct Route {
    pub index: usize,
    pub stream: StreamType,
    pub queue: Arc<BoundedQueue<CodedPacket>>,
}

pub(crate) struct DemuxStage {
    ctx: StageContext,
    source: Box<dyn MediaSource>,
    routes: Vec<Route>,
    /// Frame queues flushed together with the packet queues on seek.
    frame_queues: Vec<Arc<dyn Flush>>,
    /// Seek generation of the packets currently being read.
    generation: u64,
    /// Packet waiting for room in its queue (backpressure only).
    pending: Option<CodedPacket>,
    dropped: u64,
}

impl DemuxStage {
    pub(crate) fn new(
        ctx: StageContext,
        source: Box<dyn MediaSource>,
        routes: Vec<Route>,
        frame_queues: Vec<Arc<dyn Flush>>,
    ) -> Self {
        Self {
            ctx,
            source,
            routes,
            frame_queues,
            generation: 0,
            pending: None,
            dropped: 0,
        }
    }

    pub(crate) fn run(mut self) {
        let label = Arc::clone(&self.ctx.label);
        log::debug!("[{label}] demux: started with {} routes", self.routes.len());

        while !self.ctx.stop_requested() {
            if let Some(request) = self.ctx.seek.take() {
                self.apply_seek(request);
                continue;
            }

            if let Some(packet) = self.pending.take() {
                if let Err(packet) = self.deliver_pending(packet) {
                    self.pending = Some(packet);
                    self.ctx.idle();
                    continue;
                }
            }

            if self.saturated() {
                self.ctx.idle();
                continue;
            }

            match self.source.read_packet() {
                Ok(packet) => self.route(packet),
                Err(Error::Eof) => {
                    if let Some(request) = self.ctx.seek.close() {
                        log::debug!("[{label}] demux: seek arrived at end of stream");
                        self.apply_seek(request);
                        continue;
                    }
                    log::info!(
                        "[{label}] demux: end of stream ({} packets dropped)",
                        self.dropped
                    );
                    self.ctx.status.set_demux_finished();
                    self.ctx.events.emit(StreamEvent::EndOfStream);
                    break;
                }
                Err(e) => {
                    log::error!("[{label}] demux: read failed: {e}");
                    if let Some(request) = self.ctx.seek.abandon(self.generation) {
                        log::warn!(
                            "[{label}] demux: dropping seek to {:.3}s after read failure",
                            request.target.as_secs_f64()
                        );
                    }
                    self.ctx.status.set_demux_failed();
                    self.ctx.events.error(format!("read failed: {e}"));
                    break;
                }
            }
        }

        log::debug!("[{label}] demux: stopped");
    }

    /**
        Reposition the container and flush everything queued downstream.

        A failed seek still flushes and adopts the new generation, so the
        pipeline keeps a single consistent position.
    */
    fn apply_seek(&mut self, request: SeekRequest) {
        let label = &self.ctx.label;
        if let Err(e) = self.source.seek(request.target) {
            log::warn!(
                "[{label}] demux: seek to {:.3}s failed: {e}",
                request.target.as_secs_f64()
            );
            self.ctx.events.error(format!(
                "seek to {:.3}s failed: {e}",
                request.target.as_secs_f64()
            ));
        }

        self.pending = None;
        let packets: usize = self.routes.iter().map(|r| r.queue.clear()).sum();
        let frames: usize = self.frame_queues.iter().map(|q| q.flush()).sum();
        self.generation = request.generation;

        log::debug!(
            "[{label}] demux: seek to {:.3}s (generation {}), flushed {packets} packets and {frames} frames",
            request.target.as_secs_f64(),
            request.generation
        );
    }

    /**
        True when every stream that still has a running decoder has a full
        packet queue.
    */
    fn saturated(&self) -> bool {
        let mut tracked = self
            .routes
            .iter()
            .filter(|r| self.ctx.status.is_active(r.stream))
            .peekable();
        tracked.peek().is_some() && tracked.all(|r| r.queue.is_full())
    }

    fn route(&mut self, packet: Packet) {
        let Some(route) = self.routes.iter().find(|r| r.index == packet.stream_index) else {
            return;
        };
        if !self.ctx.status.is_active(route.stream) {
            return;
        }

        let coded = CodedPacket::new(packet, route.stream, self.generation);
        if self.ctx.trace_items {
            log::trace!(
                "[{}] demux: {} packet pts={:.3}s size={}",
                self.ctx.label,
                route.stream.name(),
                coded.pts_secs(),
                coded.packet.data.len()
            );
        }

        if let Err(coded) = route.queue.push(coded) {
            match self.ctx.overflow {
                OverflowPolicy::Drop => {
                    self.dropped += 1;
                    log::debug!(
                        "[{}] demux: {} packet queue full, dropping packet at {:.3}s",
                        self.ctx.label,
                        route.stream.name(),
                        coded.pts_secs()
                    );
                }
                OverflowPolicy::Backpressure => self.pending = Some(coded),
            }
        }
    }

    /**
        Retry the held packet. A packet whose decoder has gone away is
        discarded instead of blocking the other stream.
    */
    fn deliver_pending(&mut self, packet: CodedPacket) -> Result<(), CodedPacket> {
        if !self.ctx.status.is_active(packet.stream) {
            return Ok(());
        }
        let Some(route) = self.routes.iter().find(|r| r.stream == packet.stream) else {
            return Ok(());
        };
        route.queue.push(packet)
    }
}
