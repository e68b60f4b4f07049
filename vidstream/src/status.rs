/*!
    Pipeline progress flags shared by the stages.
*/

use std::sync::atomic::{AtomicBool, Ordering};

use ffmpeg_types::StreamType;

#[derive(Debug, Default)]
struct StageFlags {
    active: AtomicBool,
    drained: AtomicBool,
}

/**
    Where each stage is in its lifecycle.

    A decode stage is active while its thread is decoding; packets for
    inactive streams are not routed and do not count towards demux
    saturation.
*/
#[derive(Debug, Default)]
pub(crate) struct PipelineStatus {
    demux_finished: AtomicBool,
    demux_failed: AtomicBool,
    video: StageFlags,
    audio: StageFlags,
}

impl PipelineStatus {
    pub(crate) fn new(video_active: bool, audio_active: bool) -> Self {
        let status = Self::default();
        status.video.active.store(video_active, Ordering::Release);
        status.audio.active.store(audio_active, Ordering::Release);
        status
    }

    fn stage(&self, stream: StreamType) -> &StageFlags {
        match stream {
            StreamType::Video => &self.video,
            StreamType::Audio => &self.audio,
        }
    }

    pub(crate) fn set_demux_finished(&self) {
        self.demux_finished.store(true, Ordering::Release);
    }

    pub(crate) fn set_demux_failed(&self) {
        self.demux_failed.store(true, Ordering::Release);
    }

    /// The container was read to its end.
    pub(crate) fn demux_finished(&self) -> bool {
        self.demux_finished.load(Ordering::Acquire)
    }

    /// No more packets will be produced, for whatever reason.
    pub(crate) fn demux_done(&self) -> bool {
        self.demux_finished() || self.demux_failed.load(Ordering::Acquire)
    }

    pub(crate) fn is_active(&self, stream: StreamType) -> bool {
        self.stage(stream).active.load(Ordering::Acquire)
    }

    pub(crate) fn set_inactive(&self, stream: StreamType) {
        self.stage(stream).active.store(false, Ordering::Release);
    }

    pub(crate) fn set_drained(&self, stream: StreamType) {
        self.stage(stream).drained.store(true, Ordering::Release);
    }

    /**
        True once the stage has nothing left to produce: it emptied its codec
        after end of input, or it is not running at all.
    */
    pub(crate) fn is_drained(&self, stream: StreamType) -> bool {
        let stage = self.stage(stream);
        stage.drained.load(Ordering::Acquire) || !stage.active.load(Ordering::Acquire)
    }
}

static_assertions::assert_impl_all!(PipelineStatus: Send, Sync);
