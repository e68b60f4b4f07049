/*!
    Decoded frames as handed to consumers.
*/

use std::time::Duration;

/**
    A decoded frame with its presentation time in the stream timeline.

    `F` is [`VideoFrame`](ffmpeg_types::VideoFrame) or
    [`AudioFrame`](ffmpeg_types::AudioFrame). Ownership passes to whoever
    pulls the frame from its queue.
*/
#[derive(Clone, Debug)]
pub struct TimedFrame<F> {
    pub frame: F,
    /// Presentation time.
    pub pts: Duration,
    /// Display (or playback) duration; zero when unknown.
    pub duration: Duration,
    pub(crate) generation: u64,
}

impl<F> TimedFrame<F> {
    pub fn new(frame: F, pts: Duration, duration: Duration, generation: u64) -> Self {
        Self {
            frame,
            pts,
            duration,
            generation,
        }
    }

    /// Presentation time in seconds.
    pub fn pts_secs(&self) -> f64 {
        self.pts.as_secs_f64()
    }

    /// Seek generation the frame was decoded in.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn into_inner(self) -> F {
        self.frame
    }
}

static_assertions::assert_impl_all!(TimedFrame<ffmpeg_types::VideoFrame>: Send);
static_assertions::assert_impl_all!(TimedFrame<ffmpeg_types::AudioFrame>: Send);
