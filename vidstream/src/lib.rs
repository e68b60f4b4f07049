/*!
    Multithreaded demux/decode pipeline for media playback.

    A [`MediaStream`] opens a container and runs three worker threads:

    - Demux: reads packets and routes them to a bounded packet queue per stream
    - Video decode: turns video packets into [`VideoFrame`]s
    - Audio decode: turns audio packets into [`AudioFrame`]s

    Decoded frames wait in bounded frame queues until the consumer pulls them,
    so a slow consumer throttles decoding instead of growing memory. Seeking
    flushes every queue and repositions the container while the threads keep
    running.

    The FFmpeg backend lives in `ffmpeg-decode`; any [`MediaSource`] can be
    plugged in instead, such as the deterministic [`SyntheticSource`].
*/

mod config;
mod decode;
mod demux;
mod error;
mod event;
mod frame;
mod packet;
mod queue;
mod seek;
mod sink;
mod stage;
mod status;
mod stream;

pub mod synthetic;

pub use config::{
    DEFAULT_MAX_AUDIO_FRAMES, DEFAULT_MAX_AUDIO_PACKETS, DEFAULT_MAX_VIDEO_FRAMES,
    DEFAULT_MAX_VIDEO_PACKETS, LogConfig, OverflowPolicy, StreamConfig,
};
pub use error::{StreamError, StreamResult};
pub use event::StreamEvent;
pub use frame::TimedFrame;
pub use packet::CodedPacket;
pub use queue::BoundedQueue;
pub use sink::{CollectSink, FrameSink};
pub use stream::MediaStream;
pub use synthetic::{SyntheticBuilder, SyntheticSource};

pub use ffmpeg_types::{
    AudioFrame, AudioStreamInfo, MediaInfo, MediaKind, MediaSource, PixelFormat, SampleFormat,
    StreamType, VideoFrame, format_duration,
};
