/*!
    Shared types for the vidstream decode pipeline.

    This crate defines the vocabulary that crosses crate boundaries. It has no
    dependency on FFmpeg, so the pipeline and its tests can be built without
    pulling in FFmpeg bindings.

    # Core Types

    - [`Rational`] - Rational numbers for time bases and frame rates
    - [`Pts`] and [`MediaDuration`] - Timestamps in time_base units
    - [`VideoFrame`] and [`AudioFrame`] - Decoded frame data
    - [`Packet`] - Encoded packet data

    # Format Types

    - [`PixelFormat`] - Video pixel formats
    - [`SampleFormat`] - Audio sample formats
    - [`CodecId`] and [`MediaKind`] - Codec identifiers and their classification

    # Stream Information

    - [`VideoStreamInfo`] and [`AudioStreamInfo`] - Stream parameters
    - [`StreamInfo`] and [`MediaInfo`] - Container metadata

    # Backends

    - [`MediaSource`] - Container reader
    - [`FrameDecoder`] - Per-stream codec

    # Error Handling

    - [`Error`] and [`Result`] - Common error types
*/

mod codec;
mod error;
mod format;
mod frame;
mod packet;
mod rational;
mod source;
mod stream;
mod timestamp;

pub use codec::{CodecId, MediaKind};
pub use error::{Error, Result};
pub use format::{PixelFormat, PlaneLayout, SampleFormat};
pub use frame::{AudioFrame, Timestamped, VideoFrame};
pub use packet::{Packet, StreamType};
pub use rational::Rational;
pub use source::{FrameDecoder, MediaSource};
pub use stream::{AudioStreamInfo, MediaInfo, StreamDetails, StreamInfo, VideoStreamInfo};
pub use timestamp::{MediaDuration, Pts, format_duration};
