/*!
    Backend seams: a container reader and a per-stream frame decoder.

    The pipeline only ever talks to these traits, so any backend (FFmpeg,
    an in-memory test pattern, ...) can drive it.
*/

use std::time::Duration;

use crate::{AudioFrame, MediaInfo, Packet, Result, Timestamped, VideoFrame};

/**
    A demuxed media container.

    Owned by exactly one thread at a time; it is moved into the demux stage
    once decoders have been opened.
*/
pub trait MediaSource: Send {
    /**
        Metadata of the opened container.
    */
    fn info(&self) -> &MediaInfo;

    /**
        Read the next packet in container order.

        Returns [`Error::Eof`](crate::Error::Eof) once the container is
        exhausted.
    */
    fn read_packet(&mut self) -> Result<Packet>;

    /**
        Reposition the read cursor to the nearest keyframe at or before
        `target`.
    */
    fn seek(&mut self, target: Duration) -> Result<()>;

    /**
        Open a decoder for the video stream with the given container index.
    */
    fn open_video_decoder(
        &mut self,
        stream_index: usize,
    ) -> Result<Box<dyn FrameDecoder<Frame = VideoFrame>>>;

    /**
        Open a decoder for the audio stream with the given container index.
    */
    fn open_audio_decoder(
        &mut self,
        stream_index: usize,
    ) -> Result<Box<dyn FrameDecoder<Frame = AudioFrame>>>;
}

/**
    A send-packet / receive-frame codec for one elementary stream.
*/
pub trait FrameDecoder: Send {
    type Frame: Timestamped + Send + 'static;

    /**
        Submit one packet. Per-packet failures are recoverable; an error for
        which [`Error::is_fatal`](crate::Error::is_fatal) holds is not.
    */
    fn send_packet(&mut self, packet: &Packet) -> Result<()>;

    /**
        Fetch the next decoded frame.

        `Ok(None)` means the codec needs more input (or has been fully
        drained after [`FrameDecoder::send_eof`]).
    */
    fn receive_frame(&mut self) -> Result<Option<Self::Frame>>;

    /**
        Signal end of input so buffered frames can be drained.
    */
    fn send_eof(&mut self) -> Result<()>;

    /**
        Discard all buffered state, e.g. after a seek.
    */
    fn reset(&mut self);
}
