/*!
    FFmpeg backend for the vidstream decode pipeline.

    This crate implements the [`MediaSource`] and [`FrameDecoder`] traits
    from `ffmpeg-types` on top of `ffmpeg-next`: containers are opened and
    demuxed with libavformat, and packets are decoded with libavcodec.

    # Example

    ```ignore
    use ffmpeg_decode::{DecoderConfig, FfmpegSource};
    use ffmpeg_types::{Error, MediaSource};

    let mut source = FfmpegSource::open("video.mp4", DecoderConfig::new())?;
    let video = source.info().first_video().map(|s| s.index).unwrap();
    let mut decoder = source.open_video_decoder(video)?;

    loop {
        let packet = match source.read_packet() {
            Ok(packet) => packet,
            Err(Error::Eof) => break,
            Err(e) => return Err(e),
        };
        if packet.stream_index == video {
            decoder.send_packet(&packet)?;
            while let Some(frame) = decoder.receive_frame()? {
                // Process frame
            }
        }
    }

    // Drain remaining frames
    decoder.send_eof()?;
    while let Some(frame) = decoder.receive_frame()? {}
    ```
*/

pub use ffmpeg_types::{AudioFrame, Error, FrameDecoder, MediaSource, Packet, Result, VideoFrame};

mod audio;
mod codec;
mod config;
mod source;
mod video;

pub use audio::AudioDecoder;
pub use config::DecoderConfig;
pub use source::FfmpegSource;
pub use video::VideoDecoder;

static_assertions::assert_impl_all!(FfmpegSource: Send, MediaSource);
static_assertions::assert_impl_all!(VideoDecoder: Send);
static_assertions::assert_impl_all!(AudioDecoder: Send);
