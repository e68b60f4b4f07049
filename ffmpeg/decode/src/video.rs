/*!
    Video decoder implementation.
*/

use ffmpeg_next::{
    codec::{self, decoder::Video as VideoDecoderFFmpeg},
    format::Pixel,
    software::scaling,
    util::frame::video::Video as VideoFrameFFmpeg,
};

use ffmpeg_types::{
    Error, FrameDecoder, MediaDuration, Packet, PixelFormat, Pts, Rational, Result, VideoFrame,
};

use crate::codec::{is_empty_receive, open_context, packet_to_ffmpeg, send_error};
use crate::config::DecoderConfig;

/**
    Software scaler used for pixel formats we do not deliver as-is.
*/
struct Converter {
    context: scaling::Context,
    source: (Pixel, u32, u32),
}

// The scaling context is only ever used from the thread owning the decoder
unsafe impl Send for Converter {}

/**
    Video decoder.

    Decodes video packets into tightly packed frames. Frames in a pixel
    format without a [`PixelFormat`] tag are converted to YUV 4:2:0.
*/
pub struct VideoDecoder {
    decoder: VideoDecoderFFmpeg,
    time_base: Rational,
    converter: Option<Converter>,
}

impl VideoDecoder {
    /**
        Create a new video decoder for a stream.
    */
    pub fn new(
        parameters: codec::Parameters,
        time_base: Rational,
        config: &DecoderConfig,
    ) -> Result<Self> {
        let decoder = open_context(parameters, time_base, config)?
            .decoder()
            .video()
            .map_err(|e| Error::codec(e.to_string()))?;

        Ok(Self {
            decoder,
            time_base,
            converter: None,
        })
    }

    fn convert_frame(&mut self, frame: &VideoFrameFFmpeg) -> Result<VideoFrame> {
        let width = frame.width();
        let height = frame.height();
        if width == 0 || height == 0 {
            return Err(Error::invalid_data("video frame has zero dimensions"));
        }

        let pts = frame.timestamp().or(frame.pts()).map(Pts);
        let duration = MediaDuration(frame_duration(frame));

        let (data, format) = match pixel_format_from_ffmpeg(frame.format()) {
            Some(format) => (copy_planes(frame, format)?, format),
            None => {
                let converted = self.to_yuv420p(frame)?;
                (copy_planes(&converted, PixelFormat::Yuv420p)?, PixelFormat::Yuv420p)
            }
        };

        Ok(VideoFrame {
            data,
            width,
            height,
            format,
            pts,
            duration,
            time_base: self.time_base,
        })
    }

    fn to_yuv420p(&mut self, frame: &VideoFrameFFmpeg) -> Result<VideoFrameFFmpeg> {
        let source = (frame.format(), frame.width(), frame.height());

        let stale = self
            .converter
            .as_ref()
            .is_none_or(|converter| converter.source != source);
        if stale {
            let context = scaling::Context::get(
                source.0,
                source.1,
                source.2,
                Pixel::YUV420P,
                source.1,
                source.2,
                scaling::flag::Flags::BILINEAR,
            )
            .map_err(|e| Error::unsupported_format(format!("{:?}: {e}", source.0)))?;
            log::debug!("[video_decode] converting {:?} to yuv420p", source.0);
            self.converter = Some(Converter { context, source });
        }

        let Some(converter) = self.converter.as_mut() else {
            return Err(Error::unsupported_format("no pixel converter"));
        };

        let mut converted = VideoFrameFFmpeg::empty();
        converter
            .context
            .run(frame, &mut converted)
            .map_err(|e| Error::invalid_data(e.to_string()))?;
        Ok(converted)
    }
}

impl FrameDecoder for VideoDecoder {
    type Frame = VideoFrame;

    fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        self.decoder
            .send_packet(&packet_to_ffmpeg(packet))
            .map_err(send_error)
    }

    fn receive_frame(&mut self) -> Result<Option<VideoFrame>> {
        let mut decoded = VideoFrameFFmpeg::empty();
        loop {
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => match self.convert_frame(&decoded) {
                    Ok(frame) => return Ok(Some(frame)),
                    Err(e) => {
                        log::warn!("[video_decode] frame conversion error: {e}");
                    }
                },
                Err(e) if is_empty_receive(&e) => return Ok(None),
                Err(e) => return Err(Error::codec(e.to_string())),
            }
        }
    }

    fn send_eof(&mut self) -> Result<()> {
        self.decoder.send_eof().map_err(send_error)
    }

    fn reset(&mut self) {
        self.decoder.flush();
    }
}

fn frame_duration(frame: &VideoFrameFFmpeg) -> i64 {
    // Not exposed by ffmpeg-next
    unsafe { (*frame.as_ptr()).duration }
}

/**
    Copy each plane row by row, dropping the stride padding.
*/
fn copy_planes(frame: &VideoFrameFFmpeg, format: PixelFormat) -> Result<Vec<u8>> {
    let layout = format.planes(frame.width(), frame.height());
    let mut output = Vec::with_capacity(layout.iter().map(|p| p.len()).sum());

    for (index, plane) in layout.iter().enumerate() {
        let stride = frame.stride(index);
        let data = frame.data(index);
        if stride < plane.row_bytes {
            return Err(Error::invalid_data(format!(
                "plane {index} stride {stride} is narrower than {} bytes",
                plane.row_bytes
            )));
        }
        for row in 0..plane.rows {
            let start = row * stride;
            let bytes = data
                .get(start..start + plane.row_bytes)
                .ok_or_else(|| Error::invalid_data(format!("plane {index} is truncated")))?;
            output.extend_from_slice(bytes);
        }
    }

    Ok(output)
}

/**
    Convert FFmpeg pixel format to our PixelFormat.
*/
fn pixel_format_from_ffmpeg(format: Pixel) -> Option<PixelFormat> {
    match format {
        Pixel::YUV420P => Some(PixelFormat::Yuv420p),
        Pixel::YUV420P10LE => Some(PixelFormat::Yuv420p10),
        Pixel::YUV422P => Some(PixelFormat::Yuv422p),
        Pixel::YUV444P => Some(PixelFormat::Yuv444p),
        Pixel::NV12 => Some(PixelFormat::Nv12),
        Pixel::GRAY8 => Some(PixelFormat::Gray8),
        Pixel::RGB24 => Some(PixelFormat::Rgb24),
        Pixel::BGR24 => Some(PixelFormat::Bgr24),
        Pixel::RGBA => Some(PixelFormat::Rgba),
        Pixel::BGRA => Some(PixelFormat::Bgra),
        _ => None,
    }
}

impl std::fmt::Debug for VideoDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoDecoder")
            .field("time_base", &self.time_base)
            .field("width", &self.decoder.width())
            .field("height", &self.decoder.height())
            .field("converting", &self.converter.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivered_formats_map() {
        assert_eq!(
            pixel_format_from_ffmpeg(Pixel::YUV420P),
            Some(PixelFormat::Yuv420p)
        );
        assert_eq!(pixel_format_from_ffmpeg(Pixel::NV12), Some(PixelFormat::Nv12));
        assert_eq!(pixel_format_from_ffmpeg(Pixel::BGRA), Some(PixelFormat::Bgra));
    }

    #[test]
    fn full_range_yuv_needs_conversion() {
        assert_eq!(pixel_format_from_ffmpeg(Pixel::YUVJ420P), None);
        assert_eq!(pixel_format_from_ffmpeg(Pixel::P010LE), None);
    }

    #[test]
    fn copy_planes_strips_stride_padding() {
        let mut frame = VideoFrameFFmpeg::new(Pixel::GRAY8, 3, 2);
        let stride = frame.stride(0);
        for (i, byte) in frame.data_mut(0).iter_mut().enumerate() {
            *byte = (i % stride) as u8;
        }
        let data = copy_planes(&frame, PixelFormat::Gray8).unwrap();
        assert_eq!(data, vec![0, 1, 2, 0, 1, 2]);
    }
}
