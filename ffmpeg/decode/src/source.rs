/*!
    Container demuxing through libavformat.
*/

use std::path::Path;
use std::time::Duration;

use ffmpeg_next::{ffi, format, media};

use ffmpeg_types::{
    AudioFrame, AudioStreamInfo, Error, FrameDecoder, MediaDuration, MediaInfo, MediaSource,
    Packet, Pts, Rational, Result, StreamDetails, StreamInfo, VideoFrame, VideoStreamInfo,
};

use crate::audio::AudioDecoder;
use crate::codec::{codec_id_from_ffmpeg, rational_from_ffmpeg};
use crate::config::DecoderConfig;
use crate::video::VideoDecoder;

// Container durations and seek targets are in AV_TIME_BASE units (microseconds)
const AV_TIME_BASE: f64 = 1_000_000.0;

/**
    A media container opened with FFmpeg.
*/
pub struct FfmpegSource {
    input: format::context::Input,
    info: MediaInfo,
    config: DecoderConfig,
}

impl FfmpegSource {
    /**
        Open a container and read its stream information.
    */
    pub fn open(path: impl AsRef<Path>, config: DecoderConfig) -> Result<Self> {
        let path = path.as_ref();
        ffmpeg_next::init().map_err(|e| Error::open(path.display().to_string(), e.to_string()))?;

        let input = format::input(path)
            .map_err(|e| Error::open(path.display().to_string(), e.to_string()))?;

        let info = probe(&input)?;
        log::debug!(
            "[source] opened {} ({}, {} streams)",
            path.display(),
            info.format_name,
            info.streams.len()
        );

        Ok(Self {
            input,
            info,
            config,
        })
    }

    fn stream_time_base(&self, index: usize) -> Rational {
        self.info
            .stream(index)
            .map(|s| s.time_base)
            .unwrap_or_default()
    }

    fn parameters(&self, index: usize) -> Result<ffmpeg_next::codec::Parameters> {
        self.input
            .stream(index)
            .map(|stream| stream.parameters())
            .ok_or_else(|| Error::stream_info(format!("no stream with index {index}")))
    }
}

impl MediaSource for FfmpegSource {
    fn info(&self) -> &MediaInfo {
        &self.info
    }

    fn read_packet(&mut self) -> Result<Packet> {
        let mut packet = ffmpeg_next::Packet::empty();
        match packet.read(&mut self.input) {
            Ok(()) => {}
            Err(ffmpeg_next::Error::Eof) => return Err(Error::Eof),
            Err(e) => return Err(Error::invalid_data(e.to_string())),
        }

        let stream_index = packet.stream();
        Ok(Packet {
            data: packet.data().map(<[u8]>::to_vec).unwrap_or_default(),
            stream_index,
            pts: packet.pts().map(Pts),
            dts: packet.dts().map(Pts),
            duration: MediaDuration(packet.duration()),
            time_base: self.stream_time_base(stream_index),
            is_keyframe: packet.is_key(),
        })
    }

    fn seek(&mut self, target: Duration) -> Result<()> {
        let timestamp = (target.as_secs_f64() * AV_TIME_BASE) as i64;
        // Stream -1 seeks in AV_TIME_BASE units, BACKWARD lands on the keyframe
        // at or before the target
        let ret = unsafe {
            ffi::av_seek_frame(
                self.input.as_mut_ptr(),
                -1,
                timestamp,
                ffi::AVSEEK_FLAG_BACKWARD as i32,
            )
        };
        if ret < 0 {
            return Err(Error::seek(ffmpeg_next::Error::from(ret).to_string()));
        }
        Ok(())
    }

    fn open_video_decoder(
        &mut self,
        stream_index: usize,
    ) -> Result<Box<dyn FrameDecoder<Frame = VideoFrame>>> {
        let parameters = self.parameters(stream_index)?;
        let decoder =
            VideoDecoder::new(parameters, self.stream_time_base(stream_index), &self.config)?;
        Ok(Box::new(decoder))
    }

    fn open_audio_decoder(
        &mut self,
        stream_index: usize,
    ) -> Result<Box<dyn FrameDecoder<Frame = AudioFrame>>> {
        let parameters = self.parameters(stream_index)?;
        let decoder =
            AudioDecoder::new(parameters, self.stream_time_base(stream_index), &self.config)?;
        Ok(Box::new(decoder))
    }
}

impl std::fmt::Debug for FfmpegSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegSource")
            .field("info", &self.info)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/**
    Build the container metadata from an opened input.
*/
fn probe(input: &format::context::Input) -> Result<MediaInfo> {
    if input.nb_streams() == 0 {
        return Err(Error::stream_info("container has no streams"));
    }

    let duration = {
        let d = input.duration();
        (d != ffi::AV_NOPTS_VALUE as i64 && d > 0)
            .then(|| Duration::from_secs_f64(d as f64 / AV_TIME_BASE))
    };

    let streams = input
        .streams()
        .map(|stream| {
            let parameters = stream.parameters();
            let details = match parameters.medium() {
                media::Type::Video => {
                    let (width, height) = video_size(&parameters);
                    StreamDetails::Video(VideoStreamInfo {
                        width,
                        height,
                        avg_frame_rate: rational_from_ffmpeg(stream.avg_frame_rate()),
                        base_frame_rate: rational_from_ffmpeg(stream.rate()),
                    })
                }
                media::Type::Audio => {
                    let (sample_rate, channels) = audio_params(&parameters);
                    StreamDetails::Audio(AudioStreamInfo {
                        sample_rate,
                        channels,
                    })
                }
                _ => StreamDetails::Other,
            };

            StreamInfo {
                index: stream.index(),
                codec: codec_id_from_ffmpeg(parameters.id()),
                time_base: rational_from_ffmpeg(stream.time_base()),
                details,
                attached_picture: stream
                    .disposition()
                    .contains(format::stream::Disposition::ATTACHED_PIC),
            }
        })
        .collect();

    Ok(MediaInfo {
        format_name: input.format().name().to_string(),
        duration,
        streams,
    })
}

/// Reads video width/height from codec parameters (not exposed by ffmpeg-next).
fn video_size(params: &ffmpeg_next::codec::Parameters) -> (u32, u32) {
    unsafe {
        let ptr = params.as_ptr();
        ((*ptr).width.max(0) as u32, (*ptr).height.max(0) as u32)
    }
}

/// Reads audio sample rate and channel count from codec parameters.
fn audio_params(params: &ffmpeg_next::codec::Parameters) -> (u32, u16) {
    unsafe {
        let ptr = params.as_ptr();
        let channels = (*ptr).ch_layout.nb_channels.clamp(0, i32::from(u16::MAX));
        ((*ptr).sample_rate.max(0) as u32, channels as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_file_is_open_error() {
        let err = FfmpegSource::open("/nonexistent/clip.mp4", DecoderConfig::new()).unwrap_err();
        assert!(matches!(err, Error::Open { .. }), "{err}");
    }
}
