/*!
    Audio decoder implementation.
*/

use ffmpeg_next::{
    codec::{self, decoder::Audio as AudioDecoderFFmpeg},
    util::frame::audio::Audio as AudioFrameFFmpeg,
};

use ffmpeg_types::{AudioFrame, Error, FrameDecoder, Packet, Pts, Rational, Result, SampleFormat};

use crate::codec::{is_empty_receive, open_context, packet_to_ffmpeg, send_error};
use crate::config::DecoderConfig;

/**
    Audio decoder.

    Decodes audio packets into interleaved frames.
*/
pub struct AudioDecoder {
    decoder: AudioDecoderFFmpeg,
    time_base: Rational,
}

impl AudioDecoder {
    /**
        Create a new audio decoder for a stream.

        # Arguments

        * `parameters` - Codec parameters of the stream
        * `time_base` - Time base of the stream's packets
        * `config` - Decoder configuration
    */
    pub fn new(
        parameters: codec::Parameters,
        time_base: Rational,
        config: &DecoderConfig,
    ) -> Result<Self> {
        let decoder = open_context(parameters, time_base, config)?
            .decoder()
            .audio()
            .map_err(|e| Error::codec(e.to_string()))?;

        Ok(Self { decoder, time_base })
    }

    /**
        Convert an FFmpeg audio frame to our AudioFrame type.
    */
    fn convert_frame(&self, frame: &AudioFrameFFmpeg) -> Result<AudioFrame> {
        let samples = frame.samples();
        let channels = frame.channels() as u16;

        if samples == 0 {
            return Err(Error::invalid_data("audio frame has zero samples"));
        }
        if channels == 0 {
            return Err(Error::invalid_data("audio frame has no channels"));
        }

        let ffmpeg_format = frame.format();
        let format = sample_format_from_ffmpeg(ffmpeg_format).ok_or_else(|| {
            Error::unsupported_format(format!("unsupported sample format: {ffmpeg_format:?}"))
        })?;

        let data = copy_audio_data(frame, format, samples, channels)?;

        Ok(AudioFrame {
            data,
            samples,
            sample_rate: frame.rate(),
            channels,
            format,
            pts: frame.timestamp().or(frame.pts()).map(Pts),
            time_base: self.time_base,
        })
    }
}

impl FrameDecoder for AudioDecoder {
    type Frame = AudioFrame;

    fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        self.decoder
            .send_packet(&packet_to_ffmpeg(packet))
            .map_err(send_error)
    }

    fn receive_frame(&mut self) -> Result<Option<AudioFrame>> {
        let mut decoded = AudioFrameFFmpeg::empty();
        loop {
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => match self.convert_frame(&decoded) {
                    Ok(frame) => return Ok(Some(frame)),
                    Err(e) => {
                        log::warn!("[audio_decode] frame conversion error: {e}");
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

/**
    Copy audio data from FFmpeg frame, interleaving planar layouts.
*/
fn copy_audio_data(
    frame: &AudioFrameFFmpeg,
    format: SampleFormat,
    samples: usize,
    channels: u16,
) -> Result<Vec<u8>> {
    let bytes_per_sample = format.bytes_per_sample();
    let channels = channels as usize;
    let total_bytes = samples * channels * bytes_per_sample;

    if !frame.is_planar() {
        let plane = frame.data(0);
        return plane
            .get(..total_bytes)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::invalid_data("audio plane shorter than expected"));
    }

    let mut output = vec![0u8; total_bytes];
    for ch in 0..channels {
        let plane = frame.data(ch);
        if plane.len() < samples * bytes_per_sample {
            return Err(Error::invalid_data(format!(
                "audio plane {ch} shorter than expected"
            )));
        }
        for (s, sample) in plane
            .chunks_exact(bytes_per_sample)
            .take(samples)
            .enumerate()
        {
            let dst = (s * channels + ch) * bytes_per_sample;
            output[dst..dst + bytes_per_sample].copy_from_slice(sample);
        }
    }

    Ok(output)
}

/**
    Convert FFmpeg sample format to our SampleFormat.
*/
fn sample_format_from_ffmpeg(format: ffmpeg_next::format::Sample) -> Option<SampleFormat> {
    use ffmpeg_next::format::Sample;

    match format {
        Sample::F32(_) => Some(SampleFormat::F32),
        Sample::F64(_) => Some(SampleFormat::F64),
        Sample::I16(_) => Some(SampleFormat::S16),
        Sample::I32(_) => Some(SampleFormat::S32),
        Sample::U8(_) => Some(SampleFormat::U8),
        _ => None,
    }
}

impl std::fmt::Debug for AudioDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDecoder")
            .field("time_base", &self.time_base)
            .field("sample_rate", &self.decoder.rate())
            .field("channels", &self.decoder.channels())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_next::format::{Sample, sample::Type};

    #[test]
    fn sample_formats_map_regardless_of_layout() {
        assert_eq!(
            sample_format_from_ffmpeg(Sample::F32(Type::Planar)),
            Some(SampleFormat::F32)
        );
        assert_eq!(
            sample_format_from_ffmpeg(Sample::I16(Type::Packed)),
            Some(SampleFormat::S16)
        );
        assert_eq!(sample_format_from_ffmpeg(Sample::None), None);
    }
}
