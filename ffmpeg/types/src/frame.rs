/*!
    Decoded frame types.
*/

use std::time::Duration;

use crate::{MediaDuration, PixelFormat, Pts, Rational, SampleFormat};

/**
    Timing information every decoded frame can report.

    Decoders fill in what the codec knows; the pipeline falls back to the
    source packet's timing for anything missing.
*/
pub trait Timestamped {
    /// Decoder-reported presentation time, if any.
    fn presentation_time(&self) -> Option<Duration>;

    /// Decoder-reported duration, if any.
    fn frame_duration(&self) -> Option<Duration>;
}

/**
    A decoded video frame.

    Planes are stored back to back without row padding, in the layout
    given by [`PixelFormat::planes`].
*/
#[derive(Clone, Debug)]
pub struct VideoFrame {
    /// Raw pixel data.
    pub data: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format of the data.
    pub format: PixelFormat,
    /// Presentation timestamp (None for frames without timing).
    pub pts: Option<Pts>,
    /// Display duration in time_base units (zero when unknown).
    pub duration: MediaDuration,
    /// Time base for interpreting the PTS and duration.
    pub time_base: Rational,
}

impl VideoFrame {
    /**
        Returns the byte ranges of each plane within `data`.
    */
    pub fn plane_ranges(&self) -> Vec<std::ops::Range<usize>> {
        let mut offset = 0;
        self.format
            .planes(self.width, self.height)
            .into_iter()
            .map(|plane| {
                let range = offset..offset + plane.len();
                offset = range.end;
                range
            })
            .collect()
    }
}

impl Timestamped for VideoFrame {
    fn presentation_time(&self) -> Option<Duration> {
        self.pts.map(|pts| pts.to_duration(self.time_base))
    }

    fn frame_duration(&self) -> Option<Duration> {
        (!self.duration.is_unknown()).then(|| self.duration.to_duration(self.time_base))
    }
}

/**
    A decoded audio frame.

    Samples are interleaved for multi-channel audio.
*/
#[derive(Clone, Debug)]
pub struct AudioFrame {
    /**
        Raw sample data as bytes.

        For interleaved stereo F32: [L0, R0, L1, R1, ...]
    */
    pub data: Vec<u8>,
    /// Number of samples per channel.
    pub samples: usize,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Sample format.
    pub format: SampleFormat,
    /// Presentation timestamp (None for frames without timing).
    pub pts: Option<Pts>,
    /// Time base for interpreting the PTS.
    pub time_base: Rational,
}

impl AudioFrame {
    /**
        Returns the expected data length in bytes.
    */
    pub fn expected_data_len(&self) -> usize {
        self.samples * self.channels as usize * self.format.bytes_per_sample()
    }
}

impl Timestamped for AudioFrame {
    fn presentation_time(&self) -> Option<Duration> {
        self.pts.map(|pts| pts.to_duration(self.time_base))
    }

    fn frame_duration(&self) -> Option<Duration> {
        if self.sample_rate == 0 {
            return None;
        }
        Some(Duration::from_secs_f64(
            self.samples as f64 / self.sample_rate as f64,
        ))
    }
}

static_assertions::assert_impl_all!(VideoFrame: Send, Sync, Timestamped);
static_assertions::assert_impl_all!(AudioFrame: Send, Sync, Timestamped);

#[cfg(test)]
mod tests {
    use super::*;

    const TB_1_1000: Rational = Rational { num: 1, den: 1000 };

    #[test]
    fn video_frame_timing() {
        let frame = VideoFrame {
            data: vec![0u8; PixelFormat::Yuv420p.frame_size(4, 4)],
            width: 4,
            height: 4,
            format: PixelFormat::Yuv420p,
            pts: Some(Pts(1500)),
            duration: MediaDuration(40),
            time_base: TB_1_1000,
        };
        assert_eq!(frame.presentation_time(), Some(Duration::from_millis(1500)));
        assert_eq!(frame.frame_duration(), Some(Duration::from_millis(40)));
    }

    #[test]
    fn video_frame_without_timing() {
        let frame = VideoFrame {
            data: vec![],
            width: 0,
            height: 0,
            format: PixelFormat::Rgba,
            pts: None,
            duration: MediaDuration(0),
            time_base: TB_1_1000,
        };
        assert_eq!(frame.presentation_time(), None);
        assert_eq!(frame.frame_duration(), None);
    }

    #[test]
    fn video_frame_plane_ranges() {
        let frame = VideoFrame {
            data: vec![0u8; PixelFormat::Yuv420p.frame_size(4, 2)],
            width: 4,
            height: 2,
            format: PixelFormat::Yuv420p,
            pts: None,
            duration: MediaDuration(0),
            time_base: TB_1_1000,
        };
        assert_eq!(frame.plane_ranges(), vec![0..8, 8..10, 10..12]);
    }

    #[test]
    fn audio_frame_duration_from_samples() {
        let frame = AudioFrame {
            data: vec![],
            samples: 24000,
            sample_rate: 48000,
            channels: 2,
            format: SampleFormat::F32,
            pts: None,
            time_base: TB_1_1000,
        };
        assert_eq!(frame.frame_duration(), Some(Duration::from_millis(500)));
        assert_eq!(frame.expected_data_len(), 24000 * 2 * 4);
    }
}
