/*!
    Encoded packet type.
*/

use std::time::Duration;

use crate::{MediaDuration, Pts, Rational};

/**
    Kind of elementary stream a pipeline stage handles.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamType {
    /// Video stream
    Video,
    /// Audio stream
    Audio,
}

impl StreamType {
    /**
        Lowercase name, used in log lines and thread names.
    */
    pub const fn name(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

/**
    An encoded media packet as read from the container.

    Packets are read in container order and carry the index of the stream
    they belong to; routing them to a decoder is the demuxer's job.
*/
#[derive(Clone, Debug)]
pub struct Packet {
    /// Compressed data.
    pub data: Vec<u8>,
    /// Index of the container stream this packet belongs to.
    pub stream_index: usize,
    /// Presentation timestamp (when to display/play).
    pub pts: Option<Pts>,
    /// Decode timestamp, differs from the PTS for reordered (B) frames.
    pub dts: Option<Pts>,
    /// Duration of this packet's content.
    pub duration: MediaDuration,
    /// Time base of the owning stream.
    pub time_base: Rational,
    /// Whether this is a keyframe (can be decoded independently).
    pub is_keyframe: bool,
}

impl Packet {
    /**
        Returns the presentation time in seconds.

        Falls back to the decode timestamp when PTS is missing and to zero
        when neither is set.
    */
    pub fn presentation_seconds(&self) -> f64 {
        self.pts
            .or(self.dts)
            .map(|ts| ts.to_seconds(self.time_base))
            .unwrap_or(0.0)
    }

    /**
        Returns the presentation time as a Duration (negative clamps to zero).
    */
    pub fn presentation_time(&self) -> Duration {
        Duration::from_secs_f64(self.presentation_seconds().max(0.0))
    }

    /**
        Returns the packet duration, if the container reported one.
    */
    pub fn packet_duration(&self) -> Option<Duration> {
        (!self.duration.is_unknown()).then(|| self.duration.to_duration(self.time_base))
    }
}

static_assertions::assert_impl_all!(Packet: Send, Sync);
