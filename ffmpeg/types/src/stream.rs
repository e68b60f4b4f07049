/*!
    Container and stream metadata.
*/

use std::time::Duration;

use crate::{CodecId, MediaKind, Rational};

/**
    Video stream parameters.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoStreamInfo {
    /// Coded width in pixels.
    pub width: u32,
    /// Coded height in pixels.
    pub height: u32,
    /// Average frame rate, if the container reports one.
    pub avg_frame_rate: Rational,
    /// Lowest framerate with which all timestamps can be represented.
    pub base_frame_rate: Rational,
}

impl VideoStreamInfo {
    /**
        Frames per second: the average frame rate, falling back to the base
        frame rate when the average is unknown.
    */
    pub fn fps(&self) -> Option<f64> {
        self.avg_frame_rate
            .or_positive(self.base_frame_rate)
            .map(Rational::to_f64)
    }
}

/**
    Audio stream parameters.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioStreamInfo {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
}

/**
    Kind-specific stream parameters.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamDetails {
    Video(VideoStreamInfo),
    Audio(AudioStreamInfo),
    Other,
}

/**
    One elementary stream of a container.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct StreamInfo {
    /// Index of the stream within the container.
    pub index: usize,
    /// Codec of the stream.
    pub codec: CodecId,
    /// Time base of the stream's packet timestamps.
    pub time_base: Rational,
    /// Kind-specific parameters.
    pub details: StreamDetails,
    /// True for embedded still pictures (cover art), which are never played.
    pub attached_picture: bool,
}

impl StreamInfo {
    pub fn video(&self) -> Option<&VideoStreamInfo> {
        match &self.details {
            StreamDetails::Video(info) => Some(info),
            _ => None,
        }
    }

    pub fn audio(&self) -> Option<&AudioStreamInfo> {
        match &self.details {
            StreamDetails::Audio(info) => Some(info),
            _ => None,
        }
    }

    /**
        Classification of this stream's content.

        Attached pictures count as images regardless of their codec.
    */
    pub fn kind(&self) -> MediaKind {
        if self.attached_picture {
            return MediaKind::Image;
        }
        match (&self.details, self.codec.kind()) {
            (_, MediaKind::Image) => MediaKind::Image,
            (StreamDetails::Video(_), _) => MediaKind::Video,
            (StreamDetails::Audio(_), _) => MediaKind::Audio,
            (StreamDetails::Other, kind) => kind,
        }
    }
}

/**
    Metadata of an opened container.
*/
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaInfo {
    /// Short name of the container format, e.g. `"mov,mp4,m4a"`.
    pub format_name: String,
    /// Total duration, if known.
    pub duration: Option<Duration>,
    /// All streams in container order.
    pub streams: Vec<StreamInfo>,
}

impl MediaInfo {
    /**
        The first playable video stream, skipping attached pictures.
    */
    pub fn first_video(&self) -> Option<&StreamInfo> {
        self.streams
            .iter()
            .find(|s| s.video().is_some() && !s.attached_picture)
    }

    /**
        The first audio stream.
    */
    pub fn first_audio(&self) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.audio().is_some())
    }

    /**
        Looks up a stream by container index.
    */
    pub fn stream(&self, index: usize) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.index == index)
    }

    /**
        Overall classification, by priority Video > Image > Audio > Subtitle.
    */
    pub fn primary_kind(&self) -> MediaKind {
        let kinds: Vec<MediaKind> = self.streams.iter().map(StreamInfo::kind).collect();
        [
            MediaKind::Video,
            MediaKind::Image,
            MediaKind::Audio,
            MediaKind::Subtitle,
        ]
        .into_iter()
        .find(|kind| kinds.contains(kind))
        .unwrap_or(MediaKind::Unknown)
    }
}
