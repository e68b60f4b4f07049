/*!
    Codec identification and classification.
*/

/**
    Broad kind of media a codec produces.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
    /// Still image codecs (also used for cover art streams)
    Image,
    Subtitle,
    Unknown,
}

impl MediaKind {
    /**
        Human-readable name.
    */
    pub const fn name(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Subtitle => "subtitle",
            Self::Unknown => "unknown",
        }
    }
}

/**
    Codec identifiers.

    This is the subset of codecs the player classifies. Anything else maps
    to [`CodecId::Other`] and is classified as [`MediaKind::Unknown`].
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    // Video codecs
    H264,
    Hevc,
    Vp8,
    Vp9,
    Av1,
    Mpeg1Video,
    Mpeg2Video,
    Mpeg4,
    Theora,
    ProRes,
    RawVideo,

    // Image codecs
    Mjpeg,
    Png,
    Apng,
    Gif,
    Bmp,
    Tiff,
    Webp,

    // Audio codecs
    Mp3,
    Aac,
    Flac,
    Opus,
    Vorbis,
    Alac,
    Ac3,
    Eac3,
    PcmS16Le,
    PcmS16Be,
    PcmS24Le,
    PcmS32Le,
    PcmF32Le,
    PcmF64Le,
    PcmU8,

    // Subtitle codecs
    Subrip,
    Ass,
    WebVtt,
    DvdSubtitle,
    PgsSubtitle,

    /// Any codec not listed above.
    Other,
}

impl CodecId {
    /**
        Classify this codec.

        Image codecs are checked first so that MJPEG/PNG streams inside
        video containers are not mistaken for playable video.
    */
    pub const fn kind(self) -> MediaKind {
        if self.is_image() {
            MediaKind::Image
        } else if self.is_video() {
            MediaKind::Video
        } else if self.is_audio() {
            MediaKind::Audio
        } else if self.is_subtitle() {
            MediaKind::Subtitle
        } else {
            MediaKind::Unknown
        }
    }

    pub const fn is_video(self) -> bool {
        matches!(
            self,
            Self::H264
                | Self::Hevc
                | Self::Vp8
                | Self::Vp9
                | Self::Av1
                | Self::Mpeg1Video
                | Self::Mpeg2Video
                | Self::Mpeg4
                | Self::Theora
                | Self::ProRes
                | Self::RawVideo
        )
    }

    pub const fn is_image(self) -> bool {
        matches!(
            self,
            Self::Mjpeg
                | Self::Png
                | Self::Apng
                | Self::Gif
                | Self::Bmp
                | Self::Tiff
                | Self::Webp
        )
    }

    pub const fn is_audio(self) -> bool {
        matches!(
            self,
            Self::Mp3
                | Self::Aac
                | Self::Flac
                | Self::Opus
                | Self::Vorbis
                | Self::Alac
                | Self::Ac3
                | Self::Eac3
                | Self::PcmS16Le
                | Self::PcmS16Be
                | Self::PcmS24Le
                | Self::PcmS32Le
                | Self::PcmF32Le
                | Self::PcmF64Le
                | Self::PcmU8
        )
    }

    pub const fn is_subtitle(self) -> bool {
        matches!(
            self,
            Self::Subrip | Self::Ass | Self::WebVtt | Self::DvdSubtitle | Self::PgsSubtitle
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_video_families() {
        for id in [
            CodecId::H264,
            CodecId::Hevc,
            CodecId::Vp8,
            CodecId::Vp9,
            CodecId::Av1,
            CodecId::Mpeg2Video,
            CodecId::Mpeg4,
        ] {
            assert_eq!(id.kind(), MediaKind::Video, "{id:?}");
        }
    }

    #[test]
    fn required_audio_families() {
        for id in [
            CodecId::Mp3,
            CodecId::Aac,
            CodecId::Flac,
            CodecId::Opus,
            CodecId::PcmS16Le,
            CodecId::PcmF32Le,
        ] {
            assert_eq!(id.kind(), MediaKind::Audio, "{id:?}");
        }
    }

    #[test]
    fn image_wins_over_video() {
        assert_eq!(CodecId::Mjpeg.kind(), MediaKind::Image);
        assert_eq!(CodecId::Png.kind(), MediaKind::Image);
    }

    #[test]
    fn subtitles_and_unknown() {
        assert_eq!(CodecId::Subrip.kind(), MediaKind::Subtitle);
        assert_eq!(CodecId::Other.kind(), MediaKind::Unknown);
        assert_eq!(MediaKind::Subtitle.name(), "subtitle");
    }
}
