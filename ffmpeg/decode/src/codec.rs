/*!
    Conversions between ffmpeg-next and ffmpeg-types vocabulary.
*/

use ffmpeg_next::{codec, ffi, packet::Mut as PacketMut};

use ffmpeg_types::{CodecId, Error, Packet, Rational, Result};

use crate::config::DecoderConfig;

pub(crate) fn rational_from_ffmpeg(value: ffmpeg_next::Rational) -> Rational {
    Rational::new(value.numerator(), value.denominator())
}

/**
    Create a codec context for a stream, ready to be turned into a decoder.

    The packet time base is set so that decoded frame timestamps come out in
    the stream's time base.
*/
pub(crate) fn open_context(
    parameters: codec::Parameters,
    time_base: Rational,
    config: &DecoderConfig,
) -> Result<codec::context::Context> {
    let mut ctx = codec::context::Context::from_parameters(parameters)
        .map_err(|e| Error::codec(e.to_string()))?;

    unsafe {
        (*ctx.as_mut_ptr()).pkt_timebase = ffi::AVRational {
            num: time_base.num,
            den: time_base.den,
        };
    }
    config.apply(&mut ctx);

    Ok(ctx)
}

/**
    Build an FFmpeg packet carrying our packet's data and timing.
*/
pub(crate) fn packet_to_ffmpeg(packet: &Packet) -> ffmpeg_next::Packet {
    let mut ffmpeg_pkt = if packet.data.is_empty() {
        ffmpeg_next::Packet::empty()
    } else {
        ffmpeg_next::Packet::copy(&packet.data)
    };

    unsafe {
        let pkt_ptr = ffmpeg_pkt.as_mut_ptr();
        if let Some(pts) = packet.pts {
            (*pkt_ptr).pts = pts.0;
        }
        if let Some(dts) = packet.dts {
            (*pkt_ptr).dts = dts.0;
        }
        (*pkt_ptr).duration = packet.duration.0;
        if packet.is_keyframe {
            (*pkt_ptr).flags |= ffi::AV_PKT_FLAG_KEY as i32;
        }
    }

    ffmpeg_pkt
}

/**
    Map an error from `avcodec_send_packet`.

    EOF means the codec was already drained and will not accept input until
    it is reset, which the caller cannot recover from by retrying.
*/
pub(crate) fn send_error(error: ffmpeg_next::Error) -> Error {
    match error {
        ffmpeg_next::Error::Eof => Error::decoder_closed("codec already drained"),
        e => Error::codec(e.to_string()),
    }
}

/**
    Returns true if a receive error only means "no frame right now".
*/
pub(crate) fn is_empty_receive(error: &ffmpeg_next::Error) -> bool {
    match error {
        ffmpeg_next::Error::Eof => true,
        ffmpeg_next::Error::Other { errno } => *errno == ffmpeg_next::util::error::EAGAIN,
        _ => false,
    }
}

/**
    Classify an FFmpeg codec id.
*/
pub(crate) fn codec_id_from_ffmpeg(id: codec::Id) -> CodecId {
    use codec::Id;

    match id {
        Id::H264 => CodecId::H264,
        Id::HEVC => CodecId::Hevc,
        Id::VP8 => CodecId::Vp8,
        Id::VP9 => CodecId::Vp9,
        Id::AV1 => CodecId::Av1,
        Id::MPEG1VIDEO => CodecId::Mpeg1Video,
        Id::MPEG2VIDEO => CodecId::Mpeg2Video,
        Id::MPEG4 => CodecId::Mpeg4,
        Id::THEORA => CodecId::Theora,
        Id::PRORES => CodecId::ProRes,
        Id::RAWVIDEO => CodecId::RawVideo,

        Id::MJPEG => CodecId::Mjpeg,
        Id::PNG => CodecId::Png,
        Id::APNG => CodecId::Apng,
        Id::GIF => CodecId::Gif,
        Id::BMP => CodecId::Bmp,
        Id::TIFF => CodecId::Tiff,
        Id::WEBP => CodecId::Webp,

        Id::MP3 => CodecId::Mp3,
        Id::AAC => CodecId::Aac,
        Id::FLAC => CodecId::Flac,
        Id::OPUS => CodecId::Opus,
        Id::VORBIS => CodecId::Vorbis,
        Id::ALAC => CodecId::Alac,
        Id::AC3 => CodecId::Ac3,
        Id::EAC3 => CodecId::Eac3,
        Id::PCM_S16LE => CodecId::PcmS16Le,
        Id::PCM_S16BE => CodecId::PcmS16Be,
        Id::PCM_S24LE => CodecId::PcmS24Le,
        Id::PCM_S32LE => CodecId::PcmS32Le,
        Id::PCM_F32LE => CodecId::PcmF32Le,
        Id::PCM_F64LE => CodecId::PcmF64Le,
        Id::PCM_U8 => CodecId::PcmU8,

        Id::SUBRIP => CodecId::Subrip,
        Id::ASS => CodecId::Ass,
        Id::WEBVTT => CodecId::WebVtt,
        Id::DVD_SUBTITLE => CodecId::DvdSubtitle,
        Id::HDMV_PGS_SUBTITLE => CodecId::PgsSubtitle,

        _ => CodecId::Other,
    }
}
