/*!
    Packets as they travel from the demux stage to a decode stage.
*/

use std::time::Duration;

use ffmpeg_types::{Packet, StreamType};

/**
    An encoded packet routed to one elementary stream.

    The packet is owned by exactly one queue or stage at a time; it is moved
    out of the packet queue by its decode stage and dropped after decoding.
*/
#[derive(Clone, Debug)]
pub struct CodedPacket {
    /// The packet as read from the container.
    pub packet: Packet,
    /// Presentation time in the stream's timeline.
    pub pts: Duration,
    /// Which decode stage this packet is for.
    pub stream: StreamType,
    /// Seek generation the packet was read in.
    pub generation: u64,
}

impl CodedPacket {
    pub fn new(packet: Packet, stream: StreamType, generation: u64) -> Self {
        Self {
            pts: packet.presentation_time(),
            packet,
            stream,
            generation,
        }
    }

    /// Presentation time in seconds.
    pub fn pts_secs(&self) -> f64 {
        self.pts.as_secs_f64()
    }

    /// Container-reported duration, if any.
    pub fn duration(&self) -> Option<Duration> {
        self.packet.packet_duration()
    }
}

static_assertions::assert_impl_all!(CodedPacket: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_types::{MediaDuration, Pts, Rational};

    fn packet(pts: Option<i64>) -> Packet {
        Packet {
            data: vec![1, 2, 3],
            stream_index: 1,
            pts: pts.map(Pts),
            dts: None,
            duration: MediaDuration(512),
            time_base: Rational::new(1, 1024),
            is_keyframe: true,
        }
    }

    #[test]
    fn pts_uses_stream_time_base() {
        let coded = CodedPacket::new(packet(Some(2048)), StreamType::Audio, 3);
        assert_eq!(coded.pts, Duration::from_secs(2));
        assert_eq!(coded.pts_secs(), 2.0);
        assert_eq!(coded.duration(), Some(Duration::from_millis(500)));
        assert_eq!(coded.generation, 3);
    }

    #[test]
    fn missing_pts_is_zero() {
        let coded = CodedPacket::new(packet(None), StreamType::Video, 0);
        assert_eq!(coded.pts, Duration::ZERO);
    }
}
