/*!
    Timestamp types for media timing.
*/

use std::time::Duration;

use crate::Rational;

/**
    Presentation timestamp in time_base units.

    This is the raw timestamp value from the media stream. To convert to
    a meaningful time you need the stream's time base.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pts(pub i64);

impl Pts {
    /**
        Convert this PTS to seconds using the given time base.

        Unlike [`Pts::to_duration`] this keeps the sign, which matters for
        streams with a negative start offset (e.g. audio priming samples).
    */
    #[inline]
    pub fn to_seconds(self, time_base: Rational) -> f64 {
        self.0 as f64 * time_base.to_f64()
    }

    /**
        Convert this PTS to a Duration using the given time base.

        Negative PTS values are clamped to zero.
    */
    #[inline]
    pub fn to_duration(self, time_base: Rational) -> Duration {
        Duration::from_secs_f64(self.to_seconds(time_base).max(0.0))
    }
}

impl From<i64> for Pts {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/**
    Duration in time_base units.

    Similar to Pts but semantically a length rather than a point in time.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MediaDuration(pub i64);

impl MediaDuration {
    /**
        Convert this duration to a std Duration using the given time base.

        Negative values are clamped to zero.
    */
    #[inline]
    pub fn to_duration(self, time_base: Rational) -> Duration {
        if self.0 <= 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64((self.0 as f64 * time_base.to_f64()).max(0.0))
    }

    /**
        Returns true if the container reported no duration for this unit.
    */
    #[inline]
    pub fn is_unknown(self) -> bool {
        self.0 <= 0
    }
}

/**
    Format a duration as `HH:MM:SS`, or `MM:SS` when shorter than an hour.
*/
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
