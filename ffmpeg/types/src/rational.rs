/*!
    Rational number type for time bases and frame rates.
*/

use std::fmt;

/**
    A rational number represented as a numerator and denominator.

    Used for stream time bases (e.g., 1/90000 for MPEG-TS) and frame rates
    (e.g., 30000/1001 for 29.97 fps). Values read from containers may be
    degenerate (0/0 for an unknown frame rate), so construction never panics;
    use [`Rational::positive`] before dividing by one.
*/
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    /**
        Create a new rational number.
    */
    #[inline]
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /**
        Returns true if both numerator and denominator are strictly positive.
    */
    #[inline]
    pub const fn is_positive(self) -> bool {
        self.num > 0 && self.den > 0
    }

    /**
        Convert to f64. A zero denominator yields zero.
    */
    #[inline]
    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        self.num as f64 / self.den as f64
    }

    /**
        Returns the value as f64 only if this rational is strictly positive.

        Frame rates reported by containers are frequently 0/0 or 0/1 when
        unknown; this filters those out.
    */
    #[inline]
    pub fn positive(self) -> Option<f64> {
        self.is_positive().then(|| self.to_f64())
    }

    /**
        Returns the first strictly positive rational of `self` and `fallback`.
    */
    #[inline]
    pub fn or_positive(self, fallback: Rational) -> Option<Rational> {
        if self.is_positive() {
            Some(self)
        } else if fallback.is_positive() {
            Some(fallback)
        } else {
            None
        }
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl From<(i32, i32)> for Rational {
    fn from((num, den): (i32, i32)) -> Self {
        Self::new(num, den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_denominator_is_zero() {
        assert_eq!(Rational::new(1, 0).to_f64(), 0.0);
        assert!(!Rational::new(1, 0).is_positive());
    }

    #[test]
    fn to_f64_conversion() {
        assert_eq!(Rational::new(1, 2).to_f64(), 0.5);
        assert_eq!(Rational::new(1, 1000).to_f64(), 0.001);
        assert_eq!(Rational::new(30000, 1001).to_f64(), 30000.0 / 1001.0);
    }

    #[test]
    fn positive_filters_unknown_rates() {
        assert_eq!(Rational::new(0, 0).positive(), None);
        assert_eq!(Rational::new(0, 1).positive(), None);
        assert_eq!(Rational::new(25, 1).positive(), Some(25.0));
    }

    #[test]
    fn or_positive_prefers_self() {
        let avg = Rational::new(24, 1);
        let real = Rational::new(30, 1);
        assert_eq!(avg.or_positive(real), Some(avg));
        assert_eq!(Rational::new(0, 0).or_positive(real), Some(real));
        assert_eq!(Rational::new(0, 0).or_positive(Rational::new(0, 1)), None);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Rational::new(1, 90000)), "1/90000");
    }
}
