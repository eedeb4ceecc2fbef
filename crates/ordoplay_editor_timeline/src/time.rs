// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rational time arithmetic.
//!
//! Everything on the timeline is measured in integer ticks of a [`TimeBase`].
//! A [`FrameClock`] converts between ticks and frame indices using a frame
//! duration computed once, so that repeated conversions never drift.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A rational number represented as a numerator and denominator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    /// Numerator
    pub num: i64,
    /// Denominator (valid rationals have a positive denominator)
    pub den: i64,
}

impl Rational {
    /// Create a new rational number.
    ///
    /// The value is stored as given; use [`Rational::is_valid`] before
    /// dividing by it.
    pub const fn new(num: i64, den: i64) -> Self {
        Self { num, den }
    }

    /// Create a rational from an integer
    pub const fn from_int(n: i64) -> Self {
        Self { num: n, den: 1 }
    }

    /// Whether the denominator is positive
    pub fn is_valid(&self) -> bool {
        self.den > 0
    }

    /// Whether this is a valid, strictly positive value
    pub fn is_positive(&self) -> bool {
        self.is_valid() && self.num > 0
    }

    /// Reduce to lowest terms
    pub fn reduce(&self) -> Self {
        if self.num == 0 || self.den == 0 {
            return Self { num: 0, den: 1 };
        }
        let g = gcd(self.num.unsigned_abs(), self.den.unsigned_abs()) as i64;
        Self {
            num: self.num / g,
            den: self.den / g,
        }
    }

    /// Approximate value, for display and logging only
    pub fn to_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Length of one tick in seconds.
///
/// A time base of `1/600000` means 600000 ticks per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeBase(pub Rational);

impl TimeBase {
    /// MPEG system clock (1/90000)
    pub const MPEG: Self = Self(Rational::new(1, 90_000));

    /// Microseconds (1/1000000)
    pub const MICROSECONDS: Self = Self(Rational::new(1, 1_000_000));

    /// Create a time base from numerator and denominator
    pub const fn new(num: i64, den: i64) -> Self {
        Self(Rational::new(num, den))
    }

    /// Both numerator and denominator are positive
    pub fn is_valid(&self) -> bool {
        self.0.is_positive()
    }

    /// Ticks in one second (the reciprocal of the time base)
    pub fn ticks_per_second(&self) -> Rational {
        Rational::new(self.0.den, self.0.num)
    }

    /// Convert a tick count from this time base into `target`.
    ///
    /// Uses a 128-bit intermediate and rounds to the nearest tick, ties away
    /// from zero. Both time bases must be valid.
    pub fn rescale(&self, value: i64, target: TimeBase) -> i64 {
        if *self == target {
            return value;
        }
        let num = value as i128 * self.0.num as i128 * target.0.den as i128;
        let den = self.0.den as i128 * target.0.num as i128;
        let mut q = num / den;
        let r = num % den;
        if 2 * r.abs() >= den {
            q += num.signum();
        }
        q.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::new(1, 600_000)
    }
}

impl fmt::Display for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0.num, self.0.den)
    }
}

/// Error when building a [`FrameClock`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    /// Time base numerator or denominator is not positive
    #[error("Invalid time base: {0}")]
    InvalidTimeBase(TimeBase),

    /// Frame rate is not positive
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(Rational),

    /// Frame rate is higher than the tick rate
    #[error("Frame duration is zero ticks ({frame_rate} fps at {time_base})")]
    ZeroFrameDuration {
        /// Time base
        time_base: TimeBase,
        /// Frame rate
        frame_rate: Rational,
    },
}

/// Converts between frame indices and ticks of a time base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameClock {
    time_base: TimeBase,
    frame_rate: Rational,
    frame_duration: i64,
    exact: bool,
}

impl FrameClock {
    /// Create a clock for `frame_rate` frames per second.
    ///
    /// The frame duration is `ticks_per_second / frame_rate`, truncated when
    /// the division is inexact. Truncation is logged as a warning since frame
    /// boundaries then drift against wall-clock seconds.
    pub fn new(time_base: TimeBase, frame_rate: Rational) -> Result<Self, TimeError> {
        if !time_base.is_valid() {
            return Err(TimeError::InvalidTimeBase(time_base));
        }
        if !frame_rate.is_positive() {
            return Err(TimeError::InvalidFrameRate(frame_rate));
        }

        let num = time_base.0.den as i128 * frame_rate.den as i128;
        let den = time_base.0.num as i128 * frame_rate.num as i128;
        let frame_duration = num / den;
        let exact = num % den == 0;

        if frame_duration == 0 {
            return Err(TimeError::ZeroFrameDuration { time_base, frame_rate });
        }
        let frame_duration = i64::try_from(frame_duration)
            .map_err(|_| TimeError::InvalidTimeBase(time_base))?;

        if !exact {
            tracing::warn!(
                "Frame duration truncated to {} ticks ({} fps at {})",
                frame_duration,
                frame_rate,
                time_base
            );
        }

        Ok(Self {
            time_base,
            frame_rate,
            frame_duration,
            exact,
        })
    }

    /// Time base of the ticks
    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    /// Frames per second
    pub fn frame_rate(&self) -> Rational {
        self.frame_rate
    }

    /// Duration of one frame in ticks
    pub fn frame_duration(&self) -> i64 {
        self.frame_duration
    }

    /// Whether the frame duration divides a second exactly
    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// First tick of a frame
    pub fn frame_index_to_pts(&self, frame_index: i64) -> i64 {
        frame_index.saturating_mul(self.frame_duration)
    }

    /// Frame containing a tick (floor division)
    pub fn pts_to_frame_index(&self, pts: i64) -> i64 {
        pts.div_euclid(self.frame_duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_duration_exact() {
        let clock = FrameClock::new(TimeBase::new(1, 600_000), Rational::from_int(30)).unwrap();
        assert_eq!(clock.frame_duration(), 20_000);
        assert!(clock.is_exact());

        let ntsc = FrameClock::new(TimeBase::new(1, 600_000), Rational::new(30_000, 1001)).unwrap();
        assert_eq!(ntsc.frame_duration(), 20_020);
        assert!(ntsc.is_exact());
    }

    #[test]
    fn test_frame_duration_truncates() {
        let clock = FrameClock::new(TimeBase::MPEG, Rational::from_int(7)).unwrap();
        assert_eq!(clock.frame_duration(), 12_857);
        assert!(!clock.is_exact());
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(matches!(
            FrameClock::new(TimeBase::new(1, 0), Rational::from_int(30)),
            Err(TimeError::InvalidTimeBase(_))
        ));
        assert!(matches!(
            FrameClock::new(TimeBase::new(1, 90_000), Rational::from_int(0)),
            Err(TimeError::InvalidFrameRate(_))
        ));
        assert!(matches!(
            FrameClock::new(TimeBase::new(1, 90_000), Rational::new(30, -1)),
            Err(TimeError::InvalidFrameRate(_))
        ));
        assert!(matches!(
            FrameClock::new(TimeBase::new(1, 10), Rational::from_int(30)),
            Err(TimeError::ZeroFrameDuration { .. })
        ));
    }

    #[test]
    fn test_round_trip_is_identity() {
        for clock in [
            FrameClock::new(TimeBase::new(1, 600_000), Rational::from_int(30)).unwrap(),
            FrameClock::new(TimeBase::MPEG, Rational::from_int(7)).unwrap(),
        ] {
            for frame in [0, 1, 2, 89, 90, 12_345, 1_000_000] {
                assert_eq!(clock.pts_to_frame_index(clock.frame_index_to_pts(frame)), frame);
            }
        }
    }

    #[test]
    fn test_unaligned_pts_belongs_to_containing_frame() {
        let clock = FrameClock::new(TimeBase::new(1, 600_000), Rational::from_int(30)).unwrap();
        assert_eq!(clock.pts_to_frame_index(19_999), 0);
        assert_eq!(clock.pts_to_frame_index(20_000), 1);
        assert_eq!(clock.pts_to_frame_index(39_999), 1);
        assert_eq!(clock.pts_to_frame_index(-1), -1);
    }

    #[test]
    fn test_rescale_rounds_to_nearest() {
        let ms = TimeBase::new(1, 1000);
        assert_eq!(TimeBase::MPEG.rescale(90_000, ms), 1000);
        assert_eq!(ms.rescale(1, TimeBase::MPEG), 90);
        // 1/3 of a millisecond tick
        assert_eq!(TimeBase::new(1, 3000).rescale(1, ms), 0);
        assert_eq!(TimeBase::new(1, 3000).rescale(2, ms), 1);
        assert_eq!(TimeBase::new(1, 3000).rescale(-2, ms), -1);
        assert_eq!(TimeBase::new(1, 2000).rescale(1, ms), 1);
    }

    #[test]
    fn test_rational_reduce_and_display() {
        assert_eq!(Rational::new(600, 20).reduce(), Rational::from_int(30));
        assert_eq!(Rational::new(30_000, 1001).to_string(), "30000/1001");
        assert_eq!(TimeBase::new(1, 90_000).ticks_per_second(), Rational::new(90_000, 1));
    }
}
