//! Fixed-point math utilities for the encounter simulation.
//!
//! All encounter state (hit points, timers, positions) uses fixed-point
//! arithmetic so that a seeded session produces the same trajectory on
//! every platform. Trigonometry is approximated in fixed-point as well,
//! which keeps floating-point out of anything that feeds back into state.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// π in fixed-point.
pub const PI: Fixed = Fixed::from_bits(13_493_037_705);

/// π / 2 in fixed-point.
pub const HALF_PI: Fixed = Fixed::from_bits(6_746_518_852);

/// 2π in fixed-point.
pub const TAU: Fixed = Fixed::from_bits(26_986_075_409);

/// Build a fixed-point ratio from two integers without touching floats.
///
/// ```
/// use arena_core::math::{ratio, Fixed};
///
/// assert_eq!(ratio(1, 2), Fixed::from_num(0.5));
/// ```
#[must_use]
pub fn ratio(numerator: i32, denominator: i32) -> Fixed {
    Fixed::from_num(numerator) / Fixed::from_num(denominator)
}

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "decimal_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "decimal_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers written as plain decimals.
///
/// Balance files and headless output are edited and read by people, so
/// values travel as `f64` and are converted back with an overflow check.
pub mod decimal_serde {
    use super::Fixed;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(raw)
            .ok_or_else(|| D::Error::custom(format!("{raw} is out of fixed-point range")))
    }
}

/// Serde support for `Option<Fixed>` written as an optional decimal.
pub mod option_decimal_serde {
    use super::Fixed;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize an optional fixed-point number.
    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_some(&v.to_num::<f64>()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<f64>::deserialize(deserializer)? {
            Some(raw) => Fixed::checked_from_num(raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("{raw} is out of fixed-point range"))),
            None => Ok(None),
        }
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        (self - other).length_squared()
    }

    /// Calculate the distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Check whether `other` lies within `radius` of this point.
    #[must_use]
    pub fn within(self, other: Self, radius: Fixed) -> bool {
        self.distance_squared(other) < radius.saturating_mul(radius)
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x
            .saturating_mul(other.x)
            .saturating_add(self.y.saturating_mul(other.y))
    }

    /// Squared length of the vector.
    #[must_use]
    pub fn length_squared(self) -> Fixed {
        self.dot(self)
    }

    /// Scale both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(
            self.x.saturating_mul(factor),
            self.y.saturating_mul(factor),
        )
    }

    /// Rotate the vector a quarter turn counter-clockwise.
    #[must_use]
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len_sq = self.length_squared();

        if len_sq == Fixed::ZERO {
            return Self::ZERO;
        }

        let len = fixed_sqrt(len_sq);
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// Unit vector pointing along `angle` (radians).
    #[must_use]
    pub fn from_angle(angle: Fixed) -> Self {
        Self::new(fixed_cos(angle), fixed_sin(angle))
    }

    /// Heading from this point toward `target`, in radians.
    #[must_use]
    pub fn angle_to(self, target: Self) -> Fixed {
        let diff = target - self;
        fixed_atan2(diff.y, diff.x)
    }
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..48 {
        let mid = (low + high) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Wrap an angle into `[-π, π]`.
#[must_use]
pub fn wrap_angle(angle: Fixed) -> Fixed {
    let mut wrapped = angle % TAU;
    if wrapped > PI {
        wrapped -= TAU;
    } else if wrapped < -PI {
        wrapped += TAU;
    }
    wrapped
}

/// Fixed-point sine (Bhaskara I approximation, error below 0.002).
#[must_use]
pub fn fixed_sin(angle: Fixed) -> Fixed {
    let a = wrap_angle(angle);
    if a < Fixed::ZERO {
        return -bhaskara(-a);
    }
    bhaskara(a)
}

/// Fixed-point cosine.
#[must_use]
pub fn fixed_cos(angle: Fixed) -> Fixed {
    fixed_sin(angle + HALF_PI)
}

/// Sine on `[0, π]`.
fn bhaskara(a: Fixed) -> Fixed {
    let product = a * (PI - a);
    let denominator = Fixed::from_num(5) * PI * PI - Fixed::from_num(4) * product;
    if denominator == Fixed::ZERO {
        return Fixed::ZERO;
    }
    Fixed::from_num(16) * product / denominator
}

/// Fixed-point `atan2(y, x)` in radians, range `[-π, π]`.
///
/// Uses a polynomial arctangent on the first octant (error below 0.0015 rad)
/// and reflects into the other octants.
#[must_use]
pub fn fixed_atan2(y: Fixed, x: Fixed) -> Fixed {
    if x == Fixed::ZERO && y == Fixed::ZERO {
        return Fixed::ZERO;
    }

    let ax = x.abs();
    let ay = y.abs();
    let (z, swapped) = if ax >= ay { (ay / ax, false) } else { (ax / ay, true) };

    let quarter_pi = PI / Fixed::from_num(4);
    let c1 = ratio(2447, 10000);
    let c2 = ratio(663, 10000);
    let mut angle = quarter_pi * z - z * (z - Fixed::ONE) * (c1 + c2 * z);

    if swapped {
        angle = HALF_PI - angle;
    }
    if x < Fixed::ZERO {
        angle = PI - angle;
    }
    if y < Fixed::ZERO {
        angle = -angle;
    }
    angle
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::AddAssign for Vec2Fixed {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}
