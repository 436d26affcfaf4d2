//! Fixed-point math utilities for deterministic simulation.
//!
//! All combat math uses fixed-point arithmetic so that a recorded session
//! replays bit-for-bit on any machine. Floating-point values only appear at
//! the configuration boundary, where [`decimal_serde`] converts them once at
//! load time.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for `Option<Fixed>` using the raw bit representation.
pub mod option_fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize an optional fixed-point number.
    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.map(Fixed::to_bits).serialize(serializer)
    }

    /// Deserialize an optional fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<i64>::deserialize(deserializer)?;
        Ok(opt.map(Fixed::from_bits))
    }
}

/// Serde support for human-authored configuration values.
///
/// Data files write `burst_delay: 0.4` rather than raw bits. The value is
/// converted to [`Fixed`] once at load; every value small enough to appear
/// in a weapon definition round-trips exactly through `f64`.
pub mod decimal_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a decimal into a fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| serde::de::Error::custom(format!("value {value} out of fixed-point range")))
    }
}

/// Serde support for optional decimal configuration values.
pub mod option_decimal_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize an optional fixed-point number as a decimal.
    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.map(|v| v.to_num::<f64>()).serialize(serializer)
    }

    /// Deserialize an optional decimal into a fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<f64>::deserialize(deserializer)? {
            None => Ok(None),
            Some(value) => Fixed::checked_from_num(value).map(Some).ok_or_else(|| {
                serde::de::Error::custom(format!("value {value} out of fixed-point range"))
            }),
        }
    }
}

/// Serde support for configuration vectors written as `(x, y)` decimals.
pub mod decimal_vec_serde {
    use super::{Fixed, Vec2Fixed};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a vector as a decimal tuple.
    pub fn serialize<S>(value: &Vec2Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (value.x.to_num::<f64>(), value.y.to_num::<f64>()).serialize(serializer)
    }

    /// Deserialize a decimal tuple into a vector.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec2Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (x, y) = <(f64, f64)>::deserialize(deserializer)?;
        match (Fixed::checked_from_num(x), Fixed::checked_from_num(y)) {
            (Some(x), Some(y)) => Ok(Vec2Fixed::new(x, y)),
            _ => Err(serde::de::Error::custom(format!(
                "vector ({x}, {y}) out of fixed-point range"
            ))),
        }
    }
}

/// Pi as a fixed-point number.
#[must_use]
pub fn pi() -> Fixed {
    Fixed::from_num(fixed::consts::PI)
}

/// Convert degrees to radians.
#[must_use]
pub fn deg_to_rad(degrees: Fixed) -> Fixed {
    degrees * pi() / Fixed::from_num(180)
}

/// Sine of an angle in radians.
///
/// The argument is wrapped into `[-pi, pi]`, folded into `[-pi/2, pi/2]`
/// and evaluated with a Taylor series, which stays within 1e-8 of the
/// true value over the folded range.
#[must_use]
pub fn sin(radians: Fixed) -> Fixed {
    let pi = pi();
    let tau = pi * Fixed::from_num(2);
    let half_pi = pi / Fixed::from_num(2);

    let turns = (radians / tau).round();
    let mut x = radians - turns * tau;
    if x > half_pi {
        x = pi - x;
    } else if x < -half_pi {
        x = -pi - x;
    }

    let x2 = x * x;
    let mut term = x;
    let mut sum = x;
    for n in 1..10_i32 {
        let denom = Fixed::from_num((2 * n) * (2 * n + 1));
        term = -term * x2 / denom;
        sum += term;
    }
    sum
}

/// Cosine of an angle in radians.
#[must_use]
pub fn cos(radians: Fixed) -> Fixed {
    sin(radians + pi() / Fixed::from_num(2))
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from any numbers convertible to [`Fixed`].
    ///
    /// Intended for setup code and tests; simulation code should build
    /// vectors from values that are already fixed-point.
    #[must_use]
    pub fn from_num<A: fixed::traits::ToFixed, B: fixed::traits::ToFixed>(x: A, y: B) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Unit vector along +X, the default facing of a freshly spawned entity.
    pub const RIGHT: Self = Self {
        x: Fixed::ONE,
        y: Fixed::ZERO,
    };

    /// Unit vector for an angle in degrees, measured counter-clockwise from +X.
    #[must_use]
    pub fn from_angle_deg(degrees: Fixed) -> Self {
        let radians = deg_to_rad(degrees);
        Self::new(cos(radians), sin(radians))
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z component of the 3D cross product).
    #[must_use]
    pub fn cross(self, other: Self) -> Fixed {
        self.x * other.y - self.y * other.x
    }

    /// Squared length of the vector.
    #[must_use]
    pub fn length_squared(self) -> Fixed {
        self.dot(self)
    }

    /// Length of the vector.
    #[must_use]
    pub fn length(self) -> Fixed {
        fixed_sqrt(self.length_squared())
    }

    /// Check whether both components are zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x == Fixed::ZERO && self.y == Fixed::ZERO
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len_sq = self.dot(self);

        if len_sq == Fixed::ZERO {
            return Self::ZERO;
        }

        let len = fixed_sqrt(len_sq);
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// Rescale the vector to the given length, keeping its direction.
    #[must_use]
    pub fn with_length(self, length: Fixed) -> Self {
        self.normalize().scale(length)
    }

    /// Perpendicular vector, rotated 90 degrees counter-clockwise.
    #[must_use]
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Reflect the vector about a surface normal: `v - 2 (v . n) n`.
    ///
    /// The normal is normalized first, so callers may pass any non-zero
    /// surface normal.
    #[must_use]
    pub fn reflect(self, normal: Self) -> Self {
        let n = normal.normalize();
        let two_dot = self.dot(n) * Fixed::from_num(2);
        self - n.scale(two_dot)
    }

    /// Rotate the vector counter-clockwise by an angle in degrees.
    #[must_use]
    pub fn rotate_deg(self, degrees: Fixed) -> Self {
        if degrees == Fixed::ZERO {
            return self;
        }
        let radians = deg_to_rad(degrees);
        let (s, c) = (sin(radians), cos(radians));
        Self::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::from_num(1) {
        value
    } else {
        Fixed::from_num(1)
    };

    for _ in 0..48 {
        let mid = (low + high) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    if high.saturating_mul(high) <= value {
        high
    } else {
        low
    }
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

impl std::ops::AddAssign for Vec2Fixed {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
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

impl std::ops::Neg for Vec2Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl std::ops::Mul<Fixed> for Vec2Fixed {
    type Output = Self;

    fn mul(self, rhs: Fixed) -> Self::Output {
        self.scale(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Fixed, b: Fixed, eps: f64) -> bool {
        (a - b).abs() < Fixed::from_num(eps)
    }

    #[test]
    fn test_vec2_distance_squared() {
        let a = Vec2Fixed::new(Fixed::from_num(3), Fixed::from_num(0));
        let b = Vec2Fixed::new(Fixed::from_num(0), Fixed::from_num(4));
        let dist_sq = a.distance_squared(b);
        // 3² + 4² = 25
        assert_eq!(dist_sq, Fixed::from_num(25));
        assert!(close(a.distance(b), Fixed::from_num(5), 1e-6));
    }

    #[test]
    fn test_fixed_determinism() {
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a, b);

        let result1 = a * Fixed::from_num(7);
        let result2 = b * Fixed::from_num(7);
        assert_eq!(result1, result2);
    }

    #[test]
    fn test_vec2_normalize() {
        let v = Vec2Fixed::new(Fixed::from_num(3), Fixed::from_num(4));
        let norm = v.normalize();

        let one = Fixed::from_num(1);
        let epsilon = one / Fixed::from_num(10000);
        assert!((norm.length_squared() - one).abs() < epsilon);

        let ratio_diff = (norm.x * Fixed::from_num(4)) - (norm.y * Fixed::from_num(3));
        assert!(ratio_diff.abs() < epsilon, "direction not preserved: {ratio_diff:?}");
    }

    #[test]
    fn test_normalize_zero_is_zero() {
        assert_eq!(Vec2Fixed::ZERO.normalize(), Vec2Fixed::ZERO);
    }

    #[test]
    fn test_sin_cos_known_angles() {
        let half_pi = pi() / Fixed::from_num(2);
        assert!(close(sin(Fixed::ZERO), Fixed::ZERO, 1e-7));
        assert!(close(sin(half_pi), Fixed::ONE, 1e-7));
        assert!(close(cos(Fixed::ZERO), Fixed::ONE, 1e-7));
        assert!(close(cos(pi()), -Fixed::ONE, 1e-7));
        // Wrapping: sin(2pi + pi/6) = 0.5
        let angle = pi() * Fixed::from_num(2) + pi() / Fixed::from_num(6);
        assert!(close(sin(angle), Fixed::from_num(0.5), 1e-7));
    }

    #[test]
    fn test_sin_matches_reference() {
        for degrees in (-720..=720).step_by(15) {
            let radians = deg_to_rad(Fixed::from_num(degrees));
            let expected = radians.to_num::<f64>().sin();
            let actual = sin(radians).to_num::<f64>();
            assert!(
                (actual - expected).abs() < 1e-8,
                "sin({degrees} deg) = {actual}, expected {expected}"
            );
        }
    }

    #[test]
    fn test_rotate_deg() {
        let rotated = Vec2Fixed::RIGHT.rotate_deg(Fixed::from_num(90));
        assert!(close(rotated.x, Fixed::ZERO, 1e-7));
        assert!(close(rotated.y, Fixed::ONE, 1e-7));

        let back = rotated.rotate_deg(Fixed::from_num(-90));
        assert!(close(back.x, Fixed::ONE, 1e-7));
        assert!(close(back.y, Fixed::ZERO, 1e-7));
    }

    #[test]
    fn test_reflect_about_normal() {
        // Moving down-right, hitting a floor whose normal points up.
        let v = Vec2Fixed::from_num(3, -4);
        let r = v.reflect(Vec2Fixed::from_num(0, 1));
        assert!(close(r.x, Fixed::from_num(3), 1e-6));
        assert!(close(r.y, Fixed::from_num(4), 1e-6));

        // Non-normalized normals behave the same.
        let r2 = v.reflect(Vec2Fixed::from_num(0, 5));
        assert!(close(r2.x, Fixed::from_num(3), 1e-6));
        assert!(close(r2.y, Fixed::from_num(4), 1e-6));
    }

    #[test]
    fn test_decimal_serde_round_trip() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            #[serde(with = "decimal_serde")]
            value: Fixed,
        }

        let parsed: Wrapper = ron::from_str("(value: 0.4)").expect("valid ron");
        assert_eq!(parsed.value, Fixed::from_num(0.4));

        let text = ron::to_string(&parsed).expect("serializable");
        let again: Wrapper = ron::from_str(&text).expect("valid ron");
        assert_eq!(again.value, parsed.value);
    }
}
