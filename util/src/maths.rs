//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
///
/// The source range must not be degenerate (`source_range.0 != source_range.1`).
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

/// Linearly interpolate between `a` and `b`, `t = 0` giving `a` and `t = 1` giving `b`.
pub fn lerp<T>(a: T, b: T, t: T) -> T
where
    T: Float
{
    a + (b - a) * t
}

/// Clamp a value into `[min, max]`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0.0, 10.0), (0.0, 100.0), 5.0), 50.0);
        assert_eq!(lin_map((10.0, 20.0), (0.0, 4.0), 15.0), 2.0);

        // Inverted target range
        assert_eq!(lin_map((0.0, 1.0), (100.0, 0.0), 0.25), 75.0);
    }

    #[test]
    fn test_lerp_clamp() {
        assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
        assert_eq!(lerp(4.0, 2.0, 1.0), 2.0);

        assert_eq!(clamp(&120.0, &0.0, &100.0), 100.0);
        assert_eq!(clamp(&-3.0, &0.0, &100.0), 0.0);
        assert_eq!(clamp(&42.0, &0.0, &100.0), 42.0);
    }
}
