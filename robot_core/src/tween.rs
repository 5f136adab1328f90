// Interpolation primitives shared by every animated quantity.
// Damped approach for tweens that chase a moving target, linear mix for timed ramps.

use crate::types::Point;

/// Move `current` a `factor` fraction of the remaining distance toward `target`.
/// Applied once per tick this gives an exponential ease-out, not constant speed.
pub fn lerp(current: f32, target: f32, factor: f32) -> f32 {
    current + (target - current) * factor
}

/// True once `current` is within `epsilon` of `target`; callers snap and stop.
pub fn approach(current: f32, target: f32, epsilon: f32) -> bool {
    (target - current).abs() < epsilon
}

/// Linear blend from `from` to `to` at progress `t` (clamped to 0..=1).
/// Exact at both ends, so timed ramps land on their endpoint.
pub fn mix(from: f32, to: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    from * (1.0 - t) + to * t
}

pub fn distance(a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt()
}

/// Damped approach for both axes.
pub fn lerp_point(current: Point, target: Point, factor: f32) -> Point {
    Point::new(
        lerp(current.x, target.x, factor),
        lerp(current.y, target.y, factor),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_moves_a_fraction_of_the_gap() {
        assert_eq!(lerp(0.0, 10.0, 0.1), 1.0);
        assert_eq!(lerp(9.0, 10.0, 0.5), 9.5);
    }

    #[test]
    fn repeated_lerp_converges_without_overshoot() {
        let mut value = 0.0;
        let mut ticks = 0;
        while !approach(value, 1.0, 0.01) {
            value = lerp(value, 1.0, 0.1);
            assert!(value <= 1.0);
            ticks += 1;
        }
        assert!(ticks > 10 && ticks < 100);
    }

    #[test]
    fn mix_clamps_progress() {
        assert_eq!(mix(1.5, 0.02, 0.0), 1.5);
        assert_eq!(mix(1.5, 0.02, 2.0), 0.02);
        assert!((mix(0.0, 10.0, 0.25) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn mix_hits_endpoints_exactly() {
        for (from, to) in [(1.5, 0.02), (0.3, 0.0), (0.0, 1.0), (-4.0, 7.25)] {
            assert_eq!(mix(from, to, 0.0), from);
            assert_eq!(mix(from, to, 1.0), to);
        }
    }

    #[test]
    fn distance_is_euclidean() {
        assert_eq!(distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0)), 5.0);
    }
}
