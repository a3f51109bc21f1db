use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Clockwise angle from screen-up to the direction `from -> to`, in [0, 360).
pub fn bearing(from: Point, to: Point) -> f64 {
    let dx = to.x - from.x;
    let dy = from.y - to.y;
    normalize_deg(dx.atan2(dy).to_degrees())
}

/// Point at `radius` from `center` along bearing `angle_deg`.
pub fn endpoint(center: Point, angle_deg: f64, radius: f64) -> Point {
    let rad = angle_deg.to_radians();
    Point::new(center.x + radius * rad.sin(), center.y - radius * rad.cos())
}

pub fn point_to_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

pub fn normalize_deg(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if a >= 360.0 { 0.0 } else { a }
}

/// Shortest signed rotation in [-180, 180).
pub fn signed_delta_deg(delta: f64) -> f64 {
    (delta + 180.0).rem_euclid(360.0) - 180.0
}

/// Clockwise sweep from `from` to `to`, in [0, 360).
pub fn clockwise_span(from: f64, to: f64) -> f64 {
    normalize_deg(to - from)
}

/// `min` wins when the bounds are inverted.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.min(max).max(min)
}

pub fn snap(angle: f64, step: f64, enabled: bool) -> f64 {
    if !enabled || step <= 0.0 {
        return angle;
    }
    (angle / step).round() * step
}

/// Distance of `p` from the circumference of a circle.
pub fn ring_distance(p: Point, center: Point, radius: f64) -> f64 {
    (p.distance(center) - radius).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_bearing_cardinals() {
        let c = Point::new(100.0, 100.0);
        assert!(approx(bearing(c, c.offset(0.0, -10.0)), 0.0));
        assert!(approx(bearing(c, c.offset(10.0, 0.0)), 90.0));
        assert!(approx(bearing(c, c.offset(0.0, 10.0)), 180.0));
        assert!(approx(bearing(c, c.offset(-10.0, 0.0)), 270.0));
    }

    #[test]
    fn test_endpoint_inverts_bearing() {
        let c = Point::new(50.0, 80.0);
        for angle in [0.0, 33.0, 90.0, 181.5, 270.0, 359.0] {
            let p = endpoint(c, angle, 120.0);
            assert!((bearing(c, p) - angle).abs() < 1e-6, "angle {angle}");
            assert!((c.distance(p) - 120.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_segment_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!(approx(point_to_segment_distance(Point::new(5.0, 3.0), a, b), 3.0));
        assert!(approx(point_to_segment_distance(Point::new(-4.0, 3.0), a, b), 5.0));
        assert!(approx(point_to_segment_distance(Point::new(13.0, 4.0), a, b), 5.0));
        assert!(approx(point_to_segment_distance(Point::new(3.0, 4.0), a, a), 5.0));
    }

    #[test]
    fn test_snap() {
        assert!(approx(snap(12.4, 5.0, true), 10.0));
        assert!(approx(snap(12.6, 5.0, true), 15.0));
        assert!(approx(snap(-7.6, 5.0, true), -10.0));
        assert!(approx(snap(12.4, 5.0, false), 12.4));
        assert!(approx(snap(12.4, 0.0, true), 12.4));
        for step in [1.0, 5.0, 15.0, 45.0] {
            for i in 0..720 {
                let a = i as f64 * 0.37;
                let s = snap(a, step, true);
                assert!(approx((s / step).round() * step, s));
                assert!((s - a).abs() <= step / 2.0 + 1e-9);
            }
        }
    }

    #[test]
    fn test_clamp_idempotent() {
        for v in [-50.0, 0.0, 39.9, 40.0, 120.0, 250.0, 900.0] {
            let once = clamp(v, 40.0, 250.0);
            assert_eq!(clamp(once, 40.0, 250.0), once);
            assert!((40.0..=250.0).contains(&once));
        }
        assert_eq!(clamp(10.0, 50.0, 20.0), 50.0);
    }

    #[test]
    fn test_angle_normalization() {
        assert!(approx(normalize_deg(-15.0), 345.0));
        assert!(approx(normalize_deg(725.0), 5.0));
        assert!(approx(signed_delta_deg(350.0), -10.0));
        assert!(approx(signed_delta_deg(-358.0), 2.0));
        assert!(approx(clockwise_span(0.0, 90.0), 90.0));
        assert!(approx(clockwise_span(350.0, 10.0), 20.0));
        assert!(approx(clockwise_span(10.0, 350.0), 340.0));
    }
}
