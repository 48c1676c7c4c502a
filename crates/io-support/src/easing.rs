//! Interpolation curves for time-based effects layered on top of the
//! motion core (e.g. a UI progress indicator), kept deliberately small:
//! the motion core itself never calls into an `Easing` implementation.

/// `f(t, b, c, d)`: value at elapsed time `t`, starting value `b`, total
/// change `c`, duration `d`.
pub trait Easing {
    fn ease(&self, t: f32, b: f32, c: f32, d: f32) -> f32;
}

pub struct Linear;

impl Easing for Linear {
    fn ease(&self, t: f32, b: f32, c: f32, d: f32) -> f32 {
        c * (t / d) + b
    }
}

pub struct QuadInOut;

impl Easing for QuadInOut {
    fn ease(&self, t: f32, b: f32, c: f32, d: f32) -> f32 {
        let t = t / (d / 2.0);
        if t < 1.0 {
            c / 2.0 * t * t + b
        } else {
            let t = t - 1.0;
            -c / 2.0 * (t * (t - 2.0) - 1.0) + b
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_reaches_endpoints() {
        let e = Linear;
        assert_eq!(e.ease(0.0, 10.0, 5.0, 2.0), 10.0);
        assert_eq!(e.ease(2.0, 10.0, 5.0, 2.0), 15.0);
    }

    #[test]
    fn quad_in_out_is_symmetric_at_midpoint() {
        let e = QuadInOut;
        let mid = e.ease(1.0, 0.0, 10.0, 2.0);
        assert!((mid - 5.0).abs() < 1e-4);
    }
}
