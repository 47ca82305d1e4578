//! A constant-velocity Kalman filter over a 7-element bounding-box state
//! `[cx, cy, scale, aspect_ratio, vcx, vcy, vscale]`.
//!
//! This follows the matrix-construction style of the teacher's
//! `tracking::motion_model_2d::ConstantVelocity2DModel` (explicit `F`/`Q`/
//! `H`/`R` built with `nalgebra`), but is self-contained rather than going
//! through `adskalman`'s `TransitionModelLinearNoControl`/`ObservationModel`
//! traits: a single fixed state/observation shape needs no trait-level
//! indirection, so the predict/update equations are implemented directly.

use nalgebra::{SMatrix, SVector};

use boardcount_types::BBox;

type State = SVector<f64, 7>;
type StateCov = SMatrix<f64, 7, 7>;
type Observation = SVector<f64, 4>;
type ObservationCov = SMatrix<f64, 4, 4>;

/// Per-track Kalman filter state.
#[derive(Debug, Clone)]
pub struct BoxKalmanFilter {
    x: State,
    p: StateCov,
}

fn transition_matrix() -> StateCov {
    let mut f = StateCov::identity();
    f[(0, 4)] = 1.0; // cx += vcx
    f[(1, 5)] = 1.0; // cy += vcy
    f[(2, 6)] = 1.0; // scale += vscale
    f
}

fn process_noise() -> StateCov {
    let mut q = StateCov::identity() * 0.01;
    // velocity components are noisier than position/shape components,
    // matching the usual SORT parameterization.
    q[(4, 4)] = 0.1;
    q[(5, 5)] = 0.1;
    q[(6, 6)] = 0.1;
    q[(3, 3)] = 0.01;
    q
}

fn observation_matrix() -> nalgebra::SMatrix<f64, 4, 7> {
    let mut h = nalgebra::SMatrix::<f64, 4, 7>::zeros();
    h[(0, 0)] = 1.0;
    h[(1, 1)] = 1.0;
    h[(2, 2)] = 1.0;
    h[(3, 3)] = 1.0;
    h
}

fn observation_noise() -> ObservationCov {
    let mut r = ObservationCov::identity();
    r[(2, 2)] = 10.0;
    r[(3, 3)] = 10.0;
    r
}

/// `[cx, cy, scale(=area), aspect_ratio]` observation derived from a box,
/// matching the classic SORT state parameterization.
fn bbox_to_observation(b: &BBox) -> Observation {
    let w = b.width();
    let h = b.height();
    Observation::new(b.center_x(), b.center_y(), w * h, w / h)
}

/// Recover a `BBox` from `[cx, cy, scale, aspect_ratio, ...]`.
fn state_to_bbox(x: &State) -> BBox {
    let (cx, cy, scale, ratio) = (x[0], x[1], x[2].max(1.0), x[3].max(1e-3));
    let w = (scale * ratio).sqrt();
    let h = scale / w.max(1e-6);
    BBox {
        x1: cx - w / 2.0,
        y1: cy - h / 2.0,
        x2: cx + w / 2.0,
        y2: cy + h / 2.0,
    }
}

impl BoxKalmanFilter {
    pub fn new(initial: &BBox) -> Self {
        let obs = bbox_to_observation(initial);
        let mut x = State::zeros();
        x[0] = obs[0];
        x[1] = obs[1];
        x[2] = obs[2];
        x[3] = obs[3];
        let mut p = StateCov::identity() * 10.0;
        p[(4, 4)] = 1000.0;
        p[(5, 5)] = 1000.0;
        p[(6, 6)] = 1000.0;
        Self { x, p }
    }

    pub fn predict(&mut self) {
        let f = transition_matrix();
        let q = process_noise();
        self.x = f * self.x;
        self.p = f * self.p * f.transpose() + q;
    }

    pub fn update(&mut self, observed: &BBox) {
        let h = observation_matrix();
        let r = observation_noise();
        let z = bbox_to_observation(observed);

        let y = z - h * self.x;
        let s = h * self.p * h.transpose() + r;
        let s_inv = match s.try_inverse() {
            Some(inv) => inv,
            None => return,
        };
        let k = self.p * h.transpose() * s_inv;
        self.x += k * y;
        self.p = (StateCov::identity() - k * h) * self.p;
    }

    pub fn predicted_bbox(&self) -> BBox {
        state_to_bbox(&self.x)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn tracks_a_constant_velocity_box() {
        let mut kf = BoxKalmanFilter::new(&BBox::new(0.0, 0.0, 10.0, 10.0).unwrap());
        for i in 1..10 {
            kf.predict();
            let shifted = BBox::new(i as f64, 0.0, 10.0 + i as f64, 10.0).unwrap();
            kf.update(&shifted);
        }
        let estimate = kf.predicted_bbox();
        // After repeated observations moving +1 in x each step, the
        // filter's estimate should have tracked along.
        assert!(estimate.center_x() > 5.0);
    }

    #[test]
    fn stationary_box_converges_to_observed_center() {
        let mut kf = BoxKalmanFilter::new(&BBox::new(-5.0, -5.0, 5.0, 5.0).unwrap());
        for _ in 0..20 {
            kf.predict();
            kf.update(&BBox::new(0.0, 0.0, 10.0, 10.0).unwrap());
        }
        let estimate = kf.predicted_bbox();
        assert_relative_eq!(estimate.center_x(), 5.0, epsilon = 0.05);
        assert_relative_eq!(estimate.center_y(), 5.0, epsilon = 0.05);
    }
}
