use approx::assert_abs_diff_eq;
use ndarray::prelude::*;
use ndarray::{arr1, array, s};
use std::convert::Infallible;

use ndarray_rk4::{Integrable, Progress, Rk4, Step};

fn cross(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Array1<f64> {
    array![
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0]
    ]
}

/// Torque-free rigid body.
///
/// The state holds the modified Rodrigues parameters of the attitude followed
/// by the body-frame angular velocity.
struct Attitude {
    y: Array1<f64>,
    /// Principal moments of inertia.
    inertia: Array1<f64>,
}

impl Attitude {
    fn new(sigma: [f64; 3], omega: [f64; 3], inertia: [f64; 3]) -> Attitude {
        let mut y = Array1::<f64>::zeros(6);
        y.slice_mut(s![..3]).assign(&arr1(&sigma));
        y.slice_mut(s![3..]).assign(&arr1(&omega));
        Attitude {
            y,
            inertia: arr1(&inertia),
        }
    }

    /// Magnitude of the angular momentum.
    fn momentum(&self) -> f64 {
        let h = &self.inertia * &self.y.slice(s![3..]);
        h.dot(&h).sqrt()
    }
}

impl Integrable for Attitude {
    type Error = Infallible;

    fn state(&self) -> ArrayView1<'_, f64> {
        self.y.view()
    }

    fn set_state(&mut self, _: Step, mut state: Array1<f64>) -> Result<(), Infallible> {
        // Switch to the shadow set to stay away from the singularity.
        let sigma_sq = state.slice(s![..3]).dot(&state.slice(s![..3]));
        if sigma_sq > 1. {
            state.slice_mut(s![..3]).mapv_inplace(|v| -v / sigma_sq);
        }
        self.y = state;
        Ok(())
    }

    fn should_stop(&self, progress: Progress) -> bool {
        progress.steps >= 100_000
    }

    fn derivative(&self, _: f64, y: ArrayView1<'_, f64>) -> Result<Array1<f64>, Infallible> {
        let sigma = y.slice(s![..3]);
        let omega = y.slice(s![3..]);

        let sigma_sq = sigma.dot(&sigma);
        let sigma_dot = ((1. - sigma_sq) * &omega
            + 2. * cross(sigma, omega)
            + 2. * sigma.dot(&omega) * &sigma)
            / 4.;

        let h = &self.inertia * &omega;
        let omega_dot = -cross(omega, h.view()) / &self.inertia;

        let mut dy = Array1::<f64>::zeros(6);
        dy.slice_mut(s![..3]).assign(&sigma_dot);
        dy.slice_mut(s![3..]).assign(&omega_dot);
        Ok(dy)
    }
}

#[test]
fn angular_momentum_is_conserved() {
    let mut body = Attitude::new([0.3, -0.4, 0.5], [0.1, 0.4, -0.2], [10., 5., 2.]);
    let initial = body.momentum();
    for &step in &[1e-4, 1e-6, 1e-8, 1e-10, 1e-12] {
        let sol = Rk4::new(0., step, &mut body).unwrap().solve().unwrap();
        assert_eq!(sol.steps, 100_000);
        assert_abs_diff_eq!(body.momentum(), initial, epsilon = 1e-8);
    }
}

#[test]
fn shadow_set_keeps_rodrigues_parameters_bounded() {
    let mut body = Attitude::new([0.9, 0., 0.], [3., 0., 0.], [1., 1., 1.]);
    Rk4::new(0., 1e-3, &mut body).unwrap().solve().unwrap();
    let sigma = body.y.slice(s![..3]);
    assert!(sigma.dot(&sigma) <= 1.);
    assert_abs_diff_eq!(body.y[3], 3., epsilon = 1e-12);
}
