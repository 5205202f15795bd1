//! Fixed-step classical Runge–Kutta integration of first-order ODE systems.
//!
//! The thing being integrated (the *subject*) owns its state and knows its
//! own right-hand side and stopping condition; it implements [`Integrable`].
//! The stepping algorithm lives in [`rk4::Rk4`], which only reads the
//! subject's state and hands back a new one after every step.

pub mod rk4;

pub use crate::rk4::{CreateRk4Error, Rk4, Rk4Builder, Solution, SolveError};

use ndarray::prelude::*;

/// Marker handed to [`Integrable::set_state`] after a completed step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    /// Zero-based index of the step that was just completed.
    pub index: u64,
    /// Value of the independent variable after the step.
    pub x: f64,
}

/// Marker handed to [`Integrable::should_stop`] before each step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progress {
    /// Number of steps completed so far in this run.
    pub steps: u64,
    /// Current value of the independent variable.
    pub x: f64,
}

/// Something that can be advanced by an integrator.
///
/// Implementors hold their own state; the integrator keeps no copy of it
/// between steps.
pub trait Integrable {
    /// Error raised by the subject, e.g. on an internal consistency check.
    type Error: std::error::Error + 'static;

    /// Current state.
    ///
    /// Must have no side effects and reflect the most recent `set_state`.
    fn state(&self) -> ArrayView1<'_, f64>;

    /// Replaces the state after a completed step.
    ///
    /// Returning an error aborts the integration.
    fn set_state(&mut self, step: Step, state: Array1<f64>) -> Result<(), Self::Error>;

    /// Returns `true` if the integration should end before taking another
    /// step.
    fn should_stop(&self, progress: Progress) -> bool;

    /// Right-hand side of the system at `x` and `state`.
    ///
    /// The result must have the same length as `state`.
    fn derivative(&self, x: f64, state: ArrayView1<'_, f64>) -> Result<Array1<f64>, Self::Error>;
}

impl<'a, T> Integrable for &'a mut T
where
    T: Integrable + ?Sized,
{
    type Error = T::Error;

    fn state(&self) -> ArrayView1<'_, f64> {
        (**self).state()
    }

    fn set_state(&mut self, step: Step, state: Array1<f64>) -> Result<(), Self::Error> {
        (**self).set_state(step, state)
    }

    fn should_stop(&self, progress: Progress) -> bool {
        (**self).should_stop(progress)
    }

    fn derivative(&self, x: f64, state: ArrayView1<'_, f64>) -> Result<Array1<f64>, Self::Error> {
        (**self).derivative(x, state)
    }
}
