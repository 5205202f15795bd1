//! Classical fourth-order Runge–Kutta solver with a fixed step.

use ndarray::prelude::*;
use ndarray::azip;
use thiserror::Error;

use crate::{Integrable, Progress, Step};

/// Fixed-step RK4 solver driving an [`Integrable`] subject.
///
/// The solver owns only its configuration: the initial value of the
/// independent variable and the (signed) step size. The state lives in the
/// subject.
#[derive(Debug)]
pub struct Rk4<S>
where
    S: Integrable,
{
    /// Initial value of the independent variable.
    x0: f64,
    /// Signed step size; negative when integrating backward.
    step_size: f64,
    subject: S,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CreateRk4Error {
    #[error("step size {0} is zero or negative")]
    StepSizeNotPositive(f64),
    #[error("step size {0} is not finite")]
    StepSizeNotFinite(f64),
    #[error("initial value {0} is not finite")]
    InitialValueNotFinite(f64),
    #[error("no step size was given")]
    MissingStepSize,
    #[error("no subject to integrate was given")]
    MissingSubject,
}

/// Error aborting [`Rk4::solve`].
#[derive(Debug, Error)]
pub enum SolveError<E>
where
    E: std::error::Error + 'static,
{
    /// The subject itself failed; the error is passed through untouched.
    #[error(transparent)]
    Subject(E),
    /// A stage evaluation returned a vector of the wrong length.
    #[error("stage {stage} derivative has {found} elements, expected {expected}")]
    DerivativeLength {
        /// Stage number, 1 to 4.
        stage: usize,
        expected: usize,
        found: usize,
    },
    /// The subject's state changed length during the run.
    #[error("state has {found} elements, expected {expected}")]
    StateLength { expected: usize, found: usize },
}

impl<E> SolveError<E>
where
    E: std::error::Error + 'static,
{
    /// Returns the subject's error, if that is what aborted the run.
    pub fn into_subject(self) -> Option<E> {
        match self {
            SolveError::Subject(e) => Some(e),
            _ => None,
        }
    }
}

/// Outcome of a completed [`Rk4::solve`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Solution {
    /// Number of steps performed.
    pub steps: u64,
    /// Final value of the independent variable.
    pub x: f64,
}

fn check_step_size(step_size: f64) -> Result<(), CreateRk4Error> {
    if !step_size.is_finite() {
        return Err(CreateRk4Error::StepSizeNotFinite(step_size));
    }
    if step_size <= 0. {
        return Err(CreateRk4Error::StepSizeNotPositive(step_size));
    }
    Ok(())
}

impl<S> Rk4<S>
where
    S: Integrable,
{
    /// Creates a solver integrating forward from `x0`.
    ///
    /// # Parameters
    ///
    /// * `x0`: Initial value of the independent variable.
    ///
    /// * `step_size`: Step size; must be finite and strictly positive.
    ///
    /// * `subject`: What is integrated. Pass `&mut subject` to keep ownership
    ///   of it.
    pub fn new(x0: f64, step_size: f64, subject: S) -> Result<Rk4<S>, CreateRk4Error> {
        if !x0.is_finite() {
            return Err(CreateRk4Error::InitialValueNotFinite(x0));
        }
        check_step_size(step_size)?;
        Ok(Rk4 {
            x0,
            step_size,
            subject,
        })
    }

    /// Creates a solver integrating backward from `x0`.
    ///
    /// `step_size` is the magnitude of the step and follows the same rules as
    /// in [`Rk4::new`]; the independent variable decreases by it every step.
    pub fn reverse(x0: f64, step_size: f64, subject: S) -> Result<Rk4<S>, CreateRk4Error> {
        let mut rk = Rk4::new(x0, step_size, subject)?;
        rk.step_size = -step_size;
        Ok(rk)
    }

    pub fn builder() -> Rk4Builder<S> {
        Rk4Builder::default()
    }

    /// Initial value of the independent variable.
    pub fn x0(&self) -> f64 {
        self.x0
    }

    /// Signed step size.
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Integration direction: +1 or -1.
    pub fn direction(&self) -> f64 {
        self.step_size.signum()
    }

    pub fn subject(&self) -> &S {
        &self.subject
    }

    pub fn subject_mut(&mut self) -> &mut S {
        &mut self.subject
    }

    pub fn into_subject(self) -> S {
        self.subject
    }

    /// Integrates until the subject asks to stop.
    ///
    /// Every call starts over at `x0` with a step count of zero, from
    /// whatever state the subject holds at that point. The subject's stop
    /// predicate is consulted before each step; a step is either performed
    /// completely (four stage evaluations and a commit through
    /// `set_state`) or not at all.
    ///
    /// Returns the number of steps taken and the final value of the
    /// independent variable. The first error raised by the subject ends the
    /// run; the subject keeps whatever state it had at that point.
    pub fn solve(&mut self) -> Result<Solution, SolveError<S::Error>> {
        let len = self.subject.state().len();
        let mut x = self.x0;
        let mut steps = 0;
        while !self.subject.should_stop(Progress { steps, x }) {
            x = self.step(x, steps, len)?;
            steps += 1;
        }
        Ok(Solution { steps, x })
    }

    /// Evaluates the derivative for one stage and checks its length.
    fn stage(
        &self,
        stage: usize,
        x: f64,
        y: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, SolveError<S::Error>> {
        let f = self
            .subject
            .derivative(x, y)
            .map_err(SolveError::Subject)?;
        if f.len() != y.len() {
            return Err(SolveError::DerivativeLength {
                stage,
                expected: y.len(),
                found: f.len(),
            });
        }
        Ok(f)
    }

    /// Performs step number `index` starting at `x`, commits the new state
    /// to the subject and returns the advanced independent variable.
    fn step(&mut self, x: f64, index: u64, len: usize) -> Result<f64, SolveError<S::Error>> {
        let h = self.step_size;
        let y_new = {
            let y = self.subject.state();
            if y.len() != len {
                return Err(SolveError::StateLength {
                    expected: len,
                    found: y.len(),
                });
            }
            let mut z = Array1::<f64>::zeros(len);

            let f1 = self.stage(1, x, y)?;
            azip!((z in &mut z, &y in &y, &f in &f1) *z = y + h * f / 2.);
            let f2 = self.stage(2, x + h / 2., z.view())?;
            azip!((z in &mut z, &y in &y, &f in &f2) *z = y + h * f / 2.);
            let f3 = self.stage(3, x + h / 2., z.view())?;
            azip!((z in &mut z, &y in &y, &f in &f3) *z = y + h * f);
            let f4 = self.stage(4, x + h, z.view())?;

            // Always a fresh array: the subject takes ownership of it.
            let mut y_new = Array1::<f64>::zeros(len);
            azip!((
                y_new in &mut y_new,
                &y in &y,
                &f1 in &f1,
                &f2 in &f2,
                &f3 in &f3,
                &f4 in &f4,
            ) {
                *y_new = y + h * (f1 + 2. * f2 + 2. * f3 + f4) / 6.;
            });
            y_new
        };

        let x = x + h;
        self.subject
            .set_state(Step { index, x }, y_new)
            .map_err(SolveError::Subject)?;
        Ok(x)
    }
}

/// Step-by-step construction of an [`Rk4`], reporting a missing subject or
/// step size as an error instead of requiring them up front.
#[derive(Debug)]
pub struct Rk4Builder<S> {
    x0: f64,
    step_size: Option<f64>,
    reverse: bool,
    subject: Option<S>,
}

impl<S> Default for Rk4Builder<S> {
    fn default() -> Self {
        Rk4Builder {
            x0: 0.,
            step_size: None,
            reverse: false,
            subject: None,
        }
    }
}

impl<S> Rk4Builder<S>
where
    S: Integrable,
{
    /// Initial value of the independent variable; defaults to zero.
    pub fn x0(mut self, x0: f64) -> Self {
        self.x0 = x0;
        self
    }

    /// Magnitude of the step.
    pub fn step_size(mut self, step_size: f64) -> Self {
        self.step_size = Some(step_size);
        self
    }

    /// Integrate toward decreasing values of the independent variable.
    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn subject(mut self, subject: S) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn build(self) -> Result<Rk4<S>, CreateRk4Error> {
        let step_size = self.step_size.ok_or(CreateRk4Error::MissingStepSize)?;
        let subject = self.subject.ok_or(CreateRk4Error::MissingSubject)?;
        if self.reverse {
            Rk4::reverse(self.x0, step_size, subject)
        } else {
            Rk4::new(self.x0, step_size, subject)
        }
    }
}
