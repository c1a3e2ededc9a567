// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time iterator.  Given a formula `f(z, c)`, we take a
//! point and repeatedly feed `z` back through `f`, counting how many
//! steps it takes for `z` to leave a circle of some radius around the
//! origin.  That count, the "velocity" of the point, is what we color.

use std::str::FromStr;

use num::Complex;

use errors::ConfigError;
use parser::Formula;

/// Which of the two inputs of the formula the sampled point is bound
/// to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// The point is `c` and `z` starts at the constant; the Mandelbrot
    /// family.
    C,
    /// The point is the starting `z` and `c` is the constant; the
    /// Julia family.
    Z,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c" => Ok(Mode::C),
            "z" => Ok(Mode::Z),
            _ => Err(format!("bad point specification '{}', expected 'z' or 'c'", s)),
        }
    }
}

/// Everything needed to turn a point into an iteration count.  Once
/// set, this object is never mutated, so a single instance serves all
/// the render threads.
#[derive(Clone, Debug)]
pub struct EscapeTime {
    formula: Formula,
    escape_radius: f64,
    max_iterations: u32,
    constant: Complex<f64>,
    mode: Mode,
}

impl EscapeTime {
    /// Requires a positive escape radius and at least one iteration;
    /// with zero iterations every point would look like an interior
    /// point.
    pub fn new(
        formula: Formula,
        escape_radius: f64,
        max_iterations: u32,
        constant: Complex<f64>,
        mode: Mode,
    ) -> Result<Self, ConfigError> {
        if !(escape_radius > 0.0) || !escape_radius.is_finite() {
            return Err(ConfigError::EscapeRadius(escape_radius));
        }
        if max_iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        Ok(EscapeTime {
            formula,
            escape_radius,
            max_iterations,
            constant,
            mode,
        })
    }

    /// The formula being iterated.
    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// The iteration cap.
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// The escape radius.
    pub fn escape_radius(&self) -> f64 {
        self.escape_radius
    }

    /// The fixed input: the starting `z` in c-mode, `c` in z-mode.
    pub fn constant(&self) -> Complex<f64> {
        self.constant
    }

    /// Which input the point is bound to.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Iterate the formula from `point` and return the number of steps
    /// it took to escape.  Points that never escape within the cap get
    /// 0, so the result is always in `{0} ∪ [1, max_iterations - 1]`.
    /// A NaN magnitude counts as escaped.
    pub fn iterations(&self, point: Complex<f64>) -> u32 {
        let (mut z, c) = match self.mode {
            Mode::C => (self.constant, point),
            Mode::Z => (point, self.constant),
        };
        let mut iters = 0;
        while z.norm() < self.escape_radius && iters < self.max_iterations {
            z = self.formula.eval(z, c);
            iters += 1;
        }
        if iters == self.max_iterations {
            0
        } else {
            iters
        }
    }
}
