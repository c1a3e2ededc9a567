// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Piecewise cubic interpolation through a handful of knots.
//!
//! With knots `x_0 < x_1 < ... < x_n` we look for `n` cubics, one per
//! interval.  Each is written in the interval's own coordinate
//! `t = (x - x_k) / (x_{k+1} - x_k)`, which runs from 0 to 1, as
//! `P_k(t) = a t^3 + b t^2 + c t + d`.  The cubics must hit every
//! knot, and whose first and second derivatives agree wherever two of
//! them meet.  That is `4n - 2` conditions for `4n` unknowns; the two
//! left over pin down the slope (or the curvature) at the two ends.
//! The whole thing is assembled into one `4n x 4n` linear system and
//! handed to an SVD least-squares solve, which copes gracefully with a
//! badly conditioned system.

use nalgebra::{DMatrix, DVector};

use errors::SplineError;

/// What the spline does at its outermost knots.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Boundary {
    /// Zero slope at both ends.  The curve arrives at the first and
    /// last knots flat, which is what makes holding the end value
    /// outside the knot range look seamless.
    Clamped,
    /// Zero curvature at both ends; the textbook natural spline.
    Natural,
}

impl Default for Boundary {
    fn default() -> Self {
        Boundary::Clamped
    }
}

/// The coefficients of one interval's cubic, in terms of the position
/// `t` across that interval, from 0 at its left knot to 1 at its right.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Coefficients {
    /// Cubic term.
    pub a: f64,
    /// Quadratic term.
    pub b: f64,
    /// Linear term.
    pub c: f64,
    /// Constant term.
    pub d: f64,
}

impl Coefficients {
    fn eval(&self, t: f64) -> f64 {
        ((self.a * t + self.b) * t + self.c) * t + self.d
    }
}

/// A fitted spline.  Evaluation clamps its argument into the knot range,
/// so anything left of the first knot gets the first knot's value and
/// anything right of the last gets the last's.
#[derive(Clone, Debug)]
pub struct Spline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    coeffs: Vec<Coefficients>,
}

/// Insert a knot, keeping the abscissae sorted.
fn insert_knot(xs: &mut Vec<f64>, ys: &mut Vec<f64>, x: f64, y: f64) -> Result<(), SplineError> {
    let position = xs.iter().position(|&k| k >= x).unwrap_or(xs.len());
    if position < xs.len() && xs[position] == x {
        return Err(SplineError::DuplicateKnot(x));
    }
    xs.insert(position, x);
    ys.insert(position, y);
    Ok(())
}

impl Spline {
    /// Fit a spline through `points`, which may come in any order.
    pub fn fit(points: &[(f64, f64)], boundary: Boundary) -> Result<Spline, SplineError> {
        let mut xs = Vec::with_capacity(points.len());
        let mut ys = Vec::with_capacity(points.len());
        for &(x, y) in points {
            insert_knot(&mut xs, &mut ys, x, y)?;
        }
        if xs.len() < 2 {
            return Err(SplineError::TooFewKnots(xs.len()));
        }
        let coeffs = solve(&xs, &ys, boundary)?;
        Ok(Spline { xs, ys, coeffs })
    }

    /// The knots, sorted by abscissa.
    pub fn knots(&self) -> Vec<(f64, f64)> {
        self.xs.iter().cloned().zip(self.ys.iter().cloned()).collect()
    }

    /// The cubic of each interval, left to right.
    pub fn coefficients(&self) -> &[Coefficients] {
        &self.coeffs
    }

    /// Evaluate the spline at `x`.
    pub fn value(&self, x: f64) -> f64 {
        let first = self.xs[0];
        let last = self.xs[self.xs.len() - 1];
        let x = if x < first {
            first
        } else if x > last {
            last
        } else {
            x
        };
        let k = self.interval(x);
        self.coeffs[k].eval(self.local(k, x))
    }

    // Where x falls across interval k, from 0 to 1.
    fn local(&self, k: usize, x: f64) -> f64 {
        (x - self.xs[k]) / (self.xs[k + 1] - self.xs[k])
    }

    // The interval k with xs[k] <= x <= xs[k + 1].
    fn interval(&self, x: f64) -> usize {
        let (mut low, mut high) = (0, self.xs.len() - 1);
        while high - low > 1 {
            let middle = low + (high - low) / 2;
            if self.xs[middle] > x {
                high = middle;
            } else {
                low = middle;
            }
        }
        low
    }
}

/// Build and solve the system.  Working in each interval's local
/// coordinate keeps every entry of the matrix near 1 no matter how large
/// or how unevenly spaced the knots are.  The derivative-matching rows
/// are scaled by the narrower of the two intervals for the same reason.
fn solve(xs: &[f64], ys: &[f64], boundary: Boundary) -> Result<Vec<Coefficients>, SplineError> {
    let intervals = xs.len() - 1;
    let size = intervals * 4;
    let widths: Vec<f64> = xs.windows(2).map(|pair| pair[1] - pair[0]).collect();

    let mut a = DMatrix::<f64>::zeros(size, size);
    let mut b = DVector::<f64>::zeros(size);

    let boundary_row = |a: &mut DMatrix<f64>, row: usize, col: usize, t: f64| match boundary {
        Boundary::Clamped => {
            a[(row, col)] = 3.0 * t * t;
            a[(row, col + 1)] = 2.0 * t;
            a[(row, col + 2)] = 1.0;
        }
        Boundary::Natural => {
            a[(row, col)] = 6.0 * t;
            a[(row, col + 1)] = 2.0;
        }
    };
    let value_row = |a: &mut DMatrix<f64>, b: &mut DVector<f64>, row: usize, col: usize, t: f64, y: f64| {
        a[(row, col)] = t * t * t;
        a[(row, col + 1)] = t * t;
        a[(row, col + 2)] = t;
        a[(row, col + 3)] = 1.0;
        b[row] = y;
    };

    boundary_row(&mut a, 0, 0, 0.0);
    value_row(&mut a, &mut b, 1, 0, 0.0, ys[0]);

    let mut row = 2;
    for node in 1..intervals {
        let left = (node - 1) * 4;
        let right = left + 4;
        let (wl, wr) = (widths[node - 1], widths[node]);
        let narrow = wl.min(wr);
        let (sl, sr) = (narrow / wl, narrow / wr);

        // The end of the left cubic, t = 1.
        value_row(&mut a, &mut b, row, left, 1.0, ys[node]);
        row += 1;

        a[(row, left)] = 3.0 * sl;
        a[(row, left + 1)] = 2.0 * sl;
        a[(row, left + 2)] = sl;
        a[(row, right + 2)] = -sr;
        row += 1;

        a[(row, left)] = 6.0 * sl * sl;
        a[(row, left + 1)] = 2.0 * sl * sl;
        a[(row, right + 1)] = -2.0 * sr * sr;
        row += 1;

        // The start of the right cubic, t = 0.
        value_row(&mut a, &mut b, row, right, 0.0, ys[node]);
        row += 1;
    }

    let last = (intervals - 1) * 4;
    value_row(&mut a, &mut b, row, last, 1.0, ys[intervals]);
    boundary_row(&mut a, row + 1, last, 1.0);

    let svd = a.svd(true, true);
    let threshold = svd.singular_values.max() * ::std::f64::EPSILON * (size as f64);
    let solution = svd.solve(&b, threshold).map_err(SplineError::Solve)?;

    Ok((0..intervals)
        .map(|k| Coefficients {
            a: solution[4 * k],
            b: solution[4 * k + 1],
            c: solution[4 * k + 2],
            d: solution[4 * k + 3],
        })
        .collect())
}
