// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the Region struct, which describes a relationship between
//! a grid of sample points with an origin at 0,0 and a rectangle on
//! the complex plane with an arbitrary pair of corners defining the
//! lower-left and upper-right corners.
//!
//! Unlike a pixel mapper, both corners are *sampled*: column 0 sits
//! exactly on the left edge and the last column exactly on the right
//! edge, so the step between columns is the width divided by
//! `columns - 1`.  The same goes for rows, which grow upward along the
//! imaginary axis.
use num::Complex;

use errors::ConfigError;

/// A rectangle on the complex plane, and how many points to sample
/// across (real axis) and up (imaginary axis).  Once built, a region
/// is never modified.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Region {
    lower_left: Complex<f64>,
    upper_right: Complex<f64>,
    columns: usize,
    rows: usize,
}

impl Region {
    /// Constructor.  Requires at least two points in each direction,
    /// and an upper-right corner that is strictly up and to the right
    /// of the lower-left corner.
    pub fn new(
        lower_left: Complex<f64>,
        upper_right: Complex<f64>,
        columns: usize,
        rows: usize,
    ) -> Result<Region, ConfigError> {
        if columns < 2 || rows < 2 {
            return Err(ConfigError::Region(format!(
                "need at least 2x2 points, got {}x{}",
                columns, rows
            )));
        }

        if !(upper_right.re > lower_left.re) {
            return Err(ConfigError::Region(
                "the lower left corner is not to the left of the upper right corner".to_string(),
            ));
        }

        if !(upper_right.im > lower_left.im) {
            return Err(ConfigError::Region(
                "the lower left corner is not below the upper right corner".to_string(),
            ));
        }

        Ok(Region {
            lower_left,
            upper_right,
            columns,
            rows,
        })
    }

    /// The lower-left corner; the point at row 0, column 0.
    pub fn lower_left(&self) -> Complex<f64> {
        self.lower_left
    }

    /// The upper-right corner; the point at the last row and column.
    pub fn upper_right(&self) -> Complex<f64> {
        self.upper_right
    }

    /// Points across, along the real axis.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Points up, along the imaginary axis.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The total number of points in the grid.  Used to calculate
    /// memory needs.
    pub fn len(&self) -> usize {
        self.columns * self.rows
    }

    /// A validated region always has at least four points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The distance along the real axis between two columns.
    pub fn dx(&self) -> f64 {
        (self.upper_right.re - self.lower_left.re) / ((self.columns - 1) as f64)
    }

    /// The distance along the imaginary axis between two rows.
    pub fn dy(&self) -> f64 {
        (self.upper_right.im - self.lower_left.im) / ((self.rows - 1) as f64)
    }

    /// Given the row and column of a sample, return the complex number
    /// it stands for.
    pub fn point(&self, row: usize, column: usize) -> Complex<f64> {
        Complex::new(
            self.lower_left.re + (column as f64) * self.dx(),
            self.lower_left.im + (row as f64) * self.dy(),
        )
    }

    /// The row-major offset of a sample in a grid covering this region.
    pub fn offset(&self, row: usize, column: usize) -> usize {
        row * self.columns + column
    }
}
