#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Escape-time fractal renderer
//!
//! An escape-time fractal takes a point on the complex plane, feeds
//! it through some function again and again, and counts how many
//! steps it takes for the result to run off toward infinity.  That
//! count, the "velocity" of the point, is what gets colored.  The
//! Mandelbrot set is the famous one, iterating `z^2 + c` with `z`
//! starting at zero and `c` the point; bind the point to `z` instead
//! and hold `c` fixed and you get a Julia set.
//!
//! Here the function is whatever the user writes.  A small parser
//! compiles formulas like `sin(z) * c + 0.3` into an expression tree,
//! the plane is split into bands of rows and handed out to a pool of
//! threads, and the resulting counts are colored with a smooth cubic
//! spline through a handful of user-chosen key colors before being
//! written out as a BMP.
//!
//! ```
//! # extern crate fractalmake;
//! # extern crate num;
//! use fractalmake::{compile, make_fractal, EscapeTime, Mode, Region};
//! use num::Complex;
//!
//! # fn main() {
//! let region = Region::new(Complex::new(-2.0, -1.5), Complex::new(1.0, 1.5), 4, 4).unwrap();
//! let mandelbrot = EscapeTime::new(
//!     compile("z^2 + c").unwrap(),
//!     2.0,
//!     50,
//!     Complex::new(0.0, 0.0),
//!     Mode::C,
//! )
//! .unwrap();
//! let fractal = make_fractal(&region, |p| mandelbrot.iterations(p), 2).unwrap();
//! assert_eq!(fractal.row(1), &[1, 5, 0, 2]);
//! # }
//! ```

extern crate crossbeam;
#[macro_use]
extern crate failure;
extern crate image;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate nalgebra;
extern crate num;

#[cfg(test)]
extern crate rand;
#[cfg(test)]
extern crate tempfile;

pub mod color;
pub mod errors;
pub mod escape;
pub mod options;
pub mod output;
pub mod parser;
pub mod planes;
pub mod render;
pub mod spline;

pub use color::{ColorScale, Rgb};
pub use errors::{ConfigError, Error, ParseError, ParseErrorKind, SplineError};
pub use escape::{EscapeTime, Mode};
pub use options::{parse_options, read_options, FractalOptions};
pub use output::{save_fractal, write_fractal};
pub use parser::{compile, Formula};
pub use planes::Region;
pub use render::{make_fractal, Decomposition, Fractal};
pub use spline::{Boundary, Spline};
