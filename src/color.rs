// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Maps iteration counts to colors.  The user names a few key
//! iteration counts and the color each should get; everything in
//! between is interpolated smoothly, one spline per channel.

use num::clamp;

use errors::ConfigError;
use spline::{Boundary, Spline};

/// An 8-bit-per-channel color.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
}

impl Rgb {
    /// The color of points that never escape.
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// Constructor.
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }
}

/// Three splines, one per channel, keyed by iteration count.
#[derive(Clone, Debug)]
pub struct ColorScale {
    red: Spline,
    green: Spline,
    blue: Spline,
}

fn channel(spline: &Spline, iterations: u32) -> u8 {
    clamp(spline.value(f64::from(iterations)), 0.0, 255.0) as u8
}

impl ColorScale {
    /// Build a scale from at least two `(iterations, color)` pairs with
    /// distinct iteration counts, in any order.
    pub fn new(keypoints: &[(u32, Rgb)]) -> Result<Self, ConfigError> {
        ColorScale::with_boundary(keypoints, Boundary::default())
    }

    /// As `new`, choosing how the curves behave at the first and last
    /// key-points.
    pub fn with_boundary(keypoints: &[(u32, Rgb)], boundary: Boundary) -> Result<Self, ConfigError> {
        if keypoints.len() < 2 {
            return Err(ConfigError::TooFewColors(keypoints.len()));
        }
        let mut seen: Vec<u32> = keypoints.iter().map(|&(i, _)| i).collect();
        seen.sort();
        if let Some(pair) = seen.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::DuplicateColor(pair[0]));
        }

        let fit = |pick: &dyn Fn(&Rgb) -> u8| -> Result<Spline, ConfigError> {
            let points: Vec<(f64, f64)> = keypoints
                .iter()
                .map(|&(i, ref color)| (f64::from(i), f64::from(pick(color))))
                .collect();
            Ok(Spline::fit(&points, boundary)?)
        };

        Ok(ColorScale {
            red: fit(&|c: &Rgb| c.r)?,
            green: fit(&|c: &Rgb| c.g)?,
            blue: fit(&|c: &Rgb| c.b)?,
        })
    }

    /// The red channel at `iterations`.
    pub fn r(&self, iterations: u32) -> u8 {
        channel(&self.red, iterations)
    }

    /// The green channel at `iterations`.
    pub fn g(&self, iterations: u32) -> u8 {
        channel(&self.green, iterations)
    }

    /// The blue channel at `iterations`.
    pub fn b(&self, iterations: u32) -> u8 {
        channel(&self.blue, iterations)
    }

    /// The interpolated color at `iterations`.
    pub fn color(&self, iterations: u32) -> Rgb {
        Rgb::new(self.r(iterations), self.g(iterations), self.b(iterations))
    }

    /// Like `color`, but 0, the count of points that never escaped, is
    /// always black.
    pub fn color_or_black(&self, iterations: u32) -> Rgb {
        if iterations == 0 {
            Rgb::BLACK
        } else {
            self.color(iterations)
        }
    }
}
