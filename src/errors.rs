// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The error types of the renderer.  Nothing here is recoverable:
//! every error propagates to the top of the computation, and a bad
//! formula or configuration stops us before any thread is spawned.

use std::fmt;
use std::io;

/// The specific reason a formula failed to compile.
#[derive(Clone, Debug, PartialEq)]
pub enum ParseErrorKind {
    /// A character that cannot start or continue the expression here.
    UnexpectedCharacter(char),
    /// The formula ended where an operand was still expected.
    UnexpectedEnd,
    /// An identifier that names no known function or variable.
    UnknownFunction(String),
    /// A required `(` or `)` was not found.
    MissingDelimiter(char),
    /// A numeric literal such as `1.2.3` or `4e`.
    MalformedNumber(String),
    /// The formula nests deeper than the given limit.
    TooDeep(usize),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseErrorKind::UnexpectedCharacter(c) => write!(f, "unexpected character '{}'", c),
            ParseErrorKind::UnexpectedEnd => write!(f, "unexpected end of formula"),
            ParseErrorKind::UnknownFunction(ref name) => write!(f, "unknown function '{}'", name),
            ParseErrorKind::MissingDelimiter(c) => write!(f, "expected '{}'", c),
            ParseErrorKind::MalformedNumber(ref text) => {
                write!(f, "malformed numeric literal '{}'", text)
            }
            ParseErrorKind::TooDeep(limit) => {
                write!(f, "formula nests more than {} levels deep", limit)
            }
        }
    }
}

/// A formula could not be compiled.  The position is the 0-based
/// character offset into the formula where the problem was found.
#[derive(Clone, Debug, Fail, PartialEq)]
#[fail(display = "at position {}: {}", position, kind)]
pub struct ParseError {
    /// Character offset of the failure.
    pub position: usize,
    /// What was wrong.
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(position: usize, kind: ParseErrorKind) -> Self {
        ParseError { position, kind }
    }
}

/// Failures building or evaluating a spline.
#[derive(Clone, Debug, Fail, PartialEq)]
pub enum SplineError {
    /// A spline needs at least two knots to have one interval.
    #[fail(display = "a spline needs at least two knots, got {}", _0)]
    TooFewKnots(usize),
    /// Two knots share the same abscissa.
    #[fail(display = "knot at x = {} was given twice", _0)]
    DuplicateKnot(f64),
    /// The least-squares solver gave up.
    #[fail(display = "could not solve for spline coefficients: {}", _0)]
    Solve(&'static str),
}

/// Anything wrong with the options a render was asked to use.
#[derive(Debug, Fail)]
pub enum ConfigError {
    /// The configuration text itself is malformed.
    #[fail(display = "line {}, column {}: {}", line, column, message)]
    Syntax {
        /// 1-based line of the offending token.
        line: usize,
        /// 1-based column of the offending token.
        column: usize,
        /// Description of the problem.
        message: String,
    },
    /// A keyword that is not one of the known options.
    #[fail(display = "unrecognized option keyword '{}'", _0)]
    UnknownOption(String),
    /// An option given more than once.
    #[fail(display = "multiple definition of '{}'", _0)]
    Duplicate(String),
    /// Required options that never showed up.
    #[fail(display = "options not specified: {}", _0)]
    Missing(String),
    /// The function definition did not compile.
    #[fail(display = "bad formula: {}", _0)]
    Formula(#[fail(cause)] ParseError),
    /// A color scale needs at least two key-points.
    #[fail(display = "at least two color key-points are required, got {}", _0)]
    TooFewColors(usize),
    /// Two color key-points with the same iteration count.
    #[fail(display = "color key-point for iteration {} is defined more than once", _0)]
    DuplicateColor(u32),
    /// A color scale whose splines could not be built.
    #[fail(display = "color scale: {}", _0)]
    ColorScale(#[fail(cause)] SplineError),
    /// Zero worker threads.
    #[fail(display = "thread count must be at least 1")]
    NoThreads,
    /// A region that cannot be sampled.
    #[fail(display = "invalid region: {}", _0)]
    Region(String),
    /// Zero iterations makes the interior sentinel meaningless.
    #[fail(display = "max_iterations must be at least 1")]
    NoIterations,
    /// The escape radius is not a positive, finite number.
    #[fail(display = "escape radius must be a positive number, got {}", _0)]
    EscapeRadius(f64),
}

impl From<ParseError> for ConfigError {
    fn from(err: ParseError) -> Self {
        ConfigError::Formula(err)
    }
}

impl From<SplineError> for ConfigError {
    fn from(err: SplineError) -> Self {
        ConfigError::ColorScale(err)
    }
}

/// Top-level error for anything that touches threads or files.
#[derive(Debug, Fail)]
pub enum Error {
    /// Bad options.
    #[fail(display = "{}", _0)]
    Config(#[fail(cause)] ConfigError),
    /// A worker died mid-render; there is no partial result.
    #[fail(display = "a render worker panicked")]
    WorkerPanicked,
    /// Reading the configuration or writing the image failed.
    #[fail(display = "{}", _0)]
    Io(#[fail(cause)] io::Error),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
