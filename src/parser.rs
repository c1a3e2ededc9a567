// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A recursive-descent compiler for iteration formulas.
//!
//! A formula is an arithmetic expression over two complex variables,
//! `z` (the value being iterated) and `c` (the parameter), plus the
//! imaginary unit `I`, numeric literals, and a handful of complex
//! functions.  The grammar, from lowest to highest precedence, is:
//!
//! ```text
//! expr   := term (('+'|'-') term)*
//! term   := power (('*'|'/') power)*
//! power  := factor ('^' factor)*
//! factor := ('+'|'-') factor | 'I' | 'z' | 'c' | '(' expr ')'
//!         | number | name '(' expr ')'
//! ```
//!
//! Compiling produces a [`Formula`], an immutable expression tree.  It
//! has no interior state at all, so every render thread can evaluate
//! the same formula at the same time without any locking.

use std::fmt;
use std::str::FromStr;

use num::Complex;

use errors::{ParseError, ParseErrorKind};

/// Exponents that are whole numbers no larger than this are computed by
/// repeated multiplication instead of going through `exp(b * ln(a))`.
const MAX_EXACT_POWER: f64 = 64.0;

/// How deeply a formula may nest, counting parentheses, prefix signs,
/// function calls and chained operators.  Both the parser and the
/// evaluator recurse once per level.
pub const MAX_NESTING: usize = 256;

/// The leaves of an expression that are not literals.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Var {
    /// The iterated value.
    Z,
    /// The parameter.
    C,
    /// The imaginary unit, `I`.
    ImagUnit,
}

/// Prefix operators.  A prefix `+` does nothing and is dropped while
/// parsing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// Negation.
    Neg,
}

/// Infix operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `^`
    Pow,
}

impl BinaryOp {
    fn apply(self, lhs: Complex<f64>, rhs: Complex<f64>) -> Complex<f64> {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
            BinaryOp::Pow => pow(lhs, rhs),
        }
    }
}

/// The functions a formula may call.  Each takes exactly one complex
/// argument.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Function {
    /// Modulus, as a real number.
    Abs,
    /// Complex exponential.
    Exp,
    /// Complex sine.
    Sin,
    /// Complex cosine.
    Cos,
    /// Complex tangent.
    Tan,
    /// Complex arcsine.
    Asin,
    /// Complex arccosine.
    Acos,
    /// Complex arctangent.
    Atan,
    /// Principal square root.
    Sqrt,
    /// The real part, as a real number.
    Real,
    /// The imaginary part, kept on the imaginary axis.
    Imag,
}

const FUNCTIONS: &[(&str, Function)] = &[
    ("abs", Function::Abs),
    ("exp", Function::Exp),
    ("sin", Function::Sin),
    ("cos", Function::Cos),
    ("tan", Function::Tan),
    ("asin", Function::Asin),
    ("acos", Function::Acos),
    ("atan", Function::Atan),
    ("sqrt", Function::Sqrt),
    ("real", Function::Real),
    ("imag", Function::Imag),
];

impl Function {
    /// Find a function by its exact name.
    pub fn lookup(name: &str) -> Option<Function> {
        FUNCTIONS
            .iter()
            .find(|&&(n, _)| n == name)
            .map(|&(_, function)| function)
    }

    /// Apply the function to a value.
    pub fn apply(self, x: Complex<f64>) -> Complex<f64> {
        match self {
            Function::Abs => Complex::new(x.norm(), 0.0),
            Function::Exp => x.exp(),
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Asin => x.asin(),
            Function::Acos => x.acos(),
            Function::Atan => x.atan(),
            Function::Sqrt => x.sqrt(),
            Function::Real => Complex::new(x.re, 0.0),
            Function::Imag => Complex::new(0.0, x.im),
        }
    }
}

/// A parsed formula.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A real number.
    Literal(f64),
    /// `z`, `c` or `I`.
    Var(Var),
    /// A prefix operator and its operand.
    Unary(UnaryOp, Box<Expr>),
    /// An infix operator and its two operands.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// A function and its argument.
    Call(Function, Box<Expr>),
}

impl Expr {
    /// Evaluate the expression for one pair of inputs.
    pub fn eval(&self, z: Complex<f64>, c: Complex<f64>) -> Complex<f64> {
        match *self {
            Expr::Literal(x) => Complex::new(x, 0.0),
            Expr::Var(Var::Z) => z,
            Expr::Var(Var::C) => c,
            Expr::Var(Var::ImagUnit) => Complex::new(0.0, 1.0),
            Expr::Unary(UnaryOp::Neg, ref operand) => -operand.eval(z, c),
            Expr::Binary(op, ref lhs, ref rhs) => op.apply(lhs.eval(z, c), rhs.eval(z, c)),
            Expr::Call(function, ref arg) => function.apply(arg.eval(z, c)),
        }
    }
}

/// `a ^ b`, defined as `exp(b * ln(a))`.  Zero to a power with a
/// positive real part is zero; any other power of zero is left to blow
/// up.  Small whole-number exponents are multiplied out so that `z^2`
/// is exactly `z * z`.
fn pow(base: Complex<f64>, exponent: Complex<f64>) -> Complex<f64> {
    if base.re == 0.0 && base.im == 0.0 && exponent.re > 0.0 {
        return Complex::new(0.0, 0.0);
    }
    if exponent.im == 0.0 && exponent.re.fract() == 0.0 && exponent.re.abs() <= MAX_EXACT_POWER
    {
        return powi(base, exponent.re as i32);
    }
    base.powc(exponent)
}

fn powi(base: Complex<f64>, exponent: i32) -> Complex<f64> {
    let mut result = Complex::new(1.0, 0.0);
    let mut square = base;
    let mut remaining = exponent.abs();
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = result * square;
        }
        remaining >>= 1;
        if remaining > 0 {
            square = square * square;
        }
    }
    if exponent < 0 {
        Complex::new(1.0, 0.0) / result
    } else {
        result
    }
}

/// A compiled formula `f(z, c)`, along with the text it came from.
/// Build it once, then evaluate it as often as you like from as many
/// threads as you like.
#[derive(Clone, Debug, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    /// Evaluate `f(z, c)`.
    #[inline]
    pub fn eval(&self, z: Complex<f64>, c: Complex<f64>) -> Complex<f64> {
        self.expr.eval(z, c)
    }

    /// The parsed expression tree.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// The formula as it was written.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Formula {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        compile(s)
    }
}

/// Compile a formula.  The whole string must be a single expression;
/// the first problem found aborts the compile.
pub fn compile(formula: &str) -> Result<Formula, ParseError> {
    let expr = Parser::new(formula).parse()?;
    Ok(Formula {
        source: formula.to_string(),
        expr,
    })
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(formula: &str) -> Self {
        Parser {
            chars: formula.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(ParseErrorKind::TooDeep(MAX_NESTING)));
        }
        self.depth += 1;
        Ok(())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).cloned()
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(self.pos, kind)
    }

    fn skip_whitespace(&mut self) {
        while let Some(' ') | Some('\t') = self.peek() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, delimiter: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        if self.peek() == Some(delimiter) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(ParseErrorKind::MissingDelimiter(delimiter)))
        }
    }

    fn parse(mut self) -> Result<Expr, ParseError> {
        let expr = self.expr()?;
        self.skip_whitespace();
        match self.peek() {
            None => Ok(expr),
            Some(c) => Err(self.error(ParseErrorKind::UnexpectedCharacter(c))),
        }
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let entry = self.depth;
        let mut lhs = self.term()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some('+') => BinaryOp::Add,
                Some('-') => BinaryOp::Sub,
                _ => {
                    self.depth = entry;
                    return Ok(lhs);
                }
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let entry = self.depth;
        let mut lhs = self.power()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some('*') => BinaryOp::Mul,
                Some('/') => BinaryOp::Div,
                _ => {
                    self.depth = entry;
                    return Ok(lhs);
                }
            };
            self.pos += 1;
            self.descend()?;
            let rhs = self.power()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    // Left-associative: z^2^3 is (z^2)^3.
    fn power(&mut self) -> Result<Expr, ParseError> {
        let entry = self.depth;
        let mut lhs = self.factor()?;
        loop {
            self.skip_whitespace();
            if self.peek() != Some('^') {
                self.depth = entry;
                return Ok(lhs);
            }
            self.pos += 1;
            self.descend()?;
            let rhs = self.factor()?;
            lhs = Expr::Binary(BinaryOp::Pow, Box::new(lhs), Box::new(rhs));
        }
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        let entry = self.depth;
        self.descend()?;
        let factor = self.operand();
        self.depth = entry;
        factor
    }

    fn operand(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(self.error(ParseErrorKind::UnexpectedEnd)),
            Some('+') => {
                self.pos += 1;
                self.factor()
            }
            Some('-') => {
                self.pos += 1;
                let operand = self.factor()?;
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)))
            }
            Some('(') => {
                self.pos += 1;
                let inner = self.expr()?;
                self.expect(')')?;
                Ok(inner)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.identifier(),
            Some(c) => Err(self.error(ParseErrorKind::UnexpectedCharacter(c))),
        }
    }

    fn digits(&mut self) -> usize {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            self.pos += 1;
        }
        self.pos - start
    }

    fn malformed(&self, start: usize) -> ParseError {
        let text: String = self.chars[start..self.pos].iter().collect();
        ParseError::new(start, ParseErrorKind::MalformedNumber(text))
    }

    fn number(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        let mut mantissa = self.digits();
        if self.peek() == Some('.') {
            self.pos += 1;
            mantissa += self.digits();
        }
        if mantissa == 0 {
            return Err(self.malformed(start));
        }

        if let Some('e') | Some('E') = self.peek() {
            self.pos += 1;
            if let Some('+') | Some('-') = self.peek() {
                self.pos += 1;
            }
            if self.digits() == 0 {
                return Err(self.malformed(start));
            }
        }

        if self.peek() == Some('.') {
            self.pos += 1;
            return Err(self.malformed(start));
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        match text.parse::<f64>() {
            Ok(value) => Ok(Expr::Literal(value)),
            Err(_) => Err(self.malformed(start)),
        }
    }

    fn identifier(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !c.is_ascii_alphabetic() {
                break;
            }
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();

        match name.as_str() {
            "z" => return Ok(Expr::Var(Var::Z)),
            "c" => return Ok(Expr::Var(Var::C)),
            "I" => return Ok(Expr::Var(Var::ImagUnit)),
            _ => {}
        }

        let function = match Function::lookup(&name) {
            Some(function) => function,
            None => {
                return Err(ParseError::new(
                    start,
                    ParseErrorKind::UnknownFunction(name),
                ))
            }
        };
        self.expect('(')?;
        let arg = self.expr()?;
        self.expect(')')?;
        Ok(Expr::Call(function, Box::new(arg)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const TOLERANCE: f64 = 1e-12;

    fn close(a: Complex<f64>, b: Complex<f64>) -> bool {
        let scale = 1.0_f64.max(b.norm());
        (a - b).norm() <= TOLERANCE * scale
    }

    fn samples(count: usize) -> Vec<(Complex<f64>, Complex<f64>)> {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        (0..count)
            .map(|_| {
                (
                    Complex::new(rng.gen_range(-2.0, 2.0), rng.gen_range(-2.0, 2.0)),
                    Complex::new(rng.gen_range(-2.0, 2.0), rng.gen_range(-2.0, 2.0)),
                )
            })
            .collect()
    }

    fn check<F>(formula: &str, expected: F)
    where
        F: Fn(Complex<f64>, Complex<f64>) -> Complex<f64>,
    {
        let compiled = compile(formula).unwrap();
        for (z, c) in samples(64) {
            let got = compiled.eval(z, c);
            let want = expected(z, c);
            assert!(
                close(got, want),
                "{} at z={} c={}: got {}, want {}",
                formula,
                z,
                c,
                got,
                want
            );
        }
    }

    fn kind_of(formula: &str) -> ParseErrorKind {
        compile(formula).unwrap_err().kind
    }

    #[test]
    fn arithmetic_matches_complex_arithmetic() {
        check("z+c", |z, c| z + c);
        check("z-c", |z, c| z - c);
        check("z*c", |z, c| z * c);
        check("z/c", |z, c| z / c);
        check("z*z+c", |z, c| z * z + c);
        check("z^2+c", |z, c| z * z + c);
        check("z^3 - 2*z + c", |z, c| z * z * z - z * 2.0 + c);
    }

    #[test]
    fn precedence_and_grouping() {
        check("z+c*z", |z, c| z + c * z);
        check("(z+c)*z", |z, c| (z + c) * z);
        check("z-c-z", |z, c| (z - c) - z);
        check("z/c/z", |z, c| (z / c) / z);
        check("2*z^2", |z, _| z * z * 2.0);
        check("((z))", |z, _| z);
    }

    #[test]
    fn powers_associate_to_the_left() {
        check("z^2^3", |z, _| {
            let sq = z * z;
            sq * sq * sq
        });
    }

    #[test]
    fn prefix_signs_bind_to_a_factor() {
        check("-z", |z, _| -z);
        check("+z", |z, _| z);
        check("--z", |z, _| z);
        check("-z^2", |z, _| (-z) * (-z));
        check("z*-c", |z, c| z * -c);
    }

    #[test]
    fn imaginary_unit_and_literals() {
        check("I", |_, _| Complex::new(0.0, 1.0));
        check("z + 0.5*I", |z, _| z + Complex::new(0.0, 0.5));
        check("1.5e2", |_, _| Complex::new(150.0, 0.0));
        check("2.5E-1 * c", |_, c| c * 0.25);
        check(".5", |_, _| Complex::new(0.5, 0.0));
        check("3.", |_, _| Complex::new(3.0, 0.0));
        check("1e+1", |_, _| Complex::new(10.0, 0.0));
    }

    #[test]
    fn functions_match_num_complex() {
        check("abs(z)", |z, _| Complex::new(z.norm(), 0.0));
        check("exp(z)", |z, _| z.exp());
        check("sin(z)", |z, _| z.sin());
        check("cos(z)", |z, _| z.cos());
        check("tan(z)", |z, _| z.tan());
        check("asin(z)", |z, _| z.asin());
        check("acos(z)", |z, _| z.acos());
        check("atan(z)", |z, _| z.atan());
        check("sqrt(z)", |z, _| z.sqrt());
        check("real(z)", |z, _| Complex::new(z.re, 0.0));
        check("imag(z)", |z, _| Complex::new(0.0, z.im));
    }

    #[test]
    fn functions_ignore_the_other_variable() {
        let f = compile("sin(z)").unwrap();
        let z = Complex::new(0.3, -0.7);
        assert_eq!(f.eval(z, Complex::new(1.0, 1.0)), f.eval(z, Complex::new(-5.0, 2.0)));
    }

    #[test]
    fn nested_calls_and_whitespace() {
        check(" sin ( cos( z ) )\t+ c ", |z, c| z.cos().sin() + c);
        check("exp(z^2 - c)", |z, c| (z * z - c).exp());
        check("sqrt(abs(z))", |z, _| Complex::new(z.norm().sqrt(), 0.0));
    }

    #[test]
    fn lone_c_is_the_parameter() {
        assert_eq!(compile("c").unwrap().expr(), &Expr::Var(Var::C));
        assert_eq!(
            compile("cos(c)").unwrap().expr(),
            &Expr::Call(Function::Cos, Box::new(Expr::Var(Var::C)))
        );
    }

    #[test]
    fn zero_to_a_power_is_zero() {
        let f = compile("z^2+c").unwrap();
        let c = Complex::new(-0.5, 0.25);
        assert_eq!(f.eval(Complex::new(0.0, 0.0), c), c);
        let f = compile("z^c").unwrap();
        assert_eq!(
            f.eval(Complex::new(0.0, 0.0), Complex::new(0.5, 0.5)),
            Complex::new(0.0, 0.0)
        );
    }

    #[test]
    fn negative_powers_of_zero_blow_up() {
        let zero = Complex::new(0.0, 0.0);
        for formula in &["z^-2", "z^-1", "z^-0.5"] {
            let v = compile(formula).unwrap().eval(zero, zero);
            assert!(!v.re.is_finite() || !v.im.is_finite(), "{} gave {}", formula, v);
        }
        assert_eq!(compile("z^0").unwrap().eval(zero, zero), Complex::new(1.0, 0.0));
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let parens = format!("{}z{}", "(".repeat(10_000), ")".repeat(10_000));
        let signs = format!("{}z", "-".repeat(10_000));
        let sum = format!("z{}", "+z".repeat(10_000));
        let powers = format!("z{}", "^1".repeat(10_000));
        for formula in &[parens, signs, sum, powers] {
            assert_eq!(kind_of(formula), ParseErrorKind::TooDeep(MAX_NESTING));
        }
    }

    #[test]
    fn reasonable_nesting_is_fine() {
        let parens = format!("{}z{}", "(".repeat(100), ")".repeat(100));
        assert!(compile(&parens).is_ok());
        let sum = format!("z{}", "+z".repeat(200));
        let v = compile(&sum).unwrap().eval(Complex::new(1.0, 0.0), Complex::new(0.0, 0.0));
        assert_eq!(v, Complex::new(201.0, 0.0));
        let calls = format!("{}z{}", "sin(".repeat(50), ")".repeat(50));
        assert!(compile(&calls).is_ok());
    }

    #[test]
    fn non_integer_powers_use_exp_log() {
        check("z^0.5", |z, _| (z.ln() * 0.5).exp());
        check("z^c", |z, c| (c * z.ln()).exp());
        check("z^-2", |z, _| Complex::new(1.0, 0.0) / (z * z));
    }

    #[test]
    fn division_by_zero_propagates() {
        let f = compile("1/z").unwrap();
        let v = f.eval(Complex::new(0.0, 0.0), Complex::new(0.0, 0.0));
        assert!(!v.re.is_finite() || !v.im.is_finite());
    }

    #[test]
    fn trailing_operator_fails() {
        let err = compile("z +").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedEnd);
        assert_eq!(err.position, 3);
    }

    #[test]
    fn empty_formula_fails() {
        assert_eq!(kind_of(""), ParseErrorKind::UnexpectedEnd);
        assert_eq!(kind_of("   "), ParseErrorKind::UnexpectedEnd);
    }

    #[test]
    fn unknown_identifiers_fail() {
        assert_eq!(kind_of("log(z)"), ParseErrorKind::UnknownFunction("log".to_string()));
        assert_eq!(kind_of("zz"), ParseErrorKind::UnknownFunction("zz".to_string()));
        assert_eq!(kind_of("sinh(z)"), ParseErrorKind::UnknownFunction("sinh".to_string()));
        assert_eq!(kind_of("x"), ParseErrorKind::UnknownFunction("x".to_string()));
    }

    #[test]
    fn missing_delimiters_fail() {
        assert_eq!(kind_of("sin z"), ParseErrorKind::MissingDelimiter('('));
        assert_eq!(kind_of("sin(z"), ParseErrorKind::MissingDelimiter(')'));
        assert_eq!(kind_of("(z + c"), ParseErrorKind::MissingDelimiter(')'));
    }

    #[test]
    fn malformed_numbers_fail() {
        assert_eq!(
            kind_of("1.2.3"),
            ParseErrorKind::MalformedNumber("1.2.".to_string())
        );
        assert_eq!(kind_of("2e"), ParseErrorKind::MalformedNumber("2e".to_string()));
        assert_eq!(kind_of("2e+"), ParseErrorKind::MalformedNumber("2e+".to_string()));
        assert_eq!(kind_of("."), ParseErrorKind::MalformedNumber(".".to_string()));
    }

    #[test]
    fn stray_characters_fail() {
        assert_eq!(kind_of("z $ c"), ParseErrorKind::UnexpectedCharacter('$'));
        assert_eq!(kind_of("z c"), ParseErrorKind::UnexpectedCharacter('c'));
        assert_eq!(kind_of("z)"), ParseErrorKind::UnexpectedCharacter(')'));
        assert_eq!(kind_of("c(z)"), ParseErrorKind::UnexpectedCharacter('('));
        assert_eq!(kind_of("*z"), ParseErrorKind::UnexpectedCharacter('*'));
    }

    #[test]
    fn errors_report_their_position() {
        let err = compile("z^2 + foo(z)").unwrap_err();
        assert_eq!(err.position, 6);
        assert_eq!(format!("{}", err), "at position 6: unknown function 'foo'");
    }

    #[test]
    fn formulas_parse_from_str_and_display_their_source() {
        let f: Formula = "z^2 + c".parse().unwrap();
        assert_eq!(f.to_string(), "z^2 + c");
        assert!("z^".parse::<Formula>().is_err());
    }

    #[test]
    fn function_names_round_trip() {
        for &(name, function) in FUNCTIONS {
            assert_eq!(Function::lookup(name), Some(function));
        }
    }
}
