// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reads the option file that describes a render.  A file looks like
//! this:
//!
//! ```text
//! # Comments run to the end of the line.
//! domain: { {-2.0, -1.5}, {1.0, 1.5}, 800, 800 }
//! num_threads: 4
//! output: "mandelbrot.bmp"
//! colors: { {1, {0, 7, 100}}, {20, {32, 107, 203}}, {200, {255, 170, 0}} }
//! function: { "z^2 + c", max_iterations: 256, escape_tol: 2.0,
//!             constant: {0, 0}, point: c }
//! ```
//!
//! The five options may come in any order but each must appear exactly
//! once.  Everything is validated here, the formula included, so a bad
//! file never gets as far as starting a thread.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use num::Complex;

use color::{ColorScale, Rgb};
use errors::{ConfigError, Error};
use escape::{EscapeTime, Mode};
use parser;
use planes::Region;

const OPTION_NAMES: [&str; 5] = ["colors", "domain", "num_threads", "output", "function"];

/// Everything a render needs, as read from an option file.
#[derive(Clone, Debug)]
pub struct FractalOptions {
    /// Where on the complex plane, and how finely.
    pub region: Region,
    /// Where the image goes; `-` is standard output.
    pub output: String,
    /// The color key-points, in file order.
    pub colors: Vec<(u32, Rgb)>,
    /// The scale built from those key-points.
    pub color_scale: ColorScale,
    /// How many worker threads to render with.
    pub threads: usize,
    /// The compiled formula and its escape parameters.
    pub evaluator: EscapeTime,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TokenKind {
    Keyword,
    Symbol,
    Str,
    Floating,
    Integer,
    Eof,
}

#[derive(Clone, Debug)]
struct Token {
    kind: TokenKind,
    text: String,
    line: usize,
    column: usize,
}

impl Token {
    fn is_symbol(&self, symbol: char) -> bool {
        self.kind == TokenKind::Symbol && self.text.chars().next() == Some(symbol)
    }

    fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::Str => format!("string \"{}\"", self.text),
            _ => format!("'{}'", self.text),
        }
    }
}

struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Tokenizer {
    fn new(text: &str) -> Self {
        Tokenizer {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).cloned()
    }

    fn bump(&mut self) -> Option<char> {
        let next = self.peek();
        if let Some(c) = next {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn error(&self, line: usize, column: usize, message: &str) -> ConfigError {
        ConfigError::Syntax {
            line,
            column,
            message: message.to_string(),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                '#' => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                ' ' | '\n' | '\t' | '\r' => {
                    self.bump();
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ConfigError> {
        self.skip_whitespace();
        let (line, column) = (self.line, self.column);
        let token = |kind, text| Token {
            kind,
            text,
            line,
            column,
        };

        match self.peek() {
            None => Ok(token(TokenKind::Eof, String::new())),
            Some(c) if c.is_ascii_digit() || c == '+' || c == '-' || c == '.' => {
                let (kind, text) = self.number(line, column)?;
                Ok(token(kind, text))
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(c) = self.peek() {
                    if !(c.is_ascii_alphabetic() || c == '_') {
                        break;
                    }
                    word.push(c);
                    self.bump();
                }
                Ok(token(TokenKind::Keyword, word))
            }
            Some('"') => {
                self.bump();
                let mut text = String::new();
                loop {
                    match self.bump() {
                        None => return Err(self.error(line, column, "reached end of file while reading string")),
                        Some('"') => break,
                        Some(c) => text.push(c),
                    }
                }
                Ok(token(TokenKind::Str, text))
            }
            Some(c) => {
                self.bump();
                Ok(token(TokenKind::Symbol, c.to_string()))
            }
        }
    }

    // A sign may only lead the number or follow the exponent marker.
    fn number(&mut self, line: usize, column: usize) -> Result<(TokenKind, String), ConfigError> {
        let mut text = String::new();
        let mut kind = TokenKind::Integer;
        let (mut got_decimal, mut got_exponent) = (false, false);

        if let Some(first) = self.bump() {
            if first == '-' || first == '.' {
                kind = TokenKind::Floating;
            }
            got_decimal = first == '.';
            text.push(first);
        }

        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {}
                '.' => {
                    if got_decimal {
                        return Err(self.error(line, column, "bad number format - multiple decimal points"));
                    }
                    got_decimal = true;
                    kind = TokenKind::Floating;
                }
                'e' | 'E' => {
                    if got_exponent {
                        return Err(self.error(line, column, "bad number format - multiple occurrences of 'E'"));
                    }
                    got_exponent = true;
                    kind = TokenKind::Floating;
                }
                '+' | '-' => {
                    if !text.ends_with('e') && !text.ends_with('E') {
                        return Err(self.error(
                            line,
                            column,
                            "bad number format - sign somewhere besides the beginning or immediately after 'E'",
                        ));
                    }
                }
                _ => break,
            }
            text.push(c);
            self.bump();
        }
        Ok((kind, text))
    }
}

struct OptionParser {
    tokens: Tokenizer,
}

impl OptionParser {
    fn next(&mut self) -> Result<Token, ConfigError> {
        self.tokens.next_token()
    }

    fn unexpected(&self, token: &Token, message: &str) -> ConfigError {
        ConfigError::Syntax {
            line: token.line,
            column: token.column,
            message: format!("{}, found {}", message, token.describe()),
        }
    }

    fn symbol(&mut self, symbol: char, context: &str) -> Result<(), ConfigError> {
        let token = self.next()?;
        if token.is_symbol(symbol) {
            Ok(())
        } else {
            Err(self.unexpected(&token, &format!("expected '{}' {}", symbol, context)))
        }
    }

    fn keyword(&mut self, name: &str) -> Result<(), ConfigError> {
        let token = self.next()?;
        if token.kind == TokenKind::Keyword && token.text == name {
            Ok(())
        } else {
            Err(self.unexpected(&token, &format!("expected '{}' specification next", name)))
        }
    }

    fn integer(&mut self) -> Result<u32, ConfigError> {
        let token = self.next()?;
        if token.kind != TokenKind::Integer {
            return Err(self.unexpected(&token, "expected an integer"));
        }
        token
            .text
            .parse::<u32>()
            .map_err(|_| self.unexpected(&token, "integer out of range"))
    }

    fn float(&mut self) -> Result<f64, ConfigError> {
        let token = self.next()?;
        if token.kind != TokenKind::Integer && token.kind != TokenKind::Floating {
            return Err(self.unexpected(&token, "expected a number"));
        }
        token
            .text
            .parse::<f64>()
            .map_err(|_| self.unexpected(&token, "malformed number"))
    }

    fn string(&mut self) -> Result<String, ConfigError> {
        let token = self.next()?;
        if token.kind != TokenKind::Str {
            return Err(self.unexpected(&token, "expected a quoted string"));
        }
        Ok(token.text)
    }

    // {re, im}
    fn complex(&mut self) -> Result<Complex<f64>, ConfigError> {
        self.symbol('{', "to open a complex constant")?;
        let re = self.float()?;
        self.symbol(',', "between the parts of a complex constant")?;
        let im = self.float()?;
        self.symbol('}', "to close a complex constant")?;
        Ok(Complex::new(re, im))
    }

    fn channel(&mut self) -> Result<u8, ConfigError> {
        let token = self.next()?;
        if token.kind != TokenKind::Integer {
            return Err(self.unexpected(&token, "expected an integer color value"));
        }
        match token.text.parse::<u32>() {
            Ok(value) if value <= 255 => Ok(value as u8),
            _ => Err(self.unexpected(&token, "color values must be in the range [0, 255]")),
        }
    }

    // {r, g, b}
    fn color(&mut self) -> Result<Rgb, ConfigError> {
        self.symbol('{', "to open a color")?;
        let r = self.channel()?;
        self.symbol(',', "between color values")?;
        let g = self.channel()?;
        self.symbol(',', "between color values")?;
        let b = self.channel()?;
        self.symbol('}', "to close a color")?;
        Ok(Rgb::new(r, g, b))
    }

    // { {iter, {r, g, b}}, ... }
    fn colors(&mut self) -> Result<Vec<(u32, Rgb)>, ConfigError> {
        self.symbol('{', "to open the color list")?;
        let mut colors = vec![];
        loop {
            self.symbol('{', "to open a color pair")?;
            let iterations = self.integer()?;
            self.symbol(',', "after the iteration count of a color pair")?;
            let color = self.color()?;
            self.symbol('}', "to close a color pair")?;
            colors.push((iterations, color));

            let token = self.next()?;
            if token.is_symbol('}') {
                return Ok(colors);
            }
            if !token.is_symbol(',') {
                return Err(self.unexpected(&token, "expected ',' or '}' in color list"));
            }
        }
    }

    // { {re, im}, {re, im}, columns, rows }
    fn domain(&mut self) -> Result<Region, ConfigError> {
        self.symbol('{', "after \"domain:\"")?;
        let lower_left = self.complex()?;
        self.symbol(',', "in domain")?;
        let upper_right = self.complex()?;
        self.symbol(',', "in domain")?;
        let columns = self.integer()?;
        self.symbol(',', "in domain")?;
        let rows = self.integer()?;
        self.symbol('}', "to close the domain")?;
        Region::new(lower_left, upper_right, columns as usize, rows as usize)
    }

    fn field(&mut self, name: &str) -> Result<(), ConfigError> {
        self.keyword(name)?;
        self.symbol(':', &format!("after '{}'", name))
    }

    // { "formula", max_iterations: N, escape_tol: F, constant: {re, im}, point: c|z }
    fn function(&mut self) -> Result<EscapeTime, ConfigError> {
        self.symbol('{', "to open the function definition")?;
        let formula = parser::compile(&self.string()?)?;
        self.symbol(',', "after the formula")?;

        self.field("max_iterations")?;
        let max_iterations = self.integer()?;
        self.symbol(',', "after max_iterations")?;

        self.field("escape_tol")?;
        let escape_radius = self.float()?;
        self.symbol(',', "after escape_tol")?;

        self.field("constant")?;
        let constant = self.complex()?;
        self.symbol(',', "after constant")?;

        self.field("point")?;
        let token = self.next()?;
        let mode = match Mode::from_str(&token.text) {
            Ok(mode) if token.kind == TokenKind::Keyword => mode,
            _ => return Err(self.unexpected(&token, "bad point specification - expected 'z' or 'c'")),
        };
        self.symbol('}', "to close the function definition")?;

        EscapeTime::new(formula, escape_radius, max_iterations, constant, mode)
    }
}

/// Parse the text of an option file.
pub fn parse_options(text: &str) -> Result<FractalOptions, ConfigError> {
    let mut parser = OptionParser {
        tokens: Tokenizer::new(text),
    };
    let mut colors = None;
    let mut region = None;
    let mut threads = None;
    let mut output = None;
    let mut evaluator = None;

    loop {
        let token = parser.next()?;
        match token.kind {
            TokenKind::Eof => break,
            TokenKind::Keyword => {}
            _ => return Err(parser.unexpected(&token, "expected an option keyword")),
        }
        parser.symbol(':', &format!("after '{}'", token.text))?;

        let seen = match token.text.as_str() {
            "colors" => colors.replace(parser.colors()?).is_some(),
            "domain" => region.replace(parser.domain()?).is_some(),
            "num_threads" => threads.replace(parser.integer()?).is_some(),
            "output" => output.replace(parser.string()?).is_some(),
            "function" => evaluator.replace(parser.function()?).is_some(),
            other => return Err(ConfigError::UnknownOption(other.to_string())),
        };
        if seen {
            return Err(ConfigError::Duplicate(token.text));
        }
        debug!("read option '{}'", token.text);
    }

    let present = [
        colors.is_some(),
        region.is_some(),
        threads.is_some(),
        output.is_some(),
        evaluator.is_some(),
    ];
    let missing: Vec<&str> = OPTION_NAMES
        .iter()
        .zip(present.iter())
        .filter(|&(_, &present)| !present)
        .map(|(&name, _)| name)
        .collect();

    match (colors, region, threads, output, evaluator) {
        (Some(colors), Some(region), Some(threads), Some(output), Some(evaluator)) => {
            if threads == 0 {
                return Err(ConfigError::NoThreads);
            }
            let color_scale = ColorScale::new(&colors)?;
            Ok(FractalOptions {
                region,
                output,
                colors,
                color_scale,
                threads: threads as usize,
                evaluator,
            })
        }
        _ => Err(ConfigError::Missing(missing.join(", "))),
    }
}

/// Read and parse an option file.
pub fn read_options<P: AsRef<Path>>(path: P) -> Result<FractalOptions, Error> {
    let text = fs::read_to_string(path)?;
    Ok(parse_options(&text)?)
}
