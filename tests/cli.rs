// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate assert_cmd;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;

const CONFIG: &str = r#"
domain: { {-2.0, -1.5}, {1.0, 1.5}, 24, 18 }
num_threads: 2
output: "unused.bmp"
colors: { {1, {0, 7, 100}}, {10, {32, 107, 203}}, {40, {255, 170, 0}} }
function: { "z^2 + c", max_iterations: 64, escape_tol: 2, constant: {0, 0}, point: c }
"#;

fn write_config(dir: &Path, text: &str) -> String {
    let path = dir.join("fractal.cfg");
    fs::write(&path, text).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn renders_a_bmp() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), CONFIG);
    let output = dir.path().join("out.bmp");

    Command::cargo_bin("fractalmake")
        .unwrap()
        .arg(&config)
        .arg("-o")
        .arg(&output)
        .arg("--threads")
        .arg("3")
        .assert()
        .success();

    let bytes = fs::read(&output).unwrap();
    assert_eq!(&bytes[0..2], b"BM");
    assert!(!dir.path().join("unused.bmp").exists());
}

#[test]
fn writes_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), CONFIG);

    let assert = Command::cargo_bin("fractalmake")
        .unwrap()
        .args(&[config.as_str(), "-o", "-"])
        .assert()
        .success();
    assert!(assert.get_output().stdout.starts_with(b"BM"));
}

#[test]
fn bad_formula_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), &CONFIG.replace("z^2 + c", "z^2 + foo(c)"));
    let output = dir.path().join("out.bmp");

    Command::cargo_bin("fractalmake")
        .unwrap()
        .arg(&config)
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown function 'foo'"));
    assert!(!output.exists());
}

#[test]
fn missing_options_fail() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "num_threads: 2\n");

    Command::cargo_bin("fractalmake")
        .unwrap()
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("colors, domain, output, function"));
}

#[test]
fn missing_config_file_fails() {
    Command::cargo_bin("fractalmake")
        .unwrap()
        .arg("/nonexistent/fractal.cfg")
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error:"));
}

#[test]
fn zero_threads_on_the_command_line_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), CONFIG);

    Command::cargo_bin("fractalmake")
        .unwrap()
        .args(&[config.as_str(), "-t", "0"])
        .assert()
        .failure();
}
