// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate env_logger;
extern crate failure;
extern crate fractalmake;
#[macro_use]
extern crate log;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use std::process;
use std::str::FromStr;

use fractalmake::{read_options, write_fractal, Decomposition};

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const CONFIG: &str = "config";
const OUTPUT: &str = "output";
const THREADS: &str = "threads";
const POINTS: &str = "points-per-thread";

const MAX_THREADS: usize = 1024;

fn args<'a>() -> ArgMatches<'a> {
    App::new("fractalmake")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Escape-time fractal renderer")
        .arg(
            Arg::with_name(CONFIG)
                .required(true)
                .index(1)
                .help("Option file describing the fractal"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .required(false)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file, overriding the option file; - for standard output"),
        )
        .arg(
            Arg::with_name(THREADS)
                .required(false)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        MAX_THREADS,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", MAX_THREADS),
                    )
                })
                .help("Number of threads to use, overriding the option file"),
        )
        .arg(
            Arg::with_name(POINTS)
                .required(false)
                .long(POINTS)
                .short("p")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        usize::max_value(),
                        "Could not parse point count",
                        "Points per thread must be at least 1",
                    )
                })
                .help("How many points a thread claims at a time"),
        )
        .get_matches()
}

fn run(matches: &ArgMatches) -> Result<(), failure::Error> {
    // Required, so clap has already checked that it is there.
    let config = matches.value_of(CONFIG).unwrap_or_default();
    let mut options = read_options(config)?;
    info!("read options from {}", config);

    if let Some(threads) = matches.value_of(THREADS) {
        options.threads = usize::from_str(threads)?;
    }
    if let Some(output) = matches.value_of(OUTPUT) {
        options.output = output.to_string();
    }
    if options.threads > num_cpus::get() {
        warn!(
            "{} threads requested but only {} cpus available",
            options.threads,
            num_cpus::get()
        );
    }

    let mut decomposition = Decomposition::new(options.threads);
    if let Some(points) = matches.value_of(POINTS) {
        decomposition = decomposition.points_per_thread(usize::from_str(points)?);
    }

    let evaluator = &options.evaluator;
    let fractal = decomposition.run(&options.region, |point| evaluator.iterations(point))?;

    let scale = &options.color_scale;
    write_fractal(&fractal, &options.output, |count| scale.color_or_black(count))?;
    Ok(())
}

fn main() {
    env_logger::init();
    let matches = args();
    if let Err(e) = run(&matches) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
