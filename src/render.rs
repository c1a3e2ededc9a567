// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The threaded renderer.
//!
//! Work is handed out in horizontal bands of rows.  A single cursor,
//! behind a single mutex, remembers the first row nobody has claimed
//! yet along with the matching unclaimed tail of the output grid.  A
//! worker takes the lock just long enough to carve the next band off
//! that tail, then fills the band without holding anything: the bands
//! are disjoint `&mut` slices, so no two threads can ever touch the
//! same cell.  Small bands balance the load better, large bands spend
//! less time on the lock; `points_per_thread` picks the trade-off.

use std::cmp;
use std::mem;
use std::sync::Mutex;
use std::time::Instant;

use crossbeam;
use itertools::iproduct;
use num::Complex;

use errors::{ConfigError, Error};
use planes::Region;

/// Roughly how many points a worker takes each time it visits the
/// cursor.
pub const POINTS_PER_THREAD: usize = 100_000;

/// A region along with one iteration count per sample point, in
/// row-major order, bottom row first.
#[derive(Clone, Debug, PartialEq)]
pub struct Fractal {
    region: Region,
    values: Vec<u32>,
}

impl Fractal {
    /// The region that was sampled.
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// All of the counts, row-major, bottom row first.
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// The count at a row (counted up from the bottom) and column.
    pub fn get(&self, row: usize, column: usize) -> u32 {
        self.values[self.region.offset(row, column)]
    }

    /// One full row, left to right.
    pub fn row(&self, row: usize) -> &[u32] {
        let start = self.region.offset(row, 0);
        &self.values[start..start + self.region.columns()]
    }
}

/// A run of whole rows, and the piece of the grid that holds them.
struct Band<'a> {
    first_row: usize,
    values: &'a mut [u32],
}

/// The next row to hand out, and every cell from that row onward.
struct WorkCursor<'a> {
    next_row: usize,
    rows: usize,
    columns: usize,
    band_rows: usize,
    unclaimed: &'a mut [u32],
}

impl<'a> WorkCursor<'a> {
    fn new(region: &Region, band_rows: usize, values: &'a mut [u32]) -> Self {
        WorkCursor {
            next_row: 0,
            rows: region.rows(),
            columns: region.columns(),
            band_rows,
            unclaimed: values,
        }
    }

    /// Carve off the next band, or None once every row is spoken for.
    /// The last band is cut short at the top of the grid.
    fn claim(&mut self) -> Option<Band<'a>> {
        if self.next_row >= self.rows {
            return None;
        }
        let first_row = self.next_row;
        let last_row = cmp::min(first_row.saturating_add(self.band_rows), self.rows);
        self.next_row = last_row;

        let unclaimed = mem::replace(&mut self.unclaimed, &mut []);
        let (values, rest) = unclaimed.split_at_mut((last_row - first_row) * self.columns);
        self.unclaimed = rest;
        Some(Band { first_row, values })
    }
}

fn fill_band<F>(region: &Region, band: Band, check: &F)
where
    F: Fn(Complex<f64>) -> u32,
{
    let rows = band.values.len() / region.columns();
    let points = iproduct!(0..rows, 0..region.columns());
    for ((row, column), value) in points.zip(band.values.iter_mut()) {
        *value = check(region.point(band.first_row + row, column));
    }
}

/// The parameters of a threaded render.  Once set, these should not
/// change.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Decomposition {
    threads: usize,
    points_per_thread: usize,
}

impl Decomposition {
    /// A render on `threads` workers with the default band size.
    pub fn new(threads: usize) -> Self {
        Decomposition {
            threads,
            points_per_thread: POINTS_PER_THREAD,
        }
    }

    /// Change how many points a worker claims at once.
    pub fn points_per_thread(mut self, points_per_thread: usize) -> Self {
        self.points_per_thread = points_per_thread;
        self
    }

    /// The number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// How many rows one band holds for a grid `columns` wide: enough
    /// rows to cover `points_per_thread` points, plus one.  Saturates
    /// rather than overflowing for absurd point counts.
    pub fn band_rows(&self, columns: usize) -> usize {
        let rows = self.points_per_thread / columns + (self.points_per_thread % columns != 0) as usize;
        rows.saturating_add(1)
    }

    /// Evaluate `check` at every point of `region`.  The threads are
    /// all joined before this returns.  If any of them panics the whole
    /// render is lost.
    pub fn run<F>(&self, region: &Region, check: F) -> Result<Fractal, Error>
    where
        F: Fn(Complex<f64>) -> u32 + Sync,
    {
        if self.threads == 0 {
            return Err(ConfigError::NoThreads.into());
        }

        let band_rows = self.band_rows(region.columns());
        info!(
            "rendering {}x{} points on {} threads",
            region.columns(),
            region.rows(),
            self.threads
        );
        debug!("{} rows per band", band_rows);
        let started = Instant::now();

        let mut values = vec![0 as u32; region.len()];
        {
            let cursor = Mutex::new(WorkCursor::new(region, band_rows, &mut values));
            let cursor = &cursor;
            let check = &check;
            crossbeam::scope(|spawner| {
                for worker in 0..self.threads {
                    spawner.spawn(move |_| {
                        let mut bands = 0;
                        loop {
                            let band = {
                                match cursor.lock() {
                                    Ok(mut cursor) => cursor.claim(),
                                    // Someone panicked holding the lock;
                                    // the scope will report it.
                                    Err(_) => None,
                                }
                            };
                            match band {
                                Some(band) => {
                                    trace!("worker {} claimed row {}", worker, band.first_row);
                                    fill_band(region, band, check);
                                    bands += 1;
                                }
                                None => {
                                    break;
                                }
                            }
                        }
                        debug!("worker {} finished after {} bands", worker, bands);
                    });
                }
            })
            .map_err(|_| Error::WorkerPanicked)?;
        }

        let elapsed = started.elapsed();
        info!(
            "rendered in {}.{:03}s",
            elapsed.as_secs(),
            elapsed.subsec_millis()
        );
        Ok(Fractal {
            region: *region,
            values,
        })
    }
}

/// Evaluate `check` at every point of `region` on `threads` workers,
/// with the default band size.
pub fn make_fractal<F>(region: &Region, check: F, threads: usize) -> Result<Fractal, Error>
where
    F: Fn(Complex<f64>) -> u32 + Sync,
{
    Decomposition::new(threads).run(region, check)
}
