// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns a rendered fractal into a 24-bit BMP.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use image::bmp::BMPEncoder;
use image::ColorType;

use color::Rgb;
use errors::Error;
use render::Fractal;

/// Color every count and lay the pixels out top row first, which is
/// what image encoders expect.  Row 0 of a fractal is its bottom edge,
/// so the rows come out reversed.
pub fn pixels<C>(fractal: &Fractal, color: C) -> Vec<u8>
where
    C: Fn(u32) -> Rgb,
{
    let region = fractal.region();
    let mut pixels = Vec::with_capacity(region.len() * 3);
    for row in (0..region.rows()).rev() {
        for &count in fractal.row(row) {
            let rgb = color(count);
            pixels.extend_from_slice(&[rgb.r, rgb.g, rgb.b]);
        }
    }
    pixels
}

/// Encode `fractal` as a BMP into `writer`.
pub fn save_fractal<W, C>(fractal: &Fractal, writer: &mut W, color: C) -> Result<(), Error>
where
    W: Write,
    C: Fn(u32) -> Rgb,
{
    let region = fractal.region();
    let data = pixels(fractal, color);
    BMPEncoder::new(writer).encode(
        &data,
        region.columns() as u32,
        region.rows() as u32,
        ColorType::RGB(8),
    )?;
    Ok(())
}

/// Write `fractal` as a BMP to the file at `path`, or to standard
/// output if `path` is `-`.
pub fn write_fractal<C>(fractal: &Fractal, path: &str, color: C) -> Result<(), Error>
where
    C: Fn(u32) -> Rgb,
{
    if path == "-" {
        let stdout = io::stdout();
        let mut writer = stdout.lock();
        save_fractal(fractal, &mut writer, color)?;
        writer.flush()?;
    } else {
        let mut writer = BufWriter::new(File::create(path)?);
        save_fractal(fractal, &mut writer, color)?;
        writer.flush()?;
    }
    info!("wrote {}", if path == "-" { "<stdout>" } else { path });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image;
    use image::Pixel;
    use num::Complex;
    use planes::Region;
    use render::make_fractal;
    use tempfile;

    // Bottom-left is red, everything else on the bottom row is green,
    // and the rest is blue.
    fn marked() -> Fractal {
        let region = Region::new(Complex::new(0.0, 0.0), Complex::new(2.0, 1.0), 3, 2).unwrap();
        make_fractal(
            &region,
            |p: Complex<f64>| match (p.re as u32, p.im as u32) {
                (0, 0) => 1,
                (_, 0) => 2,
                _ => 3,
            },
            2,
        )
        .unwrap()
    }

    fn palette(count: u32) -> Rgb {
        match count {
            1 => Rgb::new(255, 0, 0),
            2 => Rgb::new(0, 255, 0),
            _ => Rgb::new(0, 0, 255),
        }
    }

    #[test]
    fn pixels_are_top_row_first() {
        let data = pixels(&marked(), palette);
        assert_eq!(
            data,
            vec![
                0, 0, 255, 0, 0, 255, 0, 0, 255, // top
                255, 0, 0, 0, 255, 0, 0, 255, 0, // bottom
            ]
        );
    }

    #[test]
    fn writes_a_bmp_the_right_way_up() {
        let mut buf = vec![];
        save_fractal(&marked(), &mut buf, palette).unwrap();
        assert_eq!(&buf[0..2], b"BM");

        let decoded = image::load_from_memory(&buf).unwrap().to_rgb();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(0, 1).channels(), &[255, 0, 0]);
        assert_eq!(decoded.get_pixel(2, 1).channels(), &[0, 255, 0]);
        assert_eq!(decoded.get_pixel(1, 0).channels(), &[0, 0, 255]);
    }

    #[test]
    fn writes_to_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bmp");
        write_fractal(&marked(), path.to_str().unwrap(), palette).unwrap();
        let decoded = image::open(&path).unwrap().to_rgb();
        assert_eq!(decoded.dimensions(), (3, 2));
    }

    #[test]
    fn unwritable_paths_are_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.bmp");
        match write_fractal(&marked(), path.to_str().unwrap(), palette) {
            Err(Error::Io(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
