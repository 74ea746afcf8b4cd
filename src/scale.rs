use crate::error::*;
use crate::image::{temp_buf, Raster};
use crate::rayoff::*;

/// `max(1, round(dim × percent / 100))` for both dimensions
#[must_use]
pub fn scaled_dimensions(width: usize, height: usize, scale_percent: f64) -> (usize, usize) {
    let scale = |dim: usize| ((dim as f64 * scale_percent / 100.).round() as usize).max(1);
    (scale(width), scale(height))
}

/// Point-sampled resize to `scale_percent` of the source size.
///
/// Each output pixel copies the source pixel under its center, alpha included. No averaging,
/// so hard pixel-art edges and fully transparent pixels survive as they are.
pub fn downscale(source: &Raster, scale_percent: f64) -> Result<Raster, Error> {
    if !(scale_percent > 0. && scale_percent <= 100.) {
        return Err(ValueOutOfRange);
    }
    let (width, height) = scaled_dimensions(source.width(), source.height(), scale_percent);
    resample_nearest(source, width, height)
}

/// Nearest-neighbor resample to an arbitrary size, sampling at pixel centers
pub fn resample_nearest(source: &Raster, width: usize, height: usize) -> Result<Raster, Error> {
    let mut out = Raster::transparent(width, height)?;
    let (src_w, src_h) = source.size();
    let src = source.pixels();

    let mut src_cols = temp_buf(width, 0usize)?;
    for (x, col) in src_cols.iter_mut().enumerate() {
        *col = center_sample(x, width, src_w);
    }

    out.pixels.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let src_row = &src[center_sample(y, height, src_h) * src_w..][..src_w];
        for (px, &col) in row.iter_mut().zip(src_cols.iter()) {
            *px = src_row[col];
        }
    });
    Ok(out)
}

/// Expands `scaled` back to `width`×`height` for a flat preview.
///
/// Scaled pixel `x` covers output columns `floor(x·W/w) .. floor((x+1)·W/w)`, same for rows.
/// Transparent pixels stay transparent. The target must be at least as large as `scaled`.
pub fn upscale(scaled: &Raster, width: usize, height: usize) -> Result<Raster, Error> {
    let (w, h) = scaled.size();
    if width < w || height < h {
        return Err(ValueOutOfRange);
    }
    let mut out = Raster::transparent(width, height)?;
    let src = scaled.pixels();

    let mut src_cols = temp_buf(width, 0usize)?;
    for (x, col) in src_cols.iter_mut().enumerate() {
        *col = covering_cell(x, w, width);
    }

    out.pixels.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let src_row = &src[covering_cell(y, h, height) * w..][..w];
        for (px, &col) in row.iter_mut().zip(src_cols.iter()) {
            let s = src_row[col];
            if s.a != 0 {
                *px = s;
            }
        }
    });
    Ok(out)
}

/// Source index under the center of destination pixel `i`
#[inline(always)]
fn center_sample(i: usize, dst_len: usize, src_len: usize) -> usize {
    ((2 * i + 1) * src_len / (2 * dst_len)).min(src_len - 1)
}

/// Largest cell `c` with `floor(c·big/small) <= i`
#[inline(always)]
fn covering_cell(i: usize, small: usize, big: usize) -> usize {
    (((i + 1) * small - 1) / big).min(small - 1)
}

#[cfg(test)]
use crate::pal::RGBA;

#[cfg(test)]
fn gradient(w: usize, h: usize) -> Raster {
    let px: Vec<_> = (0..w * h).map(|i| RGBA::new((i % w) as u8, (i / w) as u8, 7, if i % 5 == 0 { 0 } else { 255 })).collect();
    Raster::new(px, w, h).unwrap()
}

#[test]
fn dimensions_never_zero() {
    assert_eq!((1, 1), scaled_dimensions(1, 1, 1.));
    assert_eq!((1, 1), scaled_dimensions(1, 1, 0.0001));
    assert_eq!((1, 1), scaled_dimensions(30, 3, 0.5));
    assert_eq!((8, 4), scaled_dimensions(100, 50, 8.));
    assert_eq!((3, 1), scaled_dimensions(5, 1, 50.)); // 2.5 rounds up
    assert_eq!((640, 480), scaled_dimensions(640, 480, 100.));

    let tiny = gradient(1, 1);
    let d = downscale(&tiny, 0.01).unwrap();
    assert_eq!((1, 1), d.size());
}

#[test]
fn bad_percent() {
    let img = gradient(4, 4);
    for p in [0., -1., 100.5, f64::NAN, f64::INFINITY] {
        assert_eq!(Err(ValueOutOfRange), downscale(&img, p).map(|_| ()), "{p}");
    }
}

#[test]
fn identity_at_100() {
    let img = gradient(7, 3);
    assert_eq!(img, downscale(&img, 100.).unwrap());
}

#[test]
fn point_sampling_picks_existing_pixels() {
    let img = gradient(10, 10);
    let d = downscale(&img, 50.).unwrap();
    assert_eq!((5, 5), d.size());
    // centers of 2x2 cells land on the odd source pixels
    assert_eq!(img.pixel(1, 1), d.pixel(0, 0));
    assert_eq!(img.pixel(9, 3), d.pixel(4, 1));
    for px in d.pixels() {
        assert!(img.pixels().contains(px));
    }
}

#[test]
fn transparent_stays_transparent() {
    let img = gradient(9, 6);
    let d = downscale(&img, 34.).unwrap();
    for (y, row) in d.rows().enumerate() {
        for (x, px) in row.iter().enumerate() {
            let src = img.pixel(center_sample(x, d.width(), 9), center_sample(y, d.height(), 6)).unwrap();
            assert_eq!(src, *px);
        }
    }
}

#[test]
fn upscale_covers_cells() {
    let small = Raster::new(vec![
        RGBA::new(1, 0, 0, 255), RGBA::new(2, 0, 0, 255), RGBA::new(0, 0, 0, 0),
    ], 3, 1).unwrap();
    let big = upscale(&small, 10, 2).unwrap();
    // 10/3: cells start at 0, 3, 6
    let reds: Vec<_> = big.rows().next().unwrap().iter().map(|p| (p.r, p.a)).collect();
    assert_eq!(vec![(1, 255), (1, 255), (1, 255), (2, 255), (2, 255), (2, 255), (0, 0), (0, 0), (0, 0), (0, 0)], reds);
    assert_eq!(big.pixels()[..10], big.pixels()[10..]);
    assert_eq!(Err(ValueOutOfRange), upscale(&small, 2, 2).map(|_| ()));
}
