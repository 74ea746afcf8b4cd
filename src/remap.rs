use crate::error::*;
use crate::hist::ColorCount;
use crate::image::Raster;
use crate::nearest::{LastMatch, Nearest};
use crate::pal::RGB;
use crate::rayoff::*;
use std::cell::RefCell;

/// Replaces the RGB of every opaque pixel with its nearest palette color, keeping alpha.
///
/// Pixels with alpha 0 are copied untouched and not counted. An empty palette leaves colors as they are.
/// The tally of the output colors is collected in the same pass.
///
/// Deterministic: no dithering, and rows are independent, so threading can't change the result.
#[inline(never)]
pub fn quantize(scaled: &Raster, palette: &[RGB]) -> Result<(Raster, ColorCount), Error> {
    let width = scaled.width();
    let mut output = scaled.try_clone()?;
    let n = Nearest::new(palette);

    let tls = ThreadLocal::new();
    output.pixels.par_chunks_mut(width).for_each(|row| {
        let mut counts = tls.get_or(|| RefCell::new(ColorCount::new())).borrow_mut();
        let mut matcher = LastMatch::new(n);
        for px in row.iter_mut().filter(|px| px.a != 0) {
            let matched = matcher.search(RGB::new(px.r, px.g, px.b));
            px.r = matched.r;
            px.g = matched.g;
            px.b = matched.b;
            counts.add_color(matched, 1);
        }
    });

    let counts = tls.into_iter()
        .map(RefCell::into_inner)
        .reduce(ColorCount::merge)
        .unwrap_or_default();
    Ok((output, counts))
}

#[cfg(test)]
use crate::pal::RGBA;

#[test]
fn two_by_two() {
    let px = vec![
        RGBA::new(255, 0, 0, 255), RGBA::new(0, 255, 0, 255),
        RGBA::new(0, 0, 255, 0), RGBA::new(10, 10, 10, 255),
    ];
    let img = Raster::new(px, 2, 2).unwrap();
    let black = RGB::new(0, 0, 0);
    let (q, counts) = quantize(&img, &[black, RGB::new(255, 255, 255)]).unwrap();
    assert_eq!(&[
        RGBA::new(0, 0, 0, 255), RGBA::new(0, 0, 0, 255),
        RGBA::new(0, 0, 255, 0), RGBA::new(0, 0, 0, 255),
    ], q.pixels());
    assert_eq!(3, counts.get(black));
    assert_eq!(1, counts.len());
}

#[test]
fn alpha_is_kept() {
    let px = vec![RGBA::new(200, 10, 10, 77), RGBA::new(1, 2, 3, 0)];
    let img = Raster::new(px, 1, 2).unwrap();
    let red = RGB::new(237, 28, 36);
    let (q, counts) = quantize(&img, &[RGB::new(0, 0, 0), red]).unwrap();
    assert_eq!(RGBA::new(237, 28, 36, 77), q.pixels()[0]);
    assert_eq!(RGBA::new(1, 2, 3, 0), q.pixels()[1]);
    assert_eq!(1, counts.total());
}

#[test]
fn empty_palette_counts_originals() {
    let px = vec![RGBA::new(1, 1, 1, 255), RGBA::new(1, 1, 1, 255), RGBA::new(2, 2, 2, 255)];
    let img = Raster::new(px, 3, 1).unwrap();
    let (q, counts) = quantize(&img, &[]).unwrap();
    assert_eq!(img, q);
    assert_eq!(2, counts.get(RGB::new(1, 1, 1)));
    assert_eq!(1, counts.get(RGB::new(2, 2, 2)));
}

#[test]
fn same_as_one_by_one_matching() {
    let px: Vec<_> = (0..64 * 48u32).map(|i| RGBA::new((i * 7) as u8, (i * 13 / 5) as u8, (i / 11) as u8, if i % 9 == 0 { 0 } else { 255 })).collect();
    let img = Raster::new(px, 64, 48).unwrap();
    let pal = crate::pal::FREE_PALETTE;
    let (q, counts) = quantize(&img, &pal).unwrap();
    let (q2, counts2) = quantize(&img, &pal).unwrap();
    assert_eq!(q, q2);
    assert_eq!(counts, counts2);
    for (src, out) in img.pixels().iter().zip(q.pixels()) {
        if src.a == 0 {
            assert_eq!(src, out);
        } else {
            let expected = crate::nearest::nearest(RGB::new(src.r, src.g, src.b), &pal);
            assert_eq!(RGBA::new(expected.r, expected.g, expected.b, src.a), *out);
        }
    }
    assert_eq!(img.opaque_count() as u64, counts.total());
    assert_eq!(counts, ColorCount::from_raster(&q));
}
