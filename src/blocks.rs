use crate::error::*;
use crate::image::Raster;
use crate::pal::{RGB, RGBA};
use crate::rayoff::*;

/// Colors of the parts of a block that aren't the pixel's own color
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BlockStyle {
    /// 1px outline of every block
    pub border: RGBA,
    /// Square between the border and the colored center
    pub padding: RGBA,
    /// Alpha of the colored center. Lower it to let the page show through.
    pub center_alpha: u8,
}

impl Default for BlockStyle {
    fn default() -> Self {
        Self {
            border: RGBA::new(0, 0, 0, 255),
            padding: RGBA::new(0xf0, 0xf0, 0xf0, 255),
            center_alpha: 255,
        }
    }
}

/// Side of one block in output pixels: `round(original_width / scaled_width × display_scale)`, at least 1
#[must_use]
pub fn block_size(original_width: usize, scaled_width: usize, display_scale: f64) -> usize {
    ((original_width as f64 / scaled_width.max(1) as f64 * display_scale).round() as usize).max(1)
}

/// Output canvas size: `round(original × display_scale)`, at least 1×1
#[must_use]
pub fn canvas_size(original: (usize, usize), display_scale: f64) -> (usize, usize) {
    let scale = |dim: usize| ((dim as f64 * display_scale).round() as usize).max(1);
    (scale(original.0), scale(original.1))
}

/// Draws every opaque pixel of `quantized` as a bordered block.
///
/// Blocks larger than 3px get a border, a gray padding square inset by 25%, and the pixel's
/// color in a center square inset by 30%. Smaller blocks are filled with the color outright.
///
/// With `color_filter` set, blocks of any other color keep their border and padding but lose the colored center.
/// Blocks that don't fit the canvas are clipped. `quantized` is only read.
pub fn render_blocks(quantized: &Raster, original: (usize, usize), scaled: (usize, usize), display_scale: f64, color_filter: Option<RGB>, style: &BlockStyle) -> Result<Raster, Error> {
    if quantized.size() != scaled {
        return Err(ValueOutOfRange);
    }
    if !(display_scale.is_finite() && display_scale > 0.) || original.0 == 0 || original.1 == 0 {
        return Err(ValueOutOfRange);
    }

    let size = block_size(original.0, scaled.0, display_scale);
    let geometry = BlockGeometry::new(size);
    let (width, height) = canvas_size(original, display_scale);
    let mut out = Raster::transparent(width, height)?;

    let src_width = quantized.width();
    let src = quantized.pixels();
    out.pixels.par_chunks_mut(width * size).enumerate().for_each(|(block_y, rows)| {
        let Some(src_row) = src.get(block_y * src_width..(block_y + 1) * src_width) else {
            return;
        };
        let mut canvas = Canvas { width, height: rows.len() / width, pixels: rows };
        for (block_x, px) in src_row.iter().enumerate() {
            if px.a == 0 {
                continue;
            }
            let x = block_x * size;
            if x >= width {
                break;
            }
            let color = RGB::new(px.r, px.g, px.b);
            let draw_center = color_filter.map_or(true, |f| f == color);
            geometry.draw(&mut canvas, x, color, draw_center, style);
        }
    });
    Ok(out)
}

#[derive(Debug, Copy, Clone)]
struct BlockGeometry {
    size: usize,
    /// Inset of the padding square from the block edge
    padding: usize,
    /// Inset of the colored center from the block edge
    center: usize,
}

impl BlockGeometry {
    fn new(size: usize) -> Self {
        Self {
            size,
            padding: ((size as f64 * 0.25).floor() as usize).max(1),
            center: ((size as f64 * 0.3).floor() as usize).max(1),
        }
    }

    fn draw(&self, canvas: &mut Canvas<'_>, x: usize, color: RGB, draw_center: bool, style: &BlockStyle) {
        let size = self.size;
        let center_color = RGBA::new(color.r, color.g, color.b, style.center_alpha);

        canvas.stroke_square(x, 0, size, style.border);

        if size <= 3 {
            if draw_center {
                canvas.fill_rect(x, 0, size, size, center_color);
            }
            return;
        }

        if size > self.padding * 2 {
            let inner = size - self.padding * 2;
            canvas.fill_rect(x + self.padding, self.padding, inner, inner, style.padding);

            if draw_center && size > self.center * 2 {
                let inner = size - self.center * 2;
                canvas.fill_rect(x + self.center, self.center, inner, inner, center_color);
            }
        }
    }
}

/// Horizontal band of the output, one block tall (or less at the bottom edge)
struct Canvas<'a> {
    width: usize,
    height: usize,
    pixels: &'a mut [RGBA],
}

impl Canvas<'_> {
    /// Clipped to the canvas. Translucent colors are composited over what's there.
    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: RGBA) {
        let x_end = (x + w).min(self.width);
        let y_end = (y + h).min(self.height);
        if x >= x_end {
            return;
        }
        for row in self.pixels.chunks_exact_mut(self.width).take(y_end).skip(y) {
            for px in &mut row[x..x_end] {
                *px = over(color, *px);
            }
        }
    }

    /// 1px outline just inside the `size`×`size` square
    fn stroke_square(&mut self, x: usize, y: usize, size: usize, color: RGBA) {
        self.fill_rect(x, y, size, 1, color);
        self.fill_rect(x, y + size - 1, size, 1, color);
        self.fill_rect(x, y, 1, size, color);
        self.fill_rect(x + size - 1, y, 1, size, color);
    }
}

/// Source-over compositing of non-premultiplied colors
#[inline]
fn over(src: RGBA, dst: RGBA) -> RGBA {
    match (src.a, dst.a) {
        (255, _) | (_, 0) => src,
        (0, _) => dst,
        _ => {
            let sa = u32::from(src.a);
            let da = u32::from(dst.a) * (255 - sa) / 255;
            let a = sa + da;
            let mix = |s: u8, d: u8| ((u32::from(s) * sa + u32::from(d) * da + a / 2) / a) as u8;
            RGBA::new(mix(src.r, dst.r), mix(src.g, dst.g), mix(src.b, dst.b), a as u8)
        },
    }
}

#[cfg(test)]
fn checker(w: usize, h: usize, a: RGB, b: RGB) -> Raster {
    let px: Vec<_> = (0..w * h).map(|i| {
        let c = if (i % w + i / w) % 2 == 0 { a } else { b };
        RGBA::new(c.r, c.g, c.b, 255)
    }).collect();
    Raster::new(px, w, h).unwrap()
}

#[test]
fn geometry() {
    assert_eq!(10, block_size(100, 10, 1.));
    assert_eq!(5, block_size(100, 10, 0.5));
    assert_eq!(1, block_size(100, 100, 0.1));
    assert_eq!((50, 25), canvas_size((100, 50), 0.5));
    assert_eq!((1, 1), canvas_size((1, 1), 0.01));
    let g = BlockGeometry::new(10);
    assert_eq!((2, 3), (g.padding, g.center));
    let g = BlockGeometry::new(4);
    assert_eq!((1, 1), (g.padding, g.center));
}

#[test]
fn block_layers() {
    let red = RGB::new(237, 28, 36);
    let q = Raster::new(vec![RGBA::new(red.r, red.g, red.b, 255)], 1, 1).unwrap();
    let style = BlockStyle::default();
    let out = render_blocks(&q, (10, 10), (1, 1), 1., None, &style).unwrap();
    assert_eq!((10, 10), out.size());
    let at = |x, y| out.pixel(x, y).unwrap();
    // border
    for i in 0..10 {
        assert_eq!(style.border, at(i, 0));
        assert_eq!(style.border, at(i, 9));
        assert_eq!(style.border, at(0, i));
        assert_eq!(style.border, at(9, i));
    }
    // gap between border and padding (inset 2)
    assert_eq!(0, at(1, 1).a);
    // padding ring
    assert_eq!(style.padding, at(2, 2));
    assert_eq!(style.padding, at(7, 7));
    // center (inset 3)
    assert_eq!(RGBA::new(237, 28, 36, 255), at(3, 3));
    assert_eq!(RGBA::new(237, 28, 36, 255), at(6, 6));
}

#[test]
fn filter_hides_other_centers() {
    let black = RGB::new(0, 0, 0);
    let white = RGB::new(255, 255, 255);
    let q = checker(4, 3, black, white);
    let style = BlockStyle::default();
    let out = render_blocks(&q, (40, 30), (4, 3), 1., Some(white), &style).unwrap();
    for y in 0..3 {
        for x in 0..4 {
            let center = out.pixel(x * 10 + 5, y * 10 + 5).unwrap();
            let src = q.pixel(x, y).unwrap();
            assert_eq!(style.border, out.pixel(x * 10, y * 10).unwrap());
            if src.r == 255 {
                assert_eq!(RGBA::new(255, 255, 255, 255), center);
            } else {
                assert_eq!(style.padding, center);
            }
        }
    }
    let unfiltered = render_blocks(&q, (40, 30), (4, 3), 1., None, &style).unwrap();
    assert_eq!(RGBA::new(0, 0, 0, 255), unfiltered.pixel(5, 5).unwrap());
}

#[test]
fn small_blocks_are_solid() {
    let q = checker(3, 1, RGB::new(1, 2, 3), RGB::new(4, 5, 6));
    let style = BlockStyle::default();
    let out = render_blocks(&q, (9, 3), (3, 1), 1., None, &style).unwrap();
    assert!(out.pixels()[..3].iter().all(|&p| p == RGBA::new(1, 2, 3, 255)));
    assert!(out.pixels()[3..6].iter().all(|&p| p == RGBA::new(4, 5, 6, 255)));

    let filtered = render_blocks(&q, (9, 3), (3, 1), 1., Some(RGB::new(4, 5, 6)), &style).unwrap();
    // outline only, center pixel of the 3x3 block left empty
    assert_eq!(style.border, filtered.pixel(0, 0).unwrap());
    assert_eq!(0, filtered.pixel(1, 1).unwrap().a);
    assert_eq!(RGBA::new(4, 5, 6, 255), filtered.pixel(4, 1).unwrap());
}

#[test]
fn transparent_pixels_draw_nothing() {
    let q = Raster::new(vec![RGBA::new(9, 9, 9, 0), RGBA::new(9, 9, 9, 255)], 2, 1).unwrap();
    let out = render_blocks(&q, (16, 8), (2, 1), 1., None, &BlockStyle::default()).unwrap();
    assert!(out.pixels().chunks(16).all(|row| row[..8].iter().all(|p| p.a == 0)));
    assert_eq!(RGBA::new(0, 0, 0, 255), out.pixel(8, 0).unwrap());
}

#[test]
fn clipped_and_validated() {
    let q = checker(3, 3, RGB::new(0, 0, 0), RGB::new(9, 9, 9));
    // block size round(10/3)=3 covers 9px of a 10px canvas; nothing panics at the edge
    let out = render_blocks(&q, (10, 10), (3, 3), 1., None, &BlockStyle::default()).unwrap();
    assert_eq!((10, 10), out.size());
    assert_eq!(0, out.pixel(9, 9).unwrap().a);
    // 7/2 rounds to 4, so blocks run past the 7px canvas and get clipped
    let out = render_blocks(&checker(2, 2, RGB::new(0, 0, 0), RGB::new(9, 9, 9)), (7, 7), (2, 2), 1., None, &BlockStyle::default()).unwrap();
    assert_eq!((7, 7), out.size());
    assert_eq!(Err(ValueOutOfRange), render_blocks(&q, (10, 10), (2, 3), 1., None, &BlockStyle::default()).map(|_| ()));
    assert_eq!(Err(ValueOutOfRange), render_blocks(&q, (10, 10), (3, 3), 0., None, &BlockStyle::default()).map(|_| ()));
}

#[test]
fn translucent_center() {
    assert_eq!(RGBA::new(1, 2, 3, 255), over(RGBA::new(1, 2, 3, 255), RGBA::new(9, 9, 9, 255)));
    assert_eq!(RGBA::new(9, 9, 9, 255), over(RGBA::new(1, 2, 3, 0), RGBA::new(9, 9, 9, 255)));
    let half = over(RGBA::new(255, 0, 0, 128), RGBA::new(0, 0, 255, 255));
    assert_eq!(255, half.a);
    assert!(half.r > 120 && half.r < 135 && half.b > 120 && half.b < 135);
}
