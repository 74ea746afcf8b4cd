#![feature(test)]

extern crate test;
use test::Bencher;

use pixelguide::*;

fn noise(width: usize, height: usize) -> Raster {
    let mut state = 0x2545_f491_u32;
    let px: Vec<_> = (0..width * height).map(|_| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, a] = state.to_le_bytes();
        RGBA::new(r, g, b, if a < 16 { 0 } else { 255 })
    }).collect();
    Raster::new(px, width, height).unwrap()
}

#[bench]
fn quantize_site_palette(b: &mut Bencher) {
    let img = noise(512, 512);
    let pal: Vec<_> = SITE_PALETTE.iter().filter_map(|c| c.rgb).collect();
    b.iter(move || {
        quantize(&img, &pal).unwrap()
    });
}

#[bench]
fn convert(b: &mut Bencher) {
    let img = noise(2000, 1500);
    let mut attr = new();
    attr.set_scale_percent(25.).unwrap();
    let pal = PaletteState::new().selected_palette();
    b.iter(move || {
        attr.convert(&img, &pal).unwrap()
    });
}

#[bench]
fn blocks(b: &mut Bencher) {
    let img = noise(1200, 800);
    let mut attr = new();
    attr.set_scale_percent(8.).unwrap();
    let conv = attr.convert(&img, &PaletteState::new().selected_palette()).unwrap();
    b.iter(move || {
        conv.render_blocks(Some(RGB::new(0, 0, 0))).unwrap()
    });
}

#[bench]
fn count_colors(b: &mut Bencher) {
    let img = noise(1024, 1024);
    b.iter(move || {
        ColorCount::from_raster(&img)
    });
}
