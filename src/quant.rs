use crate::attr::Attributes;
use crate::blocks::{block_size, render_blocks, BlockStyle};
use crate::codec::{data_url, Codec};
use crate::error::*;
use crate::hist::ColorCount;
use crate::image::{opaque_rgb, Raster};
use crate::overlay::{OverlayRequest, PREPARE_OVERLAY_ACTION};
use crate::pal::{format_rgb, Palette, RGB};
use crate::remap::quantize;
use crate::scale::{downscale, upscale};
use std::fmt;

/// One opaque pixel of the grid, for placing it on the site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedPixel {
    pub x: usize,
    pub y: usize,
    /// `rgb(R, G, B)`
    pub color: String,
}

/// Downscaled and quantized image, computed from [`Attributes::convert()`]
///
/// Keeps the pre-quantization downscale, so it can be matched against another palette
/// with [`Conversion::remap()`] without resampling the source.
#[derive(Clone)]
pub struct Conversion {
    original: (usize, usize),
    scale_percent: f64,
    display_scale: f64,
    block_style: BlockStyle,
    scaled: Raster,
    quantized: Raster,
    palette: Palette,
    counts: ColorCount,
}

impl Conversion {
    pub(crate) fn new(attr: &Attributes, image: &Raster, palette: &Palette) -> Result<Self, Error> {
        if attr.progress(0.) { return Err(Aborted); }

        let scaled = downscale(image, attr.scale_percent())?;
        attr.verbose_print(format!("  scaled {}x{} to {}x{} ({}%)", image.width(), image.height(), scaled.width(), scaled.height(), attr.scale_percent()));

        if attr.progress(30.) { return Err(Aborted); }

        Self::from_scaled(attr, image.size(), attr.scale_percent(), scaled, palette)
    }

    fn from_scaled(attr: &Attributes, original: (usize, usize), scale_percent: f64, scaled: Raster, palette: &Palette) -> Result<Self, Error> {
        if palette.is_empty() {
            attr.verbose_print("  warning: no colors selected, keeping original colors");
        }
        let (quantized, counts) = quantize(&scaled, palette)?;
        attr.verbose_print(format!("  {} opaque pixels in {} colors, palette has {}", counts.total(), counts.len(), palette.len()));

        if attr.progress(90.) { return Err(Aborted); }

        Ok(Self {
            original,
            scale_percent,
            display_scale: attr.display_scale(),
            block_style: attr.block_style(),
            scaled,
            quantized,
            palette: palette.clone(),
            counts,
        })
    }

    /// Matches the same downscaled image against a different palette.
    ///
    /// Display scale and block style are taken from `attr`; the grid size is kept.
    pub fn remap(&self, attr: &Attributes, palette: &Palette) -> Result<Self, Error> {
        if attr.progress(30.) { return Err(Aborted); }
        let scaled = self.scaled.try_clone()?;
        Self::from_scaled(attr, self.original, self.scale_percent, scaled, palette)
    }

    /// Width×height of the source image
    #[inline]
    #[must_use]
    pub fn original_size(&self) -> (usize, usize) {
        self.original
    }

    /// Width×height of the pixel grid
    #[inline]
    #[must_use]
    pub fn scaled_size(&self) -> (usize, usize) {
        self.scaled.size()
    }

    #[inline]
    #[must_use]
    pub fn scale_percent(&self) -> f64 {
        self.scale_percent
    }

    #[inline]
    #[must_use]
    pub fn display_scale(&self) -> f64 {
        self.display_scale
    }

    /// The downscaled image before palette matching
    #[inline]
    #[must_use]
    pub fn scaled(&self) -> &Raster {
        &self.scaled
    }

    /// The grid with every opaque pixel replaced by its nearest palette color
    #[inline]
    #[must_use]
    pub fn quantized(&self) -> &Raster {
        &self.quantized
    }

    /// Colors the image was matched against
    #[inline]
    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Pixels per color in [`Conversion::quantized()`]
    #[inline]
    #[must_use]
    pub fn color_counts(&self) -> &ColorCount {
        &self.counts
    }

    /// Side of one rendered block, in pixels of the block canvas
    #[must_use]
    pub fn block_size(&self) -> usize {
        block_size(self.original.0, self.scaled.width(), self.display_scale)
    }

    /// Block view of the grid at display scale. See [`crate::render_blocks`].
    ///
    /// With `color_filter`, only blocks of that color keep their colored center.
    pub fn render_blocks(&self, color_filter: Option<RGB>) -> Result<Raster, Error> {
        render_blocks(&self.quantized, self.original, self.scaled.size(), self.display_scale, color_filter, &self.block_style)
    }

    /// Flat preview of the grid at the source image's size
    pub fn upscaled(&self) -> Result<Raster, Error> {
        upscale(&self.quantized, self.original.0, self.original.1)
    }

    /// Every opaque grid pixel with its color, row by row
    #[must_use]
    pub fn placed_pixels(&self) -> Vec<PlacedPixel> {
        self.quantized.rows().enumerate().flat_map(|(y, row)| {
            row.iter().enumerate().filter_map(move |(x, &px)| {
                opaque_rgb(px).map(|c| PlacedPixel { x, y, color: format_rgb(c) })
            })
        }).collect()
    }

    /// Message for the page overlay, with every raster encoded by `codec`
    pub fn overlay_request(&self, codec: &dyn Codec) -> Result<OverlayRequest, Error> {
        Ok(OverlayRequest {
            action: PREPARE_OVERLAY_ACTION.into(),
            pixel_art_data_url: data_url(codec, &self.upscaled()?)?,
            scaled_image_data_url: data_url(codec, &self.quantized)?,
            unscaled_image_data_url: data_url(codec, &self.scaled)?,
            pixel_scale: self.scale_percent,
            palette: self.palette.to_triples(),
            original_image_width: self.original.0,
            original_image_height: self.original.1,
        })
    }
}

impl fmt::Debug for Conversion {
    #[cold]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversion")
            .field("original", &self.original)
            .field("scaled", &self.scaled.size())
            .field("scale_percent", &self.scale_percent)
            .field("palette", &self.palette.len())
            .field("counts", &self.counts)
            .finish()
    }
}

#[cfg(test)]
use crate::pal::RGBA;

#[cfg(test)]
fn checker(width: usize, height: usize) -> Raster {
    let px: Vec<_> = (0..width * height).map(|i| {
        let (x, y) = (i % width, i / width);
        if (x / 2 + y / 2) % 2 == 0 { RGBA::new(250, 20, 20, 255) } else { RGBA::new(20, 20, 250, 255) }
    }).collect();
    Raster::new(px, width, height).unwrap()
}

#[test]
fn convert_and_count() {
    let mut attr = Attributes::new();
    attr.set_scale_percent(50.).unwrap();
    let img = checker(8, 6);
    let pal = Palette::from_colors(&[RGB::new(255, 0, 0), RGB::new(0, 0, 255)]).unwrap();
    let conv = attr.convert(&img, &pal).unwrap();
    assert_eq!((8, 6), conv.original_size());
    assert_eq!((4, 3), conv.scaled_size());
    assert_eq!(12, conv.color_counts().total());
    assert!(conv.color_counts().out_of_palette(&pal).is_empty());
    assert_eq!(2, conv.block_size());
    assert_eq!((8, 6), conv.render_blocks(None).unwrap().size());

    let up = conv.upscaled().unwrap();
    assert_eq!((8, 6), up.size());
    assert_eq!(RGBA::new(255, 0, 0, 255), up.pixels()[0]);
}

#[test]
fn remap_keeps_grid() {
    let mut attr = Attributes::new();
    attr.set_scale_percent(50.).unwrap();
    let img = checker(8, 8);
    let conv = attr.convert(&img, &Palette::from_colors(&[RGB::new(0, 0, 0)]).unwrap()).unwrap();
    assert_eq!(16, conv.color_counts().get(RGB::new(0, 0, 0)));

    let white = Palette::from_colors(&[RGB::new(255, 255, 255)]).unwrap();
    let again = conv.remap(&attr, &white).unwrap();
    assert_eq!(conv.scaled(), again.scaled());
    assert_eq!(16, again.color_counts().get(RGB::new(255, 255, 255)));
    assert_eq!(white.as_slice(), again.palette().as_slice());
}

#[test]
fn placed_pixels_skip_transparent() {
    let px = vec![RGBA::new(0, 0, 0, 255), RGBA::new(0, 0, 0, 0), RGBA::new(0, 0, 0, 0), RGBA::new(255, 255, 255, 9)];
    let img = Raster::new(px, 2, 2).unwrap();
    let mut attr = Attributes::new();
    attr.set_scale_percent(100.).unwrap();
    let conv = attr.convert(&img, &Palette::new()).unwrap();
    assert_eq!(vec![
        PlacedPixel { x: 0, y: 0, color: "rgb(0, 0, 0)".into() },
        PlacedPixel { x: 1, y: 1, color: "rgb(255, 255, 255)".into() },
    ], conv.placed_pixels());
}

#[test]
fn log_reports_without_errors() {
    use std::sync::{Arc, Mutex};
    let lines = Arc::new(Mutex::new(Vec::<String>::new()));
    let mut attr = Attributes::new();
    let l2 = lines.clone();
    attr.set_log_callback(move |_, msg| l2.lock().unwrap().push(msg.to_string()));
    attr.set_scale_percent(50.).unwrap();
    let pal = Palette::from_colors(&[RGB::new(0, 0, 0)]).unwrap();
    let conv = attr.convert(&checker(8, 8), &pal).unwrap();
    assert!(conv.color_counts().out_of_palette(&pal).is_empty());
    conv.remap(&attr, &Palette::from_colors(&[RGB::new(255, 255, 255)]).unwrap()).unwrap();

    let lines = lines.lock().unwrap();
    assert_eq!(3, lines.len());
    assert!(lines[0].contains("scaled 8x8 to 4x4"));
    assert!(lines[1].contains("16 opaque pixels in 1 colors"));
    assert!(lines.iter().all(|l| !l.contains("error")), "{lines:?}");
}

#[test]
fn overlay_request_carries_every_stage() {
    use crate::codec::{decode_data_url, PngCodec};
    let mut attr = Attributes::new();
    attr.set_scale_percent(50.).unwrap();
    let conv = attr.convert(&checker(8, 6), &Palette::from_colors(&[RGB::new(0, 0, 0)]).unwrap()).unwrap();
    let req = conv.overlay_request(&PngCodec).unwrap();
    assert_eq!("prepareForOverlayPlacement", req.action);
    assert_eq!((8, 6), (req.original_image_width, req.original_image_height));
    assert_eq!(50., req.pixel_scale);
    assert_eq!(vec![[0, 0, 0]], req.palette);

    let grid = decode_data_url(&PngCodec, &req.scaled_image_data_url).unwrap();
    assert_eq!(conv.quantized(), &grid);
    assert_eq!(RGBA::new(0, 0, 0, 255), grid.pixels()[0]);
    let before = decode_data_url(&PngCodec, &req.unscaled_image_data_url).unwrap();
    assert_eq!(conv.scaled(), &before);
    assert_eq!(RGBA::new(250, 20, 20, 255), before.pixels()[0]);
    let art = decode_data_url(&PngCodec, &req.pixel_art_data_url).unwrap();
    assert_eq!(conv.upscaled().unwrap(), art);
    assert_eq!((8, 6), art.size());
}

#[test]
fn abort_between_stages() {
    use crate::attr::ControlFlow;
    let mut attr = Attributes::new();
    attr.set_progress_callback(|p| if p >= 30. { ControlFlow::Break } else { ControlFlow::Continue });
    assert_eq!(Err(Aborted), attr.convert(&checker(4, 4), &Palette::new()).map(|_| ()));
}
