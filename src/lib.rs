//! Turns an uploaded image into a palette-constrained pixel grid, for use as a placement guide.
//!
//! The image is downscaled with point sampling, every opaque pixel is replaced by the nearest
//! color of the selected palette, and the result is drawn as bordered blocks for an on-page overlay.
//!
//! ```rust,ignore
//! let attr = pixelguide::new();
//! let image = attr.decode_image(&pixelguide::PngCodec, &png_bytes)?;
//! let conversion = attr.convert(&image, &pixelguide::PaletteState::new().selected_palette())?;
//! let blocks = conversion.render_blocks(None)?;
//! ```
#![allow(clippy::bool_to_int_with_if)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

mod attr;
mod blocks;
mod codec;
mod error;
mod hist;
mod image;
mod nearest;
mod overlay;
mod pal;
mod quant;
mod remap;
mod scale;
mod selection;
mod session;

#[cfg(not(feature = "threads"))]
mod rayoff;

#[cfg(feature = "threads")]
mod rayoff {
    pub(crate) use rayon::prelude::{IndexedParallelIterator, ParallelIterator, ParallelSliceMut};
    pub(crate) use thread_local::ThreadLocal;
}

pub use attr::{Attributes, ControlFlow};
pub use blocks::{block_size, canvas_size, render_blocks, BlockStyle};
pub use codec::{data_url, decode_data_url, Codec, ImageCodec, PngCodec};
pub use error::Error;
pub use hist::{ColorCount, ColorCountEntry};
pub use crate::image::Raster;
pub use nearest::nearest;
pub use overlay::{AvailableColorsResponse, OverlayRequest, PREPARE_OVERLAY_ACTION};
pub use pal::{color_key, format_rgb, is_free, parse_rgb, try_parse_rgb, NamedColor, Palette, FREE_PALETTE, MAX_COLORS, RGB, RGBA, SITE_PALETTE};
pub use quant::{Conversion, PlacedPixel};
pub use remap::quantize;
pub use scale::{downscale, resample_nearest, scaled_dimensions, upscale};
pub use selection::{PaletteColor, PaletteState};
pub use session::{ConversionRequest, Session};

/// Start here: creates new handle for library configuration
///
/// See [`Attributes`]
#[inline(always)]
#[must_use]
pub fn new() -> Attributes {
    Attributes::new()
}

#[test]
fn new_image_copies_pixels() {
    let tmp = vec![RGBA::new(1, 2, 3, 4); 10 * 100];
    let attr = Attributes::new();
    let img = attr.new_image(&tmp[..], 10, 100).unwrap();
    assert_eq!(img.width(), 10);
    assert_eq!(img.height(), 100);
    assert_eq!(1000, img.opaque_count());
}

#[test]
fn not_ready_until_decoded() {
    let attr = new();
    assert_eq!(Err(Error::NotReady), attr.new_image(Vec::new(), 0, 0).map(|_| ()));
    assert_eq!(Err(Error::BufferTooSmall), attr.new_image(vec![RGBA::new(0, 0, 0, 0); 3], 2, 2).map(|_| ()));
}

#[test]
fn attributes_move_across_threads() {
    let attr = Attributes::new();
    std::thread::spawn(move || {
        let b = vec![RGBA::new(0, 0, 0, 0); 1];
        attr.new_image(&b[..], 1, 1).unwrap();
    }).join().unwrap();
}
