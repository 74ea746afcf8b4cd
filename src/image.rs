use crate::error::*;
use crate::pal::{RGB, RGBA};

/// Width×height grid of RGBA pixels, row-major, no padding between rows.
///
/// Alpha 0 means "nothing here": such pixels are never matched, counted or drawn.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) pixels: Box<[RGBA]>,
}

impl Raster {
    /// Takes ownership of `pixels`. Extra pixels past `width`×`height` are dropped.
    ///
    /// Zero width or height is `NotReady`: that's what a not-yet-decoded image looks like.
    pub fn new<VecRGBA>(pixels: VecRGBA, width: usize, height: usize) -> Result<Self, Error> where VecRGBA: Into<Vec<RGBA>> {
        let len = Self::check_image_size(width, height)?;
        let mut pixels = pixels.into();
        if pixels.len() < len {
            return Err(BufferTooSmall);
        }
        pixels.truncate(len);
        Ok(Self { width, height, pixels: pixels.into_boxed_slice() })
    }

    /// Like [`Raster::new`], but from `width`×`height`×4 bytes
    pub fn from_rgba_bytes(bytes: &[u8], width: usize, height: usize) -> Result<Self, Error> {
        let len = Self::check_image_size(width, height)?;
        if bytes.len() / 4 < len {
            return Err(BufferTooSmall);
        }
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len)?;
        pixels.extend(bytes.chunks_exact(4).take(len).map(|px| RGBA::new(px[0], px[1], px[2], px[3])));
        Self::new(pixels, width, height)
    }

    /// Fully transparent canvas
    pub fn transparent(width: usize, height: usize) -> Result<Self, Error> {
        let len = Self::check_image_size(width, height)?;
        Ok(Self { width, height, pixels: temp_buf(len, RGBA::new(0, 0, 0, 0))? })
    }

    /// Copy that reports allocation failure instead of aborting
    pub fn try_clone(&self) -> Result<Self, Error> {
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(self.pixels.len())?;
        pixels.extend_from_slice(&self.pixels);
        Ok(Self { width: self.width, height: self.height, pixels: pixels.into_boxed_slice() })
    }

    fn check_image_size(width: usize, height: usize) -> Result<usize, Error> {
        if width == 0 || height == 0 {
            return Err(NotReady);
        }
        if width.max(height) > i32::MAX as usize {
            return Err(ValueOutOfRange);
        }
        width.checked_mul(height)
            .filter(|&len| len <= isize::MAX as usize / std::mem::size_of::<RGBA>())
            .ok_or(ValueOutOfRange)
    }

    /// Width of the image in pixels
    #[must_use]
    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the image in pixels
    #[must_use]
    #[inline(always)]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    #[inline(always)]
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[must_use]
    #[inline(always)]
    pub fn pixels(&self) -> &[RGBA] {
        &self.pixels
    }

    #[must_use]
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Option<RGBA> {
        if x >= self.width {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    #[inline]
    pub fn rows(&self) -> impl Iterator<Item = &[RGBA]> {
        self.pixels.chunks_exact(self.width)
    }

    /// Number of pixels with non-zero alpha
    #[must_use]
    pub fn opaque_count(&self) -> usize {
        self.pixels.iter().filter(|px| px.a != 0).count()
    }

    #[must_use]
    pub fn into_pixels(self) -> Vec<RGBA> {
        self.pixels.into_vec()
    }
}

impl std::fmt::Debug for Raster {
    #[cold]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[inline(always)]
pub(crate) fn opaque_rgb(px: RGBA) -> Option<RGB> {
    if px.a == 0 { None } else { Some(RGB::new(px.r, px.g, px.b)) }
}

pub(crate) fn temp_buf<T: Copy>(len: usize, fill: T) -> Result<Box<[T]>, Error> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    v.resize(len, fill);
    Ok(v.into_boxed_slice())
}

#[test]
fn takes_rgba() {
    let img = vec![RGBA::new(0, 0, 0, 0); 8];

    Raster::new(&img[..], 1, 1).unwrap();
    Raster::new(&img[..], 4, 2).unwrap();
    Raster::new(&img[..], 8, 1).unwrap();
    assert_eq!(Err(BufferTooSmall), Raster::new(&img[..], 9, 1));
    assert_eq!(Err(BufferTooSmall), Raster::new(&img[..], 4, 3));
    assert_eq!(Err(NotReady), Raster::new(&img[..], 0, 3));
    assert_eq!(Err(NotReady), Raster::new(&img[..], 3, 0));
}

#[test]
fn from_bytes() {
    let bytes = [1, 2, 3, 4, 5, 6, 7, 0, 9];
    let r = Raster::from_rgba_bytes(&bytes, 2, 1).unwrap();
    assert_eq!(Some(RGBA::new(5, 6, 7, 0)), r.pixel(1, 0));
    assert_eq!(None, r.pixel(2, 0));
    assert_eq!(1, r.opaque_count());
    assert_eq!(Err(BufferTooSmall), Raster::from_rgba_bytes(&bytes, 3, 1));
}

#[test]
fn rows_and_transparent() {
    let r = Raster::transparent(3, 2).unwrap();
    assert_eq!(2, r.rows().count());
    assert!(r.rows().all(|row| row.len() == 3));
    assert_eq!(0, r.opaque_count());
    assert_eq!(None, opaque_rgb(r.pixels()[0]));
}
