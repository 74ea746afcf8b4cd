use crate::blocks::BlockStyle;
use crate::codec::Codec;
use crate::error::Error;
use crate::image::Raster;
use crate::pal::{Palette, RGBA};
use crate::quant::Conversion;
use std::sync::Arc;

/// Settings for converting images, and the entry point of the pipeline
#[derive(Clone)]
pub struct Attributes {
    scale_percent: f64,
    display_scale: f64,
    pub(crate) block_style: BlockStyle,

    pub(crate) progress_callback: Option<Arc<dyn Fn(f32) -> ControlFlow + Send + Sync>>,
    log_callback: Option<Arc<dyn Fn(&Attributes, &str) + Send + Sync>>,
    log_flush_callback: Option<Arc<dyn Fn(&Attributes) + Send + Sync>>,
}

impl Attributes {
    /// Defaults: 8% grid, blocks at source size, no callbacks
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            scale_percent: 8.,
            display_scale: 1.,
            block_style: BlockStyle::default(),
            progress_callback: None,
            log_callback: None,
            log_flush_callback: None,
        }
    }

    /// Wraps already-decoded pixels, `Vec<RGBA>` or `&[RGBA]`. See [`Raster::new`].
    #[inline]
    pub fn new_image<VecRGBA>(&self, pixels: VecRGBA, width: usize, height: usize) -> Result<Raster, Error> where VecRGBA: Into<Vec<RGBA>> {
        Raster::new(pixels, width, height)
    }

    /// Decode an uploaded file
    pub fn decode_image(&self, codec: &dyn Codec, bytes: &[u8]) -> Result<Raster, Error> {
        let img = codec.decode_image(bytes).map_err(|e| {
            self.verbose_print(format!("  error: can't decode {} bytes as {}: {e}", bytes.len(), codec.mime_type()));
            e
        })?;
        self.verbose_print(format!("  decoded {}x{} image", img.width(), img.height()));
        Ok(img)
    }

    /// Downscale, remap onto `palette`, and count colors.
    ///
    /// An empty palette is allowed; colors are then left as they are.
    pub fn convert(&self, image: &Raster, palette: &Palette) -> Result<Conversion, Error> {
        Conversion::new(self, image, palette)
    }

    /// Size of the working grid as a percentage of the source image, in (0, 100].
    ///
    /// The UI usually offers 1-50. The default is 8.
    pub fn set_scale_percent(&mut self, percent: f64) -> Result<(), Error> {
        if !(percent > 0. && percent <= 100.) {
            return Err(Error::ValueOutOfRange);
        }
        if percent < 1. {
            self.verbose_print("  warning: scale below 1%, most images will collapse to a few pixels");
        }
        self.scale_percent = percent;
        Ok(())
    }

    /// Multiplier from original image size to block canvas size. Must be finite and positive.
    ///
    /// The default is 1.
    pub fn set_display_scale(&mut self, scale: f64) -> Result<(), Error> {
        if !(scale.is_finite() && scale > 0.) {
            return Err(Error::ValueOutOfRange);
        }
        self.display_scale = scale;
        Ok(())
    }

    /// Border and padding colors of rendered blocks
    #[inline]
    pub fn set_block_style(&mut self, style: BlockStyle) {
        self.block_style = style;
    }

    #[inline(always)]
    #[must_use]
    pub fn scale_percent(&self) -> f64 {
        self.scale_percent
    }

    #[inline(always)]
    #[must_use]
    pub fn display_scale(&self) -> f64 {
        self.display_scale
    }

    #[inline(always)]
    #[must_use]
    pub fn block_style(&self) -> BlockStyle {
        self.block_style
    }

    /// Receives the pipeline's diagnostics: chosen grid size and colors found.
    ///
    /// Without a callback they go to [`log::debug!`]. Installing one flushes the previous sink first.
    #[inline]
    pub fn set_log_callback<F>(&mut self, callback: F) where F: Fn(&Attributes, &str) + Send + Sync + 'static {
        self.flush_log();
        self.log_callback = Some(Arc::new(callback));
    }

    /// Called when buffered diagnostics should be written out, and when the handle is dropped
    #[inline]
    pub fn set_log_flush_callback<F>(&mut self, callback: F) where F: Fn(&Attributes) + Send + Sync + 'static {
        self.flush_log();
        self.log_flush_callback = Some(Arc::new(callback));
    }

    /// Called with 0-100 between the downscale, palette matching and counting stages.
    ///
    /// Returning [`ControlFlow::Break`] stops the conversion with `Error::Aborted`.
    #[inline]
    pub fn set_progress_callback<F>(&mut self, callback: F) where F: Fn(f32) -> ControlFlow + Send + Sync + 'static {
        self.progress_callback = Some(Arc::new(callback));
    }

    /// `true` means stop
    #[inline]
    #[must_use]
    pub(crate) fn progress(&self, percent: f32) -> bool {
        self.progress_callback.as_ref().map_or(false, |cb| cb(percent) == ControlFlow::Break)
    }

    pub(crate) fn verbose_print(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        match &self.log_callback {
            Some(cb) => cb(self, msg),
            None => log::debug!("{}", msg.trim_start()),
        }
    }

    #[inline]
    pub(crate) fn flush_log(&self) {
        if let Some(cb) = &self.log_flush_callback {
            cb(self);
        }
    }
}

impl Drop for Attributes {
    fn drop(&mut self) {
        self.flush_log();
    }
}

impl Default for Attributes {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

/// Answer of the [`Attributes::set_progress_callback`] callback
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ControlFlow {
    /// Go on with the next stage
    Continue = 1,
    /// Drop the conversion
    Break = 0,
}

#[test]
fn getset() {
    let mut a = Attributes::new();
    assert_eq!(8., a.scale_percent());
    assert_eq!(1., a.display_scale());
    a.set_scale_percent(50.).unwrap();
    assert_eq!(50., a.scale_percent());
    a.set_scale_percent(0.5).unwrap();
    a.set_scale_percent(100.).unwrap();
    assert!(a.set_scale_percent(0.).is_err());
    assert!(a.set_scale_percent(100.01).is_err());
    assert!(a.set_scale_percent(f64::NAN).is_err());
    assert_eq!(100., a.scale_percent());

    a.set_display_scale(0.25).unwrap();
    assert_eq!(0.25, a.display_scale());
    assert!(a.set_display_scale(0.).is_err());
    assert!(a.set_display_scale(f64::INFINITY).is_err());

    let style = BlockStyle { center_alpha: 128, ..BlockStyle::default() };
    a.set_block_style(style);
    assert_eq!(style, a.block_style());
}

#[test]
fn log_callback() {
    use std::sync::Mutex;
    let lines = Arc::new(Mutex::new(Vec::new()));
    let mut a = Attributes::new();
    let l2 = lines.clone();
    a.set_log_callback(move |_, msg| l2.lock().unwrap().push(msg.to_string()));
    a.set_scale_percent(0.5).unwrap();
    assert_eq!(1, lines.lock().unwrap().len());
    assert!(lines.lock().unwrap()[0].contains("warning"));
}

#[test]
fn progress_abort() {
    let mut a = Attributes::new();
    assert!(!a.progress(10.));
    a.set_progress_callback(|p| if p > 50. { ControlFlow::Break } else { ControlFlow::Continue });
    assert!(!a.progress(10.));
    assert!(a.progress(60.));
}
