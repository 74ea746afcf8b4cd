use crate::attr::{Attributes, ControlFlow};
use crate::error::*;
use crate::image::Raster;
use crate::pal::Palette;
use crate::quant::Conversion;
use crate::selection::PaletteState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// State of the palette panel: the image, the settings, the palette, and the latest result.
///
/// Every change bumps a generation counter. Conversions run from a snapshot
/// ([`ConversionRequest`]) and are only committed if nothing changed in the meantime,
/// so a slow stale conversion can't overwrite a newer one.
pub struct Session {
    attr: Attributes,
    image: Option<Arc<Raster>>,
    palette: PaletteState,
    generation: Arc<AtomicU64>,
    latest: Option<Conversion>,
}

/// Immutable snapshot of everything one conversion needs
#[derive(Clone)]
pub struct ConversionRequest {
    attr: Attributes,
    image: Arc<Raster>,
    palette: Palette,
    generation: u64,
    current: Arc<AtomicU64>,
}

impl Session {
    #[must_use]
    pub fn new(attr: Attributes) -> Self {
        Self {
            attr,
            image: None,
            palette: PaletteState::new(),
            generation: Arc::new(AtomicU64::new(0)),
            latest: None,
        }
    }

    #[inline]
    fn bump(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Counter value the next request will carry
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attr
    }

    /// Replaces the source image. The previous result no longer applies and is dropped.
    pub fn set_image(&mut self, image: Raster) {
        self.bump();
        self.attr.verbose_print(format!("  new image {}x{}", image.width(), image.height()));
        self.image = Some(Arc::new(image));
        self.latest = None;
    }

    pub fn clear_image(&mut self) {
        self.bump();
        self.image = None;
        self.latest = None;
    }

    #[must_use]
    pub fn image(&self) -> Option<&Raster> {
        self.image.as_deref()
    }

    /// See [`Attributes::set_scale_percent`]
    pub fn set_scale_percent(&mut self, percent: f64) -> Result<(), Error> {
        self.attr.set_scale_percent(percent)?;
        self.bump();
        Ok(())
    }

    /// See [`Attributes::set_display_scale`]
    pub fn set_display_scale(&mut self, scale: f64) -> Result<(), Error> {
        self.attr.set_display_scale(scale)?;
        self.bump();
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn palette(&self) -> &PaletteState {
        &self.palette
    }

    /// See [`PaletteState::apply_available`]
    pub fn apply_available<S: AsRef<str>>(&mut self, available: &[S]) {
        self.palette.apply_available(available);
        self.bump();
    }

    /// See [`PaletteState::toggle`]
    pub fn toggle_color(&mut self, name: &str) -> Result<(), Error> {
        self.palette.toggle(name)?;
        self.bump();
        Ok(())
    }

    pub fn select_all(&mut self) {
        self.palette.select_all();
        self.bump();
    }

    pub fn deselect_all(&mut self) {
        self.palette.deselect_all();
        self.bump();
    }

    pub fn reset_to_free(&mut self) {
        self.palette.reset_to_free();
        self.bump();
    }

    /// Latest committed result
    #[must_use]
    pub fn latest(&self) -> Option<&Conversion> {
        self.latest.as_ref()
    }

    /// Snapshot for a conversion, or `None` while there's no image
    #[must_use]
    pub fn request(&self) -> Option<ConversionRequest> {
        let image = self.image.clone()?;
        Some(ConversionRequest {
            attr: self.attr.clone(),
            image,
            palette: self.palette.selected_palette(),
            generation: self.generation(),
            current: self.generation.clone(),
        })
    }

    /// Stores `conversion` if `request` is still current, and updates the palette's counts.
    ///
    /// Returns `false` and drops the result if the session changed after the request was made.
    pub fn commit(&mut self, request: &ConversionRequest, conversion: Conversion) -> bool {
        if !Arc::ptr_eq(&request.current, &self.generation) || request.generation != self.generation() {
            self.attr.verbose_print(format!("  discarding result of generation {}, now at {}", request.generation, self.generation()));
            return false;
        }
        self.palette.update_counts(conversion.color_counts());
        self.latest = Some(conversion);
        true
    }

    /// Converts the current image and commits the result.
    ///
    /// `Ok(false)` when there's no image to convert.
    pub fn refresh(&mut self) -> Result<bool, Error> {
        let Some(request) = self.request() else {
            return Ok(false);
        };
        let conversion = request.run()?;
        Ok(self.commit(&request, conversion))
    }
}

impl ConversionRequest {
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The session has changed since this snapshot was taken
    #[inline]
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.current.load(Ordering::Acquire) != self.generation
    }

    #[inline]
    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Runs the pipeline. Fails with `Aborted` between stages once the request is stale.
    pub fn run(&self) -> Result<Conversion, Error> {
        if self.is_stale() {
            return Err(Aborted);
        }
        let mut attr = self.attr.clone();
        let user_callback = attr.progress_callback.take();
        let current = self.current.clone();
        let generation = self.generation;
        attr.set_progress_callback(move |percent| {
            if current.load(Ordering::Acquire) != generation {
                return ControlFlow::Break;
            }
            user_callback.as_ref().map_or(ControlFlow::Continue, |f| f(percent))
        });
        attr.convert(&self.image, &self.palette)
    }
}

#[cfg(test)]
use crate::pal::RGBA;

#[cfg(test)]
fn session_with_image() -> Session {
    let px = vec![RGBA::new(250, 250, 250, 255), RGBA::new(5, 5, 5, 255), RGBA::new(0, 0, 0, 0), RGBA::new(240, 10, 10, 255)];
    let mut s = Session::new(Attributes::new());
    s.set_scale_percent(100.).unwrap();
    s.set_image(Raster::new(px, 2, 2).unwrap());
    s
}

#[test]
fn idle_without_image() {
    let mut s = Session::new(Attributes::new());
    assert!(s.request().is_none());
    assert_eq!(Ok(false), s.refresh());
    assert!(s.latest().is_none());
}

#[test]
fn refresh_commits_and_counts() {
    let mut s = session_with_image();
    assert_eq!(Ok(true), s.refresh());
    let latest = s.latest().unwrap();
    assert_eq!(3, latest.color_counts().total());
    assert_eq!(1, s.palette().get("White").unwrap().count());
    assert_eq!(1, s.palette().get("Black").unwrap().count());
    assert_eq!(1, s.palette().get("Red").unwrap().count());
}

#[test]
fn stale_results_are_dropped() {
    let mut s = session_with_image();
    let old = s.request().unwrap();
    let conv = old.run().unwrap();
    s.deselect_all();
    assert!(old.is_stale());
    assert!(!s.commit(&old, conv));
    assert!(s.latest().is_none());
    assert_eq!(Err(Aborted), old.run().map(|_| ()));

    let new = s.request().unwrap();
    assert!(new.generation() > old.generation());
    let conv = new.run().unwrap();
    assert!(s.commit(&new, conv));
    assert_eq!(3, s.palette().get("White").unwrap().count());
}

#[test]
fn abort_mid_conversion() {
    let s = session_with_image();
    let req = s.request().unwrap();
    let current = s.generation.clone();
    let mut attr = req.attr.clone();
    attr.set_progress_callback(move |p| {
        if p >= 30. {
            current.fetch_add(1, Ordering::AcqRel);
        }
        ControlFlow::Continue
    });
    let req = ConversionRequest { attr, ..req };
    assert_eq!(Err(Aborted), req.run().map(|_| ()));
}

#[test]
fn failed_toggle_keeps_generation() {
    let mut s = session_with_image();
    let g = s.generation();
    assert!(s.toggle_color("Teal").is_err());
    assert!(s.set_scale_percent(0.).is_err());
    assert_eq!(g, s.generation());
    s.toggle_color("Black").unwrap();
    assert_eq!(g + 1, s.generation());
}
