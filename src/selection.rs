use crate::error::*;
use crate::hist::ColorCount;
use crate::pal::{is_free, try_parse_rgb, NamedColor, Palette, RGB, SITE_PALETTE};

/// One swatch of the palette panel
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PaletteColor {
    color: NamedColor,
    available: bool,
    selected: bool,
    count: u32,
}

impl PaletteColor {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.color.name
    }

    /// `None` for the transparent pseudo-color
    #[inline]
    #[must_use]
    pub fn rgb(&self) -> Option<RGB> {
        self.color.rgb
    }

    /// Unlocked on the site (or free when the site couldn't be asked)
    #[inline]
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available
    }

    #[inline]
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Pixels of this color in the latest conversion
    #[inline]
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Available or free. Only these can be selected.
    #[inline]
    fn is_selectable(&self) -> bool {
        self.color.rgb.map_or(false, |c| self.available || is_free(c))
    }
}

/// The site palette split into available and selected colors.
///
/// Selected colors are always a subset of the available and free ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteState {
    colors: [PaletteColor; 64],
}

impl PaletteState {
    /// Free colors available and selected, as before the site has been asked
    #[must_use]
    pub fn new() -> Self {
        Self {
            colors: SITE_PALETTE.map(|color| {
                let free = color.rgb.map_or(false, is_free);
                PaletteColor { color, available: free, selected: free, count: 0 }
            }),
        }
    }

    /// Applies the colors the site reported as unlocked, as `rgb(R, G, B)` strings.
    ///
    /// Listed colors become available and selected, all others neither.
    /// An empty list means the site couldn't tell, and free colors are used instead.
    /// Strings that aren't colors are skipped.
    pub fn apply_available<S: AsRef<str>>(&mut self, available: &[S]) {
        if available.is_empty() {
            for c in &mut self.colors {
                let free = c.color.rgb.map_or(false, is_free);
                c.available = free;
                c.selected = free;
            }
            return;
        }
        let listed: Vec<RGB> = available.iter().filter_map(|s| try_parse_rgb(s.as_ref())).collect();
        for c in &mut self.colors {
            let on = c.color.rgb.map_or(false, |rgb| listed.contains(&rgb));
            c.available = on;
            c.selected = on;
        }
    }

    /// Selects exactly the free colors. Availability is left alone.
    pub fn reset_to_free(&mut self) {
        for c in &mut self.colors {
            c.selected = c.color.rgb.map_or(false, is_free);
        }
    }

    /// Flips selection of the color called `name`.
    ///
    /// Unknown names, the transparent pseudo-color, and locked non-free colors are `ValueOutOfRange`.
    pub fn toggle(&mut self, name: &str) -> Result<(), Error> {
        let c = self.colors.iter_mut().find(|c| c.color.name == name).ok_or(ValueOutOfRange)?;
        if !c.selected && !c.is_selectable() {
            return Err(ValueOutOfRange);
        }
        c.selected = !c.selected;
        Ok(())
    }

    /// Selects every selectable color
    pub fn select_all(&mut self) {
        for c in &mut self.colors {
            c.selected = c.is_selectable();
        }
    }

    /// Deselects everything except White, so that matching still has a color to use
    pub fn deselect_all(&mut self) {
        for c in &mut self.colors {
            c.selected = c.color.name == "White";
        }
    }

    /// Whether there's nothing left for [`PaletteState::select_all`] to do
    #[must_use]
    pub fn all_selected(&self) -> bool {
        self.colors.iter().all(|c| c.selected || !c.is_selectable())
    }

    /// Selected colors in site order
    #[must_use]
    pub fn selected_palette(&self) -> Palette {
        let mut pal = Palette::new();
        for rgb in self.colors.iter().filter(|c| c.selected).filter_map(|c| c.color.rgb) {
            // the site palette is far below the palette limit
            let _ = pal.push(rgb);
        }
        pal
    }

    /// Takes counts from the latest conversion. Colors not in it get 0.
    pub fn update_counts(&mut self, counts: &ColorCount) {
        for c in &mut self.colors {
            c.count = c.color.rgb.map_or(0, |rgb| counts.get(rgb));
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PaletteColor> {
        self.colors.iter().find(|c| c.color.name == name)
    }

    /// In site order, including the transparent pseudo-color
    pub fn iter(&self) -> impl Iterator<Item = &PaletteColor> {
        self.colors.iter()
    }
}

impl Default for PaletteState {
    fn default() -> Self {
        Self::new()
    }
}

#[test]
fn starts_free() {
    let s = PaletteState::new();
    let free = crate::pal::FREE_PALETTE.iter().filter(|&&c| SITE_PALETTE.iter().any(|n| n.rgb == Some(c))).count();
    assert_eq!(free, s.selected_palette().len());
    assert!(s.iter().all(|c| c.is_selected() == c.is_available()));
    assert!(s.get("White").unwrap().is_selected());
    assert!(!s.get("Teal").unwrap().is_selected());
    assert!(s.all_selected());
}

#[test]
fn available_from_site() {
    let mut s = PaletteState::new();
    s.apply_available(&["rgb(0, 0, 0)", "rgb(16, 174, 166)", "garbage"]);
    assert!(s.get("Teal").unwrap().is_available());
    assert!(!s.get("White").unwrap().is_available());
    assert_eq!(vec![RGB::new(0, 0, 0), RGB::new(16, 174, 166)], s.selected_palette().as_slice());

    // White is free, so it can still be picked
    s.toggle("White").unwrap();
    assert!(s.get("White").unwrap().is_selected());
    assert!(!s.all_selected());
    s.select_all();
    assert!(s.all_selected());
    assert!(s.selected_palette().contains(RGB::new(255, 255, 255)));

    s.apply_available::<&str>(&[]);
    assert_eq!(PaletteState::new(), s);
}

#[test]
fn toggle_rules() {
    let mut s = PaletteState::new();
    assert_eq!(Err(ValueOutOfRange), s.toggle("Teal"));
    assert_eq!(Err(ValueOutOfRange), s.toggle("Transparent"));
    assert_eq!(Err(ValueOutOfRange), s.toggle("Nope"));
    s.toggle("Black").unwrap();
    assert!(!s.get("Black").unwrap().is_selected());
    s.toggle("Black").unwrap();
    assert!(s.get("Black").unwrap().is_selected());
}

#[test]
fn deselect_and_reset() {
    let mut s = PaletteState::new();
    s.deselect_all();
    assert_eq!(&[RGB::new(255, 255, 255)], s.selected_palette().as_slice());
    s.reset_to_free();
    assert_eq!(PaletteState::new().selected_palette(), s.selected_palette());
}

#[test]
fn counts() {
    let mut c = ColorCount::new();
    c.add_color(RGB::new(0, 0, 0), 5);
    let mut s = PaletteState::new();
    s.update_counts(&c);
    assert_eq!(5, s.get("Black").unwrap().count());
    assert_eq!(0, s.get("White").unwrap().count());
    assert_eq!(0, s.get("Transparent").unwrap().count());
}
