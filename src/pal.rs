use crate::error::Error;
use arrayvec::ArrayVec;
use std::fmt::Write;
use std::ops::Deref;

/// 8-bit RGBA in sRGB. Rasters are made of these.
pub type RGBA = rgb::RGBA<u8>;

/// Palette colors have no alpha. Matching and counting only ever look at RGB.
pub type RGB = rgb::RGB<u8>;

/// Palettes are stored inline, and the site palette is far below this
pub const MAX_COLORS: usize = 256;

/// The working set of colors eligible for matching, in palette order.
///
/// Order matters: ties in [`nearest`](crate::nearest) resolve to the later entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Palette {
    colors: ArrayVec<RGB, MAX_COLORS>,
}

impl Palette {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { colors: ArrayVec::new() }
    }

    /// Fails with `Unsupported` if there are more than [`MAX_COLORS`]
    pub fn from_colors(colors: &[RGB]) -> Result<Self, Error> {
        let mut pal = Self::new();
        for &c in colors {
            pal.push(c)?;
        }
        Ok(pal)
    }

    /// Duplicates are kept. They can't change the outcome of matching.
    #[inline]
    pub fn push(&mut self, color: RGB) -> Result<(), Error> {
        self.colors.try_push(color).map_err(|_| Error::Unsupported)
    }

    #[inline(always)]
    #[must_use]
    pub fn as_slice(&self) -> &[RGB] {
        &self.colors
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, color: RGB) -> bool {
        self.colors.contains(&color)
    }

    /// `[[r, g, b], …]`, the shape the overlay script expects
    #[must_use]
    pub fn to_triples(&self) -> Vec<[u8; 3]> {
        self.colors.iter().map(|c| [c.r, c.g, c.b]).collect()
    }
}

impl Deref for Palette {
    type Target = [RGB];

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

/// An entry of the target site's palette
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NamedColor {
    pub name: &'static str,
    /// `None` only for the "Transparent" pseudo-color, which never takes part in matching
    pub rgb: Option<RGB>,
}

const fn named(name: &'static str, r: u8, g: u8, b: u8) -> NamedColor {
    NamedColor { name, rgb: Some(RGB { r, g, b }) }
}

const fn rgb(r: u8, g: u8, b: u8) -> RGB {
    RGB { r, g, b }
}

/// Every color the site offers, in the order of its color picker
pub const SITE_PALETTE: [NamedColor; 64] = [
    named("Black", 0, 0, 0),
    named("Dark Gray", 60, 60, 60),
    named("Gray", 120, 120, 120),
    named("Medium Gray", 170, 170, 170),
    named("Light Gray", 210, 210, 210),
    named("White", 255, 255, 255),
    named("Deep Red", 96, 0, 24),
    named("Dark Red", 165, 14, 30),
    named("Red", 237, 28, 36),
    named("Light Red", 250, 128, 114),
    named("Dark Orange", 228, 92, 26),
    named("Orange", 255, 127, 39),
    named("Gold", 246, 170, 9),
    named("Yellow", 249, 221, 59),
    named("Light Yellow", 255, 250, 188),
    named("Dark Goldenrod", 156, 132, 49),
    named("Goldenrod", 197, 173, 49),
    named("Light Goldenrod", 232, 212, 95),
    named("Dark Olive", 74, 107, 58),
    named("Olive", 90, 148, 74),
    named("Light Olive", 132, 197, 115),
    named("Dark Green", 14, 185, 104),
    named("Green", 19, 230, 123),
    named("Light Green", 135, 255, 94),
    named("Dark Teal", 12, 129, 110),
    named("Teal", 16, 174, 166),
    named("Light Teal", 19, 225, 190),
    named("Dark Cyan", 15, 121, 159),
    named("Cyan", 96, 247, 242),
    named("Light Cyan", 187, 250, 242),
    named("Dark Blue", 40, 80, 158),
    named("Blue", 64, 147, 228),
    named("Light Blue", 125, 199, 255),
    named("Dark Indigo", 77, 49, 184),
    named("Indigo", 107, 80, 246),
    named("Light Indigo", 153, 177, 251),
    named("Dark Slate Blue", 74, 66, 132),
    named("Slate Blue", 122, 113, 196),
    named("Light Slate Blue", 181, 174, 241),
    named("Dark Purple", 120, 12, 153),
    named("Purple", 170, 56, 185),
    named("Light Purple", 224, 159, 249),
    named("Dark Pink", 203, 0, 122),
    named("Pink", 236, 31, 128),
    named("Light Pink", 243, 141, 169),
    named("Dark Peach", 155, 82, 73),
    named("Peach", 209, 128, 120),
    named("Light Peach", 250, 182, 164),
    named("Dark Brown", 104, 70, 52),
    named("Brown", 149, 104, 42),
    named("Light Brown", 219, 164, 99),
    named("Dark Tan", 123, 99, 82),
    named("Tan", 156, 132, 107),
    named("Light Tan", 214, 181, 148),
    named("Dark Beige", 209, 128, 81),
    named("Beige", 248, 178, 119),
    named("Light Beige", 255, 197, 165),
    named("Dark Stone", 109, 100, 63),
    named("Stone", 148, 140, 107),
    named("Light Stone", 205, 197, 158),
    named("Dark Slate", 51, 57, 65),
    named("Slate", 109, 117, 141),
    named("Light Slate", 179, 185, 209),
    NamedColor { name: "Transparent", rgb: None },
];

/// Colors usable without unlocking anything on the site.
///
/// Note the teal here is not the named "Teal" above. Membership is by exact RGB, so named Teal isn't free.
pub const FREE_PALETTE: [RGB; 31] = [
    rgb(0, 0, 0),
    rgb(60, 60, 60),
    rgb(120, 120, 120),
    rgb(210, 210, 210),
    rgb(255, 255, 255),
    rgb(96, 0, 24),
    rgb(237, 28, 36),
    rgb(255, 127, 39),
    rgb(246, 170, 9),
    rgb(249, 221, 59),
    rgb(255, 250, 188),
    rgb(14, 185, 104),
    rgb(19, 230, 123),
    rgb(135, 255, 94),
    rgb(12, 129, 110),
    rgb(16, 174, 130),
    rgb(19, 225, 190),
    rgb(96, 247, 242),
    rgb(40, 80, 158),
    rgb(64, 147, 228),
    rgb(107, 80, 246),
    rgb(153, 177, 251),
    rgb(120, 12, 153),
    rgb(170, 56, 185),
    rgb(224, 159, 249),
    rgb(203, 0, 122),
    rgb(236, 31, 128),
    rgb(243, 141, 169),
    rgb(104, 70, 52),
    rgb(149, 104, 42),
    rgb(248, 178, 119),
];

#[inline]
#[must_use]
pub fn is_free(color: RGB) -> bool {
    FREE_PALETTE.contains(&color)
}

/// Canonical boundary format: `rgb(R, G, B)`
#[must_use]
pub fn format_rgb(color: RGB) -> String {
    let mut s = String::with_capacity(18);
    let _ = write!(s, "rgb({}, {}, {})", color.r, color.g, color.b);
    s
}

/// Tally key, `r,g,b`
#[must_use]
pub fn color_key(color: RGB) -> String {
    let mut s = String::with_capacity(11);
    let _ = write!(s, "{},{},{}", color.r, color.g, color.b);
    s
}

/// Parses `rgb(R, G, B)` anywhere in the string. Malformed input gives black.
#[must_use]
pub fn parse_rgb(s: &str) -> RGB {
    try_parse_rgb(s).unwrap_or_default()
}

/// Strict variant of [`parse_rgb`].
///
/// Accepts `rgb(` digits `,` optional whitespace digits `,` optional whitespace digits `)`,
/// searching from the left. Channels above 255 are clamped.
#[must_use]
pub fn try_parse_rgb(s: &str) -> Option<RGB> {
    let bytes = s.as_bytes();
    let mut start = 0;
    while let Some(pos) = s.get(start..)?.find("rgb(") {
        let at = start + pos + 4;
        if let Some(c) = parse_channels(&bytes[at..]) {
            return Some(c);
        }
        start = at;
    }
    None
}

fn parse_channels(mut s: &[u8]) -> Option<RGB> {
    let mut ch = [0u8; 3];
    for (i, out) in ch.iter_mut().enumerate() {
        if i > 0 {
            s = s.strip_prefix(b",")?;
            while let [first, rest @ ..] = s {
                if !first.is_ascii_whitespace() {
                    break;
                }
                s = rest;
            }
        }
        let digits = s.iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        let value = s[..digits].iter().fold(0u32, |acc, &d| acc.saturating_mul(10).saturating_add(u32::from(d - b'0')));
        *out = value.min(255) as u8;
        s = &s[digits..];
    }
    s.strip_prefix(b")")?;
    Some(rgb(ch[0], ch[1], ch[2]))
}

#[test]
fn parse_and_format() {
    let c = rgb(237, 28, 36);
    assert_eq!("rgb(237, 28, 36)", format_rgb(c));
    assert_eq!(c, parse_rgb(&format_rgb(c)));
    assert_eq!(c, parse_rgb("rgb(237,28,36)"));
    assert_eq!(c, parse_rgb("background: rgb(237,\t28,  36);"));
    assert_eq!(rgb(255, 0, 1), parse_rgb("rgb(999, 0, 1)"));
    assert_eq!("237,28,36", color_key(c));
}

#[test]
fn malformed_is_black() {
    for bad in ["", "undefined", "rgb(1 ,2,3)", "rgb( 1,2,3)", "rgb(1,2)", "rgba(1,2,3,4)", "rgb(1,2,3"] {
        assert_eq!(None, try_parse_rgb(bad), "{bad}");
        assert_eq!(RGB::default(), parse_rgb(bad));
    }
    // a later well-formed occurrence still counts
    assert_eq!(Some(rgb(4, 5, 6)), try_parse_rgb("rgb(x) rgb(4, 5, 6)"));
}

#[test]
fn site_palette() {
    let transparent = SITE_PALETTE.iter().filter(|c| c.rgb.is_none()).count();
    assert_eq!(1, transparent);
    for free in FREE_PALETTE {
        let name = SITE_PALETTE.iter().find(|c| c.rgb == Some(free)).map(|c| c.name);
        assert!(name.is_some() || free == rgb(16, 174, 130), "{free:?}");
    }
    assert!(is_free(rgb(255, 255, 255)));
    assert!(!is_free(rgb(16, 174, 166)));
}

#[test]
fn palette_limits() {
    let mut p = Palette::new();
    for i in 0..MAX_COLORS {
        p.push(rgb(i as u8, 0, 0)).unwrap();
    }
    assert_eq!(Err(Error::Unsupported), p.push(rgb(1, 2, 3)));
    assert!(p.contains(rgb(7, 0, 0)));
    assert_eq!([7, 0, 0], p.to_triples()[7]);
}
