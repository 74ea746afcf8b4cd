use crate::image::{opaque_rgb, Raster};
use crate::pal::{color_key, format_rgb, RGB};
use std::collections::HashMap;

/// Number of pixels of a given color in a quantized raster
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ColorCountEntry {
    pub color: RGB,
    pub count: u32,
}

/// Per-color tally of opaque pixels.
///
/// Always rebuilt from a whole raster; there's deliberately no way to update it in place
/// after the raster or palette changed.
#[derive(Clone, Default)]
pub struct ColorCount {
    /// The key is the RGB packed into u32
    hashmap: HashMap<u32, u32, U32Hasher>,
}

impl ColorCount {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { hashmap: HashMap::with_hasher(U32Hasher(0)) }
    }

    /// Counts every pixel with non-zero alpha, keyed by its exact RGB
    #[must_use]
    pub fn from_raster(raster: &Raster) -> Self {
        let mut counts = Self::new();
        for row in raster.rows() {
            counts.add_pixel_row(row.iter().filter_map(|&px| opaque_rgb(px)));
        }
        counts
    }

    #[inline]
    pub(crate) fn add_pixel_row(&mut self, colors: impl Iterator<Item = RGB>) {
        for c in colors {
            self.add_color(c, 1);
        }
    }

    #[inline(always)]
    pub(crate) fn add_color(&mut self, color: RGB, count: u32) {
        self.hashmap.entry(pack(color))
            .and_modify(move |e| *e = e.saturating_add(count))
            .or_insert(count);
    }

    /// Sums tallies made by separate threads
    #[must_use]
    pub(crate) fn merge(self, other: Self) -> Self {
        let (mut big, small) = if self.hashmap.len() >= other.hashmap.len() { (self, other) } else { (other, self) };
        for (k, v) in small.hashmap {
            big.add_color(unpack(k), v);
        }
        big
    }

    #[inline]
    #[must_use]
    pub fn get(&self, color: RGB) -> u32 {
        self.hashmap.get(&pack(color)).copied().unwrap_or(0)
    }

    /// Looks up by the `r,g,b` key
    #[must_use]
    pub fn get_by_key(&self, key: &str) -> u32 {
        let mut parts = key.split(',').map(|c| c.trim().parse::<u8>());
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(r)), Some(Ok(g)), Some(Ok(b)), None) => self.get(RGB::new(r, g, b)),
            _ => 0,
        }
    }

    /// Number of distinct colors
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.hashmap.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashmap.is_empty()
    }

    /// Total number of counted (opaque) pixels
    #[must_use]
    pub fn total(&self) -> u64 {
        self.hashmap.values().map(|&c| u64::from(c)).sum()
    }

    /// In no particular order
    pub fn iter(&self) -> impl Iterator<Item = ColorCountEntry> + '_ {
        self.hashmap.iter().map(|(&k, &count)| ColorCountEntry { color: unpack(k), count })
    }

    /// Most common first; equal counts ordered by color
    #[must_use]
    pub fn sorted(&self) -> Vec<ColorCountEntry> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| b.count.cmp(&a.count).then_with(|| (a.color.r, a.color.g, a.color.b).cmp(&(b.color.r, b.color.g, b.color.b))));
        entries
    }

    /// `"r,g,b" → count`, the shape the summary panel shows
    #[must_use]
    pub fn to_keyed_map(&self) -> HashMap<String, u32> {
        self.iter().map(|e| (color_key(e.color), e.count)).collect()
    }

    /// Colors that were counted but aren't in `palette`, sorted
    #[must_use]
    pub fn out_of_palette(&self, palette: &[RGB]) -> Vec<RGB> {
        let mut colors: Vec<_> = self.iter()
            .map(|e| e.color)
            .filter(|c| !palette.contains(c))
            .collect();
        colors.sort_unstable_by_key(|c| pack(*c));
        colors
    }
}

impl std::fmt::Debug for ColorCount {
    #[cold]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.sorted().into_iter().map(|e| (format_rgb(e.color), e.count))).finish()
    }
}

impl PartialEq for ColorCount {
    fn eq(&self, other: &Self) -> bool {
        self.hashmap == other.hashmap
    }
}

impl Eq for ColorCount {}

#[inline(always)]
fn pack(c: RGB) -> u32 {
    u32::from_be_bytes([0, c.r, c.g, c.b])
}

#[inline(always)]
fn unpack(k: u32) -> RGB {
    let [_, r, g, b] = k.to_be_bytes();
    RGB::new(r, g, b)
}

// Simple deterministic hasher for the color hashmap
impl std::hash::BuildHasher for U32Hasher {
    type Hasher = Self;
    #[inline(always)]
    fn build_hasher(&self) -> Self {
        Self(0)
    }
}

#[derive(Clone, Default)]
pub(crate) struct U32Hasher(pub u32);
impl std::hash::Hasher for U32Hasher {
    // magic constant from fxhash. For a single 32-bit key that's all it needs!
    #[inline(always)]
    fn finish(&self) -> u64 { u64::from(self.0).wrapping_mul(0x517cc1b727220a95) }
    #[inline(always)]
    fn write_u32(&mut self, i: u32) { self.0 = i; }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.rotate_left(5) ^ u32::from(b);
        }
    }
}

#[cfg(test)]
use crate::pal::RGBA;

#[test]
fn counts_skip_transparent() {
    let px = vec![
        RGBA::new(0, 0, 0, 255), RGBA::new(0, 0, 0, 1), RGBA::new(9, 9, 9, 0),
        RGBA::new(255, 255, 255, 255), RGBA::new(0, 0, 0, 0), RGBA::new(0, 0, 0, 128),
    ];
    let r = Raster::new(px, 3, 2).unwrap();
    let c = ColorCount::from_raster(&r);
    assert_eq!(3, c.get(RGB::new(0, 0, 0)));
    assert_eq!(1, c.get(RGB::new(255, 255, 255)));
    assert_eq!(0, c.get(RGB::new(9, 9, 9)));
    assert_eq!(3, c.get_by_key("0,0,0"));
    assert_eq!(0, c.get_by_key("0,0"));
    assert_eq!(r.opaque_count() as u64, c.total());
    assert_eq!(2, c.len());
}

#[test]
fn sorted_and_keyed() {
    let mut c = ColorCount::new();
    c.add_color(RGB::new(5, 0, 0), 2);
    c.add_color(RGB::new(1, 0, 0), 2);
    c.add_color(RGB::new(9, 9, 9), 7);
    let s = c.sorted();
    assert_eq!(vec![RGB::new(9, 9, 9), RGB::new(1, 0, 0), RGB::new(5, 0, 0)], s.iter().map(|e| e.color).collect::<Vec<_>>());
    assert_eq!(Some(&7), c.to_keyed_map().get("9,9,9"));
    assert_eq!(vec![RGB::new(1, 0, 0), RGB::new(5, 0, 0)], c.out_of_palette(&[RGB::new(9, 9, 9)]));
}

#[test]
fn merge_sums() {
    let mut a = ColorCount::new();
    a.add_color(RGB::new(1, 2, 3), 4);
    let mut b = ColorCount::new();
    b.add_color(RGB::new(1, 2, 3), 1);
    b.add_color(RGB::new(3, 2, 1), 1);
    let m = a.merge(b);
    assert_eq!(5, m.get(RGB::new(1, 2, 3)));
    assert_eq!(6, m.total());
}
