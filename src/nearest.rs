use crate::pal::RGB;

/// Closest palette color by plain Euclidean distance in RGB.
///
/// An empty palette returns `color` unchanged. Ties go to the *last* equally close candidate.
#[inline]
#[must_use]
pub fn nearest(color: RGB, palette: &[RGB]) -> RGB {
    Nearest::new(palette).search(color)
}

/// Squared distance orders candidates exactly like the square root does, without the float
#[inline(always)]
pub(crate) fn diff(a: RGB, b: RGB) -> u32 {
    let dr = i32::from(a.r) - i32::from(b.r);
    let dg = i32::from(a.g) - i32::from(b.g);
    let db = i32::from(a.b) - i32::from(b.b);
    (dr * dr + dg * dg + db * db) as u32
}

/// Linear-scan matcher over a borrowed palette.
///
/// The palette is at most a few dozen colors, so a scan beats any index.
#[derive(Clone, Copy)]
pub(crate) struct Nearest<'pal> {
    palette: &'pal [RGB],
}

impl<'pal> Nearest<'pal> {
    #[inline]
    pub fn new(palette: &'pal [RGB]) -> Self {
        Self { palette }
    }

    #[inline]
    pub fn search(&self, px: RGB) -> RGB {
        // an empty palette falls through with px itself
        let mut best = px;
        let mut best_diff = u32::MAX;
        for &candidate in self.palette {
            let d = diff(px, candidate);
            if d <= best_diff {
                best = candidate;
                best_diff = d;
            }
        }
        best
    }
}

/// Remembers the previous lookup. Rows of pixel art repeat the same color a lot.
pub(crate) struct LastMatch<'pal> {
    n: Nearest<'pal>,
    last: Option<(RGB, RGB)>,
}

impl<'pal> LastMatch<'pal> {
    #[inline]
    pub fn new(n: Nearest<'pal>) -> Self {
        Self { n, last: None }
    }

    #[inline]
    pub fn search(&mut self, px: RGB) -> RGB {
        match self.last {
            Some((input, matched)) if input == px => matched,
            _ => {
                let matched = self.n.search(px);
                self.last = Some((px, matched));
                matched
            },
        }
    }
}

#[test]
fn empty_palette_is_identity() {
    for c in [RGB::new(0, 0, 0), RGB::new(1, 2, 3), RGB::new(255, 128, 7)] {
        assert_eq!(c, nearest(c, &[]));
    }
}

#[test]
fn black_and_white() {
    let pal = [RGB::new(0, 0, 0), RGB::new(255, 255, 255)];
    assert_eq!(RGB::new(0, 0, 0), nearest(RGB::new(10, 10, 10), &pal));
    assert_eq!(RGB::new(255, 255, 255), nearest(RGB::new(250, 250, 250), &pal));
    // 255 vs ~360.6
    assert_eq!(RGB::new(0, 0, 0), nearest(RGB::new(0, 255, 0), &pal));
}

#[test]
fn ties_go_to_last_candidate() {
    let a = RGB::new(0, 0, 0);
    let b = RGB::new(20, 0, 0);
    let c = RGB::new(0, 20, 0);
    let px = RGB::new(10, 0, 0);
    assert_eq!(b, nearest(px, &[a, b]));
    assert_eq!(a, nearest(px, &[b, a]));
    // a and b tie at 10, c is farther, so c in the middle changes nothing
    assert_eq!(b, nearest(px, &[a, c, b]));

    let equidistant = RGB::new(10, 10, 0);
    for pal in [[a, b, c], [c, b, a], [b, a, c]] {
        let last_tied = *pal.iter().filter(|&&p| diff(equidistant, p) == 200).last().unwrap();
        assert_eq!(last_tied, nearest(equidistant, &pal));
    }
}

#[test]
fn exact_match_wins() {
    let pal: Vec<_> = (0..=255u8).step_by(5).map(|v| RGB::new(v, v / 2, 255 - v)).collect();
    for &c in &pal {
        assert_eq!(c, nearest(c, &pal));
    }
}

#[test]
fn last_match_cache() {
    let pal = [RGB::new(0, 0, 0), RGB::new(255, 255, 255)];
    let mut m = LastMatch::new(Nearest::new(&pal));
    assert_eq!(pal[1], m.search(RGB::new(200, 200, 200)));
    assert_eq!(pal[1], m.search(RGB::new(200, 200, 200)));
    assert_eq!(pal[0], m.search(RGB::new(20, 20, 20)));
}
