//! Sequential stand-ins for the rayon and thread_local APIs, used without the `threads` feature

use std::cell::OnceCell;
use std::slice::ChunksMut;

pub(crate) struct ThreadLocal<T>(OnceCell<T>);

impl<T> ThreadLocal<T> {
    #[inline(always)]
    pub fn new() -> Self {
        Self(OnceCell::new())
    }

    #[inline(always)]
    pub fn get_or(&self, f: impl FnOnce() -> T) -> &T {
        self.0.get_or_init(f)
    }
}

impl<T> IntoIterator for ThreadLocal<T> {
    type Item = T;

    type IntoIter = std::option::IntoIter<T>;

    #[inline(always)]
    fn into_iter(mut self) -> Self::IntoIter {
        self.0.take().into_iter()
    }
}

pub(crate) trait FakeRayonSliceMut<T> {
    fn par_chunks_mut(&mut self, chunk_size: usize) -> ChunksMut<'_, T>;
}

impl<T> FakeRayonSliceMut<T> for [T] {
    #[inline(always)]
    fn par_chunks_mut(&mut self, chunk_size: usize) -> ChunksMut<'_, T> {
        self.chunks_mut(chunk_size)
    }
}

#[test]
fn fake_thread_local() {
    let tls = ThreadLocal::new();
    assert_eq!(1, *tls.get_or(|| 1));
    assert_eq!(1, *tls.get_or(|| 2));
    assert_eq!(vec![1], tls.into_iter().collect::<Vec<_>>());

    let mut v = [1, 2, 3, 4, 5];
    assert_eq!(3, v.par_chunks_mut(2).count());
}
