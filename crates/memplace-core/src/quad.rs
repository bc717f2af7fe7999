//! The four parallel buffers of one strategy run.
//!
//! `Quad<B>` is generic over the buffer handle so the same invariant covers
//! USM buffers, opaque device buffers, host staging vectors and borrowed
//! slice views: all four members always have the same length.

use crate::{MemplaceError, Result};

/// Number of elements held by a buffer handle.
pub trait Extent {
    fn extent(&self) -> usize;
}

impl<T> Extent for [T] {
    fn extent(&self) -> usize {
        self.len()
    }
}

impl<T> Extent for Vec<T> {
    fn extent(&self) -> usize {
        self.len()
    }
}

impl<E: Extent + ?Sized> Extent for &E {
    fn extent(&self) -> usize {
        (**self).extent()
    }
}

impl<E: Extent + ?Sized> Extent for &mut E {
    fn extent(&self) -> usize {
        (**self).extent()
    }
}

/// Handles whose length cannot change through `&mut` access.
///
/// `Vec` is deliberately excluded: a `&mut Vec` could be resized and break
/// the equal-length invariant of a [`Quad`].
pub trait FixedExtent: Extent {}

/// Inputs `x`, `y`, `z` and output `w`, all of the same length.
#[derive(Debug, Clone)]
pub struct Quad<B> {
    x: B,
    y: B,
    z: B,
    w: B,
}

impl<B: Extent> Quad<B> {
    /// Bundle four buffers, rejecting unequal lengths.
    pub fn new(x: B, y: B, z: B, w: B) -> Result<Self> {
        let expected = x.extent();
        for got in [y.extent(), z.extent(), w.extent()] {
            if got != expected {
                return Err(MemplaceError::LengthMismatch { expected, got });
            }
        }
        Ok(Self { x, y, z, w })
    }

    /// Element count `N` shared by all four buffers.
    pub fn len(&self) -> usize {
        self.x.extent()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<B> Quad<B> {
    pub fn x(&self) -> &B {
        &self.x
    }

    pub fn y(&self) -> &B {
        &self.y
    }

    pub fn z(&self) -> &B {
        &self.z
    }

    pub fn w(&self) -> &B {
        &self.w
    }

    pub fn into_parts(self) -> (B, B, B, B) {
        (self.x, self.y, self.z, self.w)
    }

    /// Borrow all four members as host slices.
    pub fn view<T>(&self) -> Quad<&[T]>
    where
        B: AsRef<[T]>,
    {
        Quad {
            x: self.x.as_ref(),
            y: self.y.as_ref(),
            z: self.z.as_ref(),
            w: self.w.as_ref(),
        }
    }

    /// Borrow all four members as mutable host slices. Slices cannot be
    /// resized, so the length invariant survives the borrow.
    pub fn view_mut<T>(&mut self) -> Quad<&mut [T]>
    where
        B: AsMut<[T]>,
    {
        Quad {
            x: self.x.as_mut(),
            y: self.y.as_mut(),
            z: self.z.as_mut(),
            w: self.w.as_mut(),
        }
    }
}

impl<B: FixedExtent> Quad<B> {
    /// Inputs by shared reference and the output by unique reference,
    /// the access pattern of a kernel launch.
    pub fn split_io(&mut self) -> (&B, &B, &B, &mut B) {
        (&self.x, &self.y, &self.z, &mut self.w)
    }

    pub fn parts_mut(&mut self) -> (&mut B, &mut B, &mut B, &mut B) {
        (&mut self.x, &mut self.y, &mut self.z, &mut self.w)
    }

    pub fn w_mut(&mut self) -> &mut B {
        &mut self.w
    }
}

impl Quad<Vec<f32>> {
    /// Four zero-filled host vectors of `len` elements.
    ///
    /// Reserves fallibly so an oversized request surfaces as an error
    /// instead of aborting the process.
    pub fn zeroed_host(len: usize) -> std::result::Result<Self, std::collections::TryReserveError> {
        let alloc = || -> std::result::Result<Vec<f32>, std::collections::TryReserveError> {
            let mut v = Vec::new();
            v.try_reserve_exact(len)?;
            v.resize(len, 0.0);
            Ok(v)
        };
        Ok(Self {
            x: alloc()?,
            y: alloc()?,
            z: alloc()?,
            w: alloc()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unequal_lengths() {
        let err = Quad::new(vec![0.0f32; 4], vec![0.0; 4], vec![0.0; 3], vec![0.0; 4]).unwrap_err();
        assert_eq!(err, MemplaceError::LengthMismatch { expected: 4, got: 3 });
    }

    #[test]
    fn test_views_keep_length() {
        let mut q = Quad::zeroed_host(16).unwrap();
        assert_eq!(q.len(), 16);
        {
            let v = q.view_mut::<f32>();
            assert_eq!(v.len(), 16);
            let (x, _, _, w) = v.into_parts();
            x[3] = 1.5;
            w[15] = 2.0;
        }
        let v = q.view::<f32>();
        assert_eq!(v.x()[3], 1.5);
        assert_eq!(v.w()[15], 2.0);
        assert_eq!(v.len(), 16);
    }

    #[test]
    fn test_empty() {
        let q = Quad::zeroed_host(0).unwrap();
        assert!(q.is_empty());
        assert_eq!(q.view::<f32>().len(), 0);
    }
}
