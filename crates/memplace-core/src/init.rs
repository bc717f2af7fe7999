//! Input population for a run.

use rand::Rng;

use crate::Quad;

/// Fill `x`, `y`, `z` with independent uniform values in `[0, 1)` and zero `w`.
pub fn initialize<R: Rng + ?Sized>(view: Quad<&mut [f32]>, rng: &mut R) {
    let (x, y, z, w) = view.into_parts();
    fill_uniform(x, rng);
    fill_uniform(y, rng);
    fill_uniform(z, rng);
    w.fill(0.0);
}

/// Overwrite `buf` with samples of the standard `[0, 1)` distribution.
pub fn fill_uniform<R: Rng + ?Sized>(buf: &mut [f32], rng: &mut R) {
    for v in buf.iter_mut() {
        *v = rng.gen::<f32>();
    }
}
