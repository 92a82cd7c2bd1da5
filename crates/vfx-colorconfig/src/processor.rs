//! Compiled color processors.
//!
//! Only two kinds exist: transforms compiled by the engine and pure 4x4
//! matrices that never touch the engine. [`ProcessorHandle`] is the shared,
//! possibly-empty reference handed out by the factory and stored in the
//! cache; an empty handle means "no transform available".

use std::fmt;
use std::sync::Arc;

use glam::{Mat4, Vec4};

use crate::engine::ProcessorRef;

/// A compiled transform.
#[derive(Debug)]
pub enum ColorProcessor {
    /// Transform compiled by the color engine.
    Engine(ProcessorRef),
    /// Row-vector matrix (`out = in * M`), inverted at construction if
    /// requested.
    Matrix(Mat4),
}

impl ColorProcessor {
    /// Wraps an engine processor.
    pub fn engine(processor: ProcessorRef) -> Self {
        Self::Engine(processor)
    }

    /// Builds a matrix processor from 16 row-major values.
    ///
    /// Pixels are treated as row vectors, so the translation lives in the
    /// last row. With `inverse` the matrix is inverted once, here.
    pub fn matrix(m: &[f32; 16], inverse: bool) -> Self {
        // Row-major input read as columns: glam's `mat * v` then equals
        // the row-vector product `v * M`.
        let mat = Mat4::from_cols_array(m);
        Self::Matrix(if inverse { mat.inverse() } else { mat })
    }

    /// True if the transform is the identity.
    pub fn is_noop(&self) -> bool {
        match self {
            Self::Engine(p) => p.is_noop(),
            Self::Matrix(m) => *m == Mat4::IDENTITY,
        }
    }

    /// True if any output channel depends on another input channel.
    pub fn has_channel_crosstalk(&self) -> bool {
        match self {
            Self::Engine(p) => p.has_channel_crosstalk(),
            Self::Matrix(m) => {
                let cols = m.to_cols_array_2d();
                (0..4).any(|c| (0..4).any(|r| r != c && cols[c][r] != 0.0))
            }
        }
    }

    /// Transforms packed pixels in place.
    ///
    /// `data` holds `width * height` pixels of `channels` floats each.
    /// Engine processors only see 3- or 4-channel data; other layouts go
    /// through a padded copy.
    pub fn apply(&self, data: &mut [f32], width: usize, height: usize, channels: usize) {
        let npixels = width * height;
        if channels == 0 || npixels == 0 {
            return;
        }
        debug_assert!(data.len() >= npixels * channels);
        match self {
            Self::Engine(p) => {
                if channels == 3 || channels == 4 {
                    p.apply(&mut data[..npixels * channels], width, height, channels);
                } else {
                    apply_padded(p.as_ref(), data, width, height, channels);
                }
            }
            Self::Matrix(m) => apply_matrix(m, &mut data[..npixels * channels], channels),
        }
    }
}

fn apply_padded(
    p: &dyn crate::engine::EngineProcessor,
    data: &mut [f32],
    width: usize,
    height: usize,
    channels: usize,
) {
    let n = channels.min(4);
    let mut rgba = vec![0.0f32; width * height * 4];
    for (px, tmp) in data.chunks_exact(channels).zip(rgba.chunks_exact_mut(4)) {
        tmp[..n].copy_from_slice(&px[..n]);
    }
    p.apply(&mut rgba, width, height, 4);
    for (px, tmp) in data.chunks_exact_mut(channels).zip(rgba.chunks_exact(4)) {
        px[..n].copy_from_slice(&tmp[..n]);
    }
}

fn apply_matrix(m: &Mat4, data: &mut [f32], channels: usize) {
    match channels {
        3 => {
            for px in data.chunks_exact_mut(3) {
                let out = *m * Vec4::new(px[0], px[1], px[2], 0.0);
                px.copy_from_slice(&out.to_array()[..3]);
            }
        }
        c if c >= 4 => {
            for px in data.chunks_exact_mut(c) {
                let out = *m * Vec4::from_slice(&px[..4]);
                px[..4].copy_from_slice(&out.to_array());
            }
        }
        c => {
            for px in data.chunks_exact_mut(c) {
                let mut v = [0.0f32; 4];
                v[..c].copy_from_slice(px);
                let out = (*m * Vec4::from_array(v)).to_array();
                px.copy_from_slice(&out[..c]);
            }
        }
    }
}

/// Shared, possibly empty, reference to a compiled processor.
#[derive(Clone, Default)]
pub struct ProcessorHandle(Option<Arc<ColorProcessor>>);

impl ProcessorHandle {
    /// Handle meaning "no transform available".
    #[inline]
    pub const fn empty() -> Self {
        Self(None)
    }

    /// Wraps a processor.
    pub fn new(processor: ColorProcessor) -> Self {
        Self(Some(Arc::new(processor)))
    }

    /// True if no processor is held.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// The processor, if any.
    #[inline]
    pub fn get(&self) -> Option<&ColorProcessor> {
        self.0.as_deref()
    }

    /// True if both handles refer to the same processor, or both are empty.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// True if a processor is held and it is the identity.
    pub fn is_noop(&self) -> bool {
        self.get().is_some_and(ColorProcessor::is_noop)
    }

    /// Number of live references to the held processor (0 if empty).
    pub fn strong_count(&self) -> usize {
        self.0.as_ref().map_or(0, Arc::strong_count)
    }
}

impl From<ColorProcessor> for ProcessorHandle {
    fn from(processor: ColorProcessor) -> Self {
        Self::new(processor)
    }
}

impl fmt::Debug for ProcessorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => f.write_str("ProcessorHandle(empty)"),
            Some(p) => f.debug_tuple("ProcessorHandle").field(p).finish(),
        }
    }
}
