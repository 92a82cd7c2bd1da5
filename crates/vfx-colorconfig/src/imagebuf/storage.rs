//! Typed pixel storage for ImageBuf.
//!
//! Samples are kept in their native type; kernels convert through `f32`
//! with [`Pixel`]. Integer types map their full range onto `[0, 1]`.

use half::f16;

use super::spec::{DataFormat, ImageSpec};

/// A channel sample type.
pub trait Pixel: Copy + Send + Sync + 'static {
    /// Matching [`DataFormat`].
    const FORMAT: DataFormat;

    /// Converts to a float value (normalized for integers).
    fn to_f32(self) -> f32;

    /// Converts from a float value, clamping and rounding integers.
    fn from_f32(v: f32) -> Self;
}

impl Pixel for u8 {
    const FORMAT: DataFormat = DataFormat::U8;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32 / 255.0
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

impl Pixel for u16 {
    const FORMAT: DataFormat = DataFormat::U16;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32 / 65535.0
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        (v.clamp(0.0, 1.0) * 65535.0).round() as u16
    }
}

impl Pixel for u32 {
    const FORMAT: DataFormat = DataFormat::U32;

    #[inline]
    fn to_f32(self) -> f32 {
        (self as f64 / u32::MAX as f64) as f32
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        (v.clamp(0.0, 1.0) as f64 * u32::MAX as f64).round() as u32
    }
}

impl Pixel for f16 {
    const FORMAT: DataFormat = DataFormat::F16;

    #[inline]
    fn to_f32(self) -> f32 {
        f16::to_f32(self)
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        f16::from_f32(v)
    }
}

impl Pixel for f32 {
    const FORMAT: DataFormat = DataFormat::F32;

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }
}

/// Owned, packed (`x` fastest, then channel-interleaved) pixel data.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PixelStorage {
    /// No pixel data.
    #[default]
    Empty,
    /// 8-bit samples.
    U8(Vec<u8>),
    /// 16-bit samples.
    U16(Vec<u16>),
    /// 32-bit integer samples.
    U32(Vec<u32>),
    /// Half float samples.
    F16(Vec<f16>),
    /// Float samples.
    F32(Vec<f32>),
}

impl PixelStorage {
    /// Allocates zeroed storage for `spec`.
    pub fn allocate(spec: &ImageSpec) -> Self {
        let total = spec.sample_count();
        if total == 0 {
            return Self::Empty;
        }
        match spec.format {
            DataFormat::U8 => Self::U8(vec![0; total]),
            DataFormat::U16 => Self::U16(vec![0; total]),
            DataFormat::U32 => Self::U32(vec![0; total]),
            DataFormat::F16 => Self::F16(vec![f16::ZERO; total]),
            DataFormat::F32 => Self::F32(vec![0.0; total]),
        }
    }

    /// True if no pixels are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::F16(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    /// Storage format, `None` when empty.
    pub fn format(&self) -> Option<DataFormat> {
        match self {
            Self::Empty => None,
            Self::U8(_) => Some(DataFormat::U8),
            Self::U16(_) => Some(DataFormat::U16),
            Self::U32(_) => Some(DataFormat::U32),
            Self::F16(_) => Some(DataFormat::F16),
            Self::F32(_) => Some(DataFormat::F32),
        }
    }

    /// Sample at `index` as float (0 when out of range).
    #[inline]
    pub fn load(&self, index: usize) -> f32 {
        fn get<T: Pixel>(v: &[T], i: usize) -> f32 {
            v.get(i).map_or(0.0, |p| p.to_f32())
        }
        match self {
            Self::Empty => 0.0,
            Self::U8(v) => get(v, index),
            Self::U16(v) => get(v, index),
            Self::U32(v) => get(v, index),
            Self::F16(v) => get(v, index),
            Self::F32(v) => get(v, index),
        }
    }

    /// Stores a float sample at `index` (ignored when out of range).
    #[inline]
    pub fn store(&mut self, index: usize, value: f32) {
        fn put<T: Pixel>(v: &mut [T], i: usize, value: f32) {
            if let Some(p) = v.get_mut(i) {
                *p = T::from_f32(value);
            }
        }
        match self {
            Self::Empty => {}
            Self::U8(v) => put(v, index, value),
            Self::U16(v) => put(v, index, value),
            Self::U32(v) => put(v, index, value),
            Self::F16(v) => put(v, index, value),
            Self::F32(v) => put(v, index, value),
        }
    }

    /// Float samples, if stored as `f32`.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Self::F32(v) => Some(v),
            _ => None,
        }
    }

    /// Mutable float samples, if stored as `f32`.
    pub fn as_f32_mut(&mut self) -> Option<&mut [f32]> {
        match self {
            Self::F32(v) => Some(v),
            _ => None,
        }
    }
}
