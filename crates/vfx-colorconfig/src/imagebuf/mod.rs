//! In-memory image buffer.
//!
//! A deliberately small OIIO-style `ImageBuf`: a spec, typed local pixel
//! storage and an error message slot that image operations write to.
//!
//! # Example
//!
//! ```
//! use vfx_colorconfig::imagebuf::{ImageBuf, ImageSpec};
//!
//! let mut buf = ImageBuf::new(ImageSpec::rgba(4, 4));
//! buf.setpixel(1, 1, &[1.0, 0.5, 0.25, 1.0]);
//!
//! let mut pixel = [0.0f32; 4];
//! buf.getpixel(1, 1, &mut pixel);
//! assert_eq!(pixel, [1.0, 0.5, 0.25, 1.0]);
//! ```

mod spec;
mod storage;

pub use spec::*;
pub use storage::*;

/// Image buffer with local pixels.
#[derive(Debug, Clone, Default)]
pub struct ImageBuf {
    spec: ImageSpec,
    storage: PixelStorage,
    error: String,
}

impl ImageBuf {
    /// Creates an empty, uninitialized buffer.
    pub fn new_uninit() -> Self {
        Self::default()
    }

    /// Allocates a zero-filled buffer for `spec`.
    pub fn new(spec: ImageSpec) -> Self {
        let storage = PixelStorage::allocate(&spec);
        Self {
            spec,
            storage,
            error: String::new(),
        }
    }

    /// Buffer holding `pixels` (packed, `spec.nchannels` floats per pixel),
    /// converted to `spec.format`.
    pub fn from_f32(spec: ImageSpec, pixels: &[f32]) -> Self {
        let mut buf = Self::new(spec);
        for (i, &v) in pixels.iter().enumerate().take(buf.storage.len()) {
            buf.storage.store(i, v);
        }
        buf
    }

    /// Reallocates for `spec`, dropping pixels and errors.
    pub fn reset(&mut self, spec: ImageSpec) {
        *self = Self::new(spec);
    }

    /// True if pixels are allocated.
    pub fn initialized(&self) -> bool {
        !self.storage.is_empty()
    }

    /// Image spec.
    pub fn spec(&self) -> &ImageSpec {
        &self.spec
    }

    /// Mutable image spec (metadata only; do not change the geometry).
    pub fn specmod(&mut self) -> &mut ImageSpec {
        &mut self.spec
    }

    /// Full-image region.
    pub fn roi(&self) -> Roi {
        self.spec.roi()
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.spec.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.spec.height
    }

    /// Channels per pixel.
    pub fn nchannels(&self) -> usize {
        self.spec.nchannels
    }

    /// Pixel data format.
    pub fn format(&self) -> DataFormat {
        self.spec.format
    }

    /// Pixel storage.
    pub fn storage(&self) -> &PixelStorage {
        &self.storage
    }

    /// Mutable pixel storage.
    pub fn storage_mut(&mut self) -> &mut PixelStorage {
        &mut self.storage
    }

    /// Index of the first sample of pixel `(x, y)`, if inside the image.
    #[inline]
    pub fn pixel_index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.spec.width as i32 || y >= self.spec.height as i32 {
            return None;
        }
        Some((y as usize * self.spec.width as usize + x as usize) * self.spec.nchannels)
    }

    /// Reads pixel `(x, y)` as floats; out-of-range pixels read as zero.
    pub fn getpixel(&self, x: i32, y: i32, pixel: &mut [f32]) {
        let Some(base) = self.pixel_index(x, y) else {
            pixel.fill(0.0);
            return;
        };
        for (c, out) in pixel.iter_mut().enumerate() {
            *out = if c < self.spec.nchannels {
                self.storage.load(base + c)
            } else {
                0.0
            };
        }
    }

    /// Writes pixel `(x, y)` from floats; out-of-range writes are ignored.
    pub fn setpixel(&mut self, x: i32, y: i32, pixel: &[f32]) {
        let Some(base) = self.pixel_index(x, y) else {
            return;
        };
        let n = pixel.len().min(self.spec.nchannels);
        for (c, &v) in pixel[..n].iter().enumerate() {
            self.storage.store(base + c, v);
        }
    }

    /// All samples as floats.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        (0..self.storage.len()).map(|i| self.storage.load(i)).collect()
    }

    /// Copies the channels of `roi` from `src`, converting formats.
    /// Returns false (with an error set) if the region does not fit.
    pub fn copy_pixels(&mut self, src: &ImageBuf, roi: Roi) -> bool {
        if !self.roi().contains(&roi) || !src.roi().contains(&roi) {
            self.error(format!("copy_pixels: region {roi:?} out of bounds"));
            return false;
        }
        let (cb, ce) = (roi.chbegin as usize, roi.chend as usize);
        for y in roi.ybegin..roi.yend {
            for x in roi.xbegin..roi.xend {
                let (Some(s), Some(d)) = (src.pixel_index(x, y), self.pixel_index(x, y)) else {
                    continue;
                };
                for c in cb..ce {
                    self.storage.store(d + c, src.storage.load(s + c));
                }
            }
        }
        true
    }

    /// Records an error message.
    pub fn error(&mut self, message: impl Into<String>) {
        self.error = message.into();
    }

    /// True if an error is pending.
    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }

    /// Pending error message.
    pub fn geterror(&self) -> Option<String> {
        if self.error.is_empty() {
            None
        } else {
            Some(self.error.clone())
        }
    }

    /// Clears the pending error.
    pub fn clear_error(&mut self) {
        self.error.clear();
    }
}
