//! OIIO-style color operations on [`ImageBuf`](crate::imagebuf::ImageBuf).
//!
//! Every operation comes as `*_into(dst, src, ..) -> bool`, which records
//! failures on `dst` (see [`ImageBuf::geterror`](crate::imagebuf::ImageBuf::geterror)),
//! and as a value form returning a new image that carries the error.
//! An uninitialized `dst` is allocated from the source spec.
//!
//! # Example
//!
//! ```
//! use vfx_colorconfig::imagebuf::{ImageBuf, ImageSpec};
//! use vfx_colorconfig::imagebufalgo::{colormatrixtransform, ColorOptions};
//!
//! let src = ImageBuf::from_f32(ImageSpec::rgb(1, 1), &[0.2, 0.4, 0.6]);
//! #[rustfmt::skip]
//! let swap_rb = [
//!     0.0, 0.0, 1.0, 0.0,
//!     0.0, 1.0, 0.0, 0.0,
//!     1.0, 0.0, 0.0, 0.0,
//!     0.0, 0.0, 0.0, 1.0,
//! ];
//! let dst = colormatrixtransform(&src, &swap_rb, &ColorOptions::default());
//! assert_eq!(dst.to_f32_vec(), vec![0.6, 0.4, 0.2]);
//! ```

mod kernel;
mod metadata;
mod ocio;

pub use metadata::{set_colorspace, set_colorspace_rec709_gamma};
pub use ocio::*;

use crate::config::ColorConfig;
use crate::error::ColorError;
use crate::imagebuf::{ImageBuf, Roi};

/// Controls shared by the image color operations.
#[derive(Debug, Clone, Copy)]
pub struct ColorOptions<'a> {
    /// Divide color by alpha around the transform (default true).
    pub unpremult: bool,
    /// Comma-separated context variable names.
    pub context_key: &'a str,
    /// Comma-separated context variable values.
    pub context_value: &'a str,
    /// Config to use; the process default when `None`.
    pub config: Option<&'a ColorConfig>,
    /// Region to process; the whole source when `None`.
    pub roi: Option<Roi>,
    /// Worker threads: 0 = rayon global pool, 1 = serial.
    pub nthreads: usize,
}

impl Default for ColorOptions<'_> {
    fn default() -> Self {
        Self {
            unpremult: true,
            context_key: "",
            context_value: "",
            config: None,
            roi: None,
            nthreads: 0,
        }
    }
}

impl<'a> ColorOptions<'a> {
    /// Sets the config.
    pub fn with_config(mut self, config: &'a ColorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the region of interest.
    pub fn with_roi(mut self, roi: Roi) -> Self {
        self.roi = Some(roi);
        self
    }

    /// Sets the thread count.
    pub fn with_nthreads(mut self, nthreads: usize) -> Self {
        self.nthreads = nthreads;
        self
    }

    /// Enables or disables unpremultiplication.
    pub fn with_unpremult(mut self, unpremult: bool) -> Self {
        self.unpremult = unpremult;
        self
    }

    /// Sets context variables as parallel comma-separated lists.
    pub fn with_context(mut self, keys: &'a str, values: &'a str) -> Self {
        self.context_key = keys;
        self.context_value = values;
        self
    }

    /// Config to use.
    pub(crate) fn config(&self) -> &'a ColorConfig {
        self.config
            .unwrap_or_else(|| ColorConfig::default_colorconfig())
    }
}

/// Validates `roi` for a `src` -> `dst` operation, allocating `dst` from
/// the source spec if it has no pixels. Returns the effective region.
pub(crate) fn prep(dst: &mut ImageBuf, src: &ImageBuf, roi: Option<Roi>) -> Result<Roi, ColorError> {
    if !src.initialized() {
        return Err(ColorError::Uninitialized);
    }
    let roi = roi.filter(Roi::defined).unwrap_or_else(|| src.roi());
    if !dst.initialized() {
        *dst = ImageBuf::new(src.spec().clone());
    }
    if roi.chend > dst.nchannels() as i32 {
        return Err(ColorError::ChannelMismatch {
            src: src.nchannels(),
            dst: dst.nchannels(),
        });
    }
    if !src.roi().contains(&roi) || !dst.roi().contains(&roi) {
        return Err(ColorError::BadRoi(format!("{roi:?}")));
    }
    Ok(roi)
}

/// Validates `roi` for an in-place operation.
pub(crate) fn prep_inplace(img: &ImageBuf, roi: Option<Roi>) -> Result<Roi, ColorError> {
    if !img.initialized() {
        return Err(ColorError::Uninitialized);
    }
    let roi = roi.filter(Roi::defined).unwrap_or_else(|| img.roi());
    if !img.roi().contains(&roi) {
        return Err(ColorError::BadRoi(format!("{roi:?}")));
    }
    Ok(roi)
}

/// Runs a `*_into` operation on a fresh image, making sure a failure
/// leaves a message behind.
pub(crate) fn into_new(op: &str, f: impl FnOnce(&mut ImageBuf) -> bool) -> ImageBuf {
    let mut dst = ImageBuf::new_uninit();
    if !f(&mut dst) && !dst.has_error() {
        dst.error(format!("ImageBufAlgo::{op}() error"));
    }
    dst
}
