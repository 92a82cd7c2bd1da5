//! Color conversion functions for ImageBuf.
//!
//! # Example
//!
//! ```ignore
//! use vfx_colorconfig::imagebufalgo::{colorconvert, ociodisplay, ColorOptions};
//!
//! let opts = ColorOptions::default().with_config(&config);
//!
//! // Convert between color spaces
//! let acescg = colorconvert(&src, "sRGB", "ACEScg", &opts);
//!
//! // Apply display transform
//! let shown = ociodisplay(&acescg, "sRGB", "Film", "current", "", false, &opts);
//! ```

use tracing::{debug, warn};

use super::{into_new, kernel, prep, prep_inplace, ColorOptions};
use crate::config::ColorConfig;
use crate::engine::ROLE_SCENE_LINEAR;
use crate::error::ColorError;
use crate::imagebuf::{ImageBuf, Roi, ATTR_UNASSOCIATED_ALPHA};
use crate::processor::ProcessorHandle;

/// True unless `img` declares its alpha as unassociated.
fn wants_unpremult(img: &ImageBuf, unpremult: bool) -> bool {
    let spec = img.spec();
    unpremult
        && !(spec.alpha_channel.is_some() && spec.get_int(ATTR_UNASSOCIATED_ALPHA).unwrap_or(0) != 0)
}

/// Records why `config` produced no processor.
fn processor_failed(dst: &mut ImageBuf, config: &ColorConfig, what: &str) {
    let message = if config.has_error() {
        config.geterror(true)
    } else {
        ColorError::TransformUnavailable(format!("{what} (unknown error)")).to_string()
    };
    warn!(what, %message, "no color processor");
    dst.error(message);
}

/// Source color space for operations where `""` or `"current"` means the
/// image's declared one.
fn current_colorspace(src: &ImageBuf, name: &str, config: &ColorConfig) -> String {
    if name.is_empty() || name == "current" {
        match src.spec().colorspace() {
            Some(cs) => cs.to_string(),
            None => config.resolve(ROLE_SCENE_LINEAR),
        }
    } else {
        name.to_string()
    }
}

// ============================================================================
// Explicit processor
// ============================================================================

/// Applies `processor` to `roi` of `src`, writing to `dst`.
///
/// An identity processor degenerates to a copy. Only the first four
/// channels are transformed; the rest are copied.
pub fn colorconvert_with_into(
    dst: &mut ImageBuf,
    src: &ImageBuf,
    processor: &ProcessorHandle,
    unpremult: bool,
    roi: Option<Roi>,
    nthreads: usize,
) -> bool {
    let Some(p) = processor.get() else {
        dst.error(ColorError::NullProcessor.to_string());
        return false;
    };
    let roi = match prep(dst, src, roi) {
        Ok(roi) => roi,
        Err(e) => {
            dst.error(e.to_string());
            return false;
        }
    };
    if p.is_noop() {
        debug!(?roi, "identity processor, copying");
        return dst.copy_pixels(src, roi);
    }
    kernel::convert(dst, Some(src), p, wants_unpremult(src, unpremult), roi, nthreads);
    true
}

/// Value form of [`colorconvert_with_into`].
pub fn colorconvert_with(
    src: &ImageBuf,
    processor: &ProcessorHandle,
    unpremult: bool,
    roi: Option<Roi>,
    nthreads: usize,
) -> ImageBuf {
    into_new("colorconvert", |dst| {
        colorconvert_with_into(dst, src, processor, unpremult, roi, nthreads)
    })
}

/// Applies `processor` to `img` in place. An identity processor does
/// nothing.
pub fn colorconvert_with_inplace(
    img: &mut ImageBuf,
    processor: &ProcessorHandle,
    unpremult: bool,
    roi: Option<Roi>,
    nthreads: usize,
) -> bool {
    let Some(p) = processor.get() else {
        img.error(ColorError::NullProcessor.to_string());
        return false;
    };
    if p.is_noop() {
        return true;
    }
    let roi = match prep_inplace(img, roi) {
        Ok(roi) => roi,
        Err(e) => {
            img.error(e.to_string());
            return false;
        }
    };
    let unpremult = wants_unpremult(img, unpremult);
    kernel::convert(img, None, p, unpremult, roi, nthreads);
    true
}

/// Converts one pixel in place.
///
/// Up to four values are used; alpha is divided out around the transform
/// when `unpremult` is set, four values are present and alpha is strictly
/// greater than `f32::MIN_POSITIVE`. The image kernels also divide at
/// exactly `f32::MIN_POSITIVE`. Returns false for an empty processor.
pub fn colorconvert_pixel(color: &mut [f32], processor: &ProcessorHandle, unpremult: bool) -> bool {
    let Some(p) = processor.get() else {
        return false;
    };
    if p.is_noop() {
        return true;
    }
    let n = color.len().min(4);
    let mut rgba = [0.0f32; 4];
    rgba[..n].copy_from_slice(&color[..n]);

    let unpremult = unpremult && n == 4;
    if unpremult && rgba[3] > f32::MIN_POSITIVE {
        let a = rgba[3];
        rgba[..3].iter_mut().for_each(|v| *v /= a);
    }
    p.apply(&mut rgba, 1, 1, 4);
    if unpremult && rgba[3] > f32::MIN_POSITIVE {
        let a = rgba[3];
        rgba[..3].iter_mut().for_each(|v| *v *= a);
    }

    color[..n].copy_from_slice(&rgba[..n]);
    true
}

// ============================================================================
// Named color spaces
// ============================================================================

/// Converts `src` from color space `from` to `to`, writing to `dst`.
///
/// `""` or `"current"` for `from` means the image's declared color space
/// (or `scene_linear`). On success the result is tagged as `to`.
pub fn colorconvert_into(
    dst: &mut ImageBuf,
    src: &ImageBuf,
    from: &str,
    to: &str,
    opts: &ColorOptions<'_>,
) -> bool {
    let config = opts.config();
    let from = if from.is_empty() || from == "current" {
        src.spec().colorspace().unwrap_or(ROLE_SCENE_LINEAR)
    } else {
        from
    };
    let Some(processor) = named_processor(dst, config, from, to, opts) else {
        return false;
    };
    let ok = colorconvert_with_into(dst, src, &processor, opts.unpremult, opts.roi, opts.nthreads);
    if ok {
        config.set_colorspace(dst.specmod(), to);
    }
    ok
}

/// Value form of [`colorconvert_into`].
pub fn colorconvert(src: &ImageBuf, from: &str, to: &str, opts: &ColorOptions<'_>) -> ImageBuf {
    into_new("colorconvert", |dst| colorconvert_into(dst, src, from, to, opts))
}

/// In-place form of [`colorconvert_into`].
pub fn colorconvert_inplace(img: &mut ImageBuf, from: &str, to: &str, opts: &ColorOptions<'_>) -> bool {
    let config = opts.config();
    let from = if from.is_empty() || from == "current" {
        img.spec().colorspace().unwrap_or(ROLE_SCENE_LINEAR).to_string()
    } else {
        from.to_string()
    };
    let Some(processor) = named_processor(img, config, &from, to, opts) else {
        return false;
    };
    let ok = colorconvert_with_inplace(img, &processor, opts.unpremult, opts.roi, opts.nthreads);
    if ok {
        config.set_colorspace(img.specmod(), to);
    }
    ok
}

fn named_processor(
    dst: &mut ImageBuf,
    config: &ColorConfig,
    from: &str,
    to: &str,
    opts: &ColorOptions<'_>,
) -> Option<ProcessorHandle> {
    if from.is_empty() || to.is_empty() {
        dst.error(ColorError::UnknownColorSpace.to_string());
        return None;
    }
    let processor = config.create_color_processor(
        &config.resolve(from),
        &config.resolve(to),
        opts.context_key,
        opts.context_value,
    );
    if processor.is_empty() {
        processor_failed(dst, config, &format!("{from} -> {to}"));
        return None;
    }
    Some(processor)
}

// ============================================================================
// Matrix
// ============================================================================

/// Multiplies pixels (as row vectors) by the row-major 4x4 matrix `m`.
///
/// Uses `opts.unpremult`, `opts.roi` and `opts.nthreads`.
pub fn colormatrixtransform_into(
    dst: &mut ImageBuf,
    src: &ImageBuf,
    m: &[f32; 16],
    opts: &ColorOptions<'_>,
) -> bool {
    let processor = opts.config().create_matrix_transform(m, false);
    colorconvert_with_into(dst, src, &processor, opts.unpremult, opts.roi, opts.nthreads)
}

/// Value form of [`colormatrixtransform_into`].
pub fn colormatrixtransform(src: &ImageBuf, m: &[f32; 16], opts: &ColorOptions<'_>) -> ImageBuf {
    into_new("colormatrixtransform", |dst| colormatrixtransform_into(dst, src, m, opts))
}

// ============================================================================
// Looks
// ============================================================================

/// Applies `looks` between `from` and `to`; `""`/`"current"` endpoints
/// mean the image's declared color space. The result is tagged as `to`.
pub fn ociolook_into(
    dst: &mut ImageBuf,
    src: &ImageBuf,
    looks: &str,
    from: &str,
    to: &str,
    inverse: bool,
    opts: &ColorOptions<'_>,
) -> bool {
    let config = opts.config();
    let from = current_colorspace(src, from, config);
    let to = current_colorspace(src, to, config);
    if from.is_empty() || to.is_empty() {
        dst.error(ColorError::UnknownColorSpace.to_string());
        return false;
    }
    let processor = config.create_look_transform(
        looks,
        &config.resolve(&from),
        &config.resolve(&to),
        inverse,
        opts.context_key,
        opts.context_value,
    );
    if processor.is_empty() {
        processor_failed(dst, config, &format!("{from} -> {to} with looks {looks:?}"));
        return false;
    }
    let ok = colorconvert_with_into(dst, src, &processor, opts.unpremult, opts.roi, opts.nthreads);
    if ok {
        config.set_colorspace(dst.specmod(), &to);
    }
    ok
}

/// Value form of [`ociolook_into`].
pub fn ociolook(
    src: &ImageBuf,
    looks: &str,
    from: &str,
    to: &str,
    inverse: bool,
    opts: &ColorOptions<'_>,
) -> ImageBuf {
    into_new("ociolook", |dst| ociolook_into(dst, src, looks, from, to, inverse, opts))
}

// ============================================================================
// Display / view
// ============================================================================

/// Applies a display/view transform to pixels in color space `from`.
///
/// The result is tagged with the view's color space, or with `from` for
/// the inverse.
#[allow(clippy::too_many_arguments)]
pub fn ociodisplay_into(
    dst: &mut ImageBuf,
    src: &ImageBuf,
    display: &str,
    view: &str,
    from: &str,
    looks: &str,
    inverse: bool,
    opts: &ColorOptions<'_>,
) -> bool {
    let config = opts.config();
    let from = current_colorspace(src, from, config);
    if from.is_empty() {
        dst.error(ColorError::UnknownColorSpace.to_string());
        return false;
    }
    let input = config.resolve(&from);
    let processor = config.create_display_transform(
        display,
        view,
        &input,
        looks,
        inverse,
        opts.context_key,
        opts.context_value,
    );
    if processor.is_empty() {
        processor_failed(dst, config, &format!("{from} -> {display}/{view}"));
        return false;
    }
    let ok = colorconvert_with_into(dst, src, &processor, opts.unpremult, opts.roi, opts.nthreads);
    if ok {
        let tag = if inverse {
            input
        } else {
            let (display, view) = config.display_and_view(display, view, &input);
            config
                .display_view_colorspace_name(&display, &view)
                .unwrap_or_default()
        };
        config.set_colorspace(dst.specmod(), &tag);
    }
    ok
}

/// Value form of [`ociodisplay_into`].
pub fn ociodisplay(
    src: &ImageBuf,
    display: &str,
    view: &str,
    from: &str,
    looks: &str,
    inverse: bool,
    opts: &ColorOptions<'_>,
) -> ImageBuf {
    into_new("ociodisplay", |dst| {
        ociodisplay_into(dst, src, display, view, from, looks, inverse, opts)
    })
}

// ============================================================================
// File and named transforms
// ============================================================================

/// Applies the transform stored in file `name`.
///
/// When the config's file rules recognise the name, the result is tagged
/// with the matching color space.
pub fn ociofiletransform_into(
    dst: &mut ImageBuf,
    src: &ImageBuf,
    name: &str,
    inverse: bool,
    opts: &ColorOptions<'_>,
) -> bool {
    if name.is_empty() {
        dst.error("Unknown filetransform name");
        return false;
    }
    let config = opts.config();
    let processor = config.create_file_transform(name, inverse);
    if processor.is_empty() {
        processor_failed(dst, config, name);
        return false;
    }
    let ok = colorconvert_with_into(dst, src, &processor, opts.unpremult, opts.roi, opts.nthreads);
    if ok && !config.filepath_only_matches_default_rule(name) {
        let cs = config.colorspace_from_filepath(name);
        config.set_colorspace(dst.specmod(), &cs);
    }
    ok
}

/// Value form of [`ociofiletransform_into`].
pub fn ociofiletransform(
    src: &ImageBuf,
    name: &str,
    inverse: bool,
    opts: &ColorOptions<'_>,
) -> ImageBuf {
    into_new("ociofiletransform", |dst| ociofiletransform_into(dst, src, name, inverse, opts))
}

/// Applies the config's named transform `name`. Metadata is left alone.
pub fn ocionamedtransform_into(
    dst: &mut ImageBuf,
    src: &ImageBuf,
    name: &str,
    inverse: bool,
    opts: &ColorOptions<'_>,
) -> bool {
    let config = opts.config();
    let processor =
        config.create_named_transform(name, inverse, opts.context_key, opts.context_value);
    if processor.is_empty() {
        processor_failed(dst, config, name);
        return false;
    }
    colorconvert_with_into(dst, src, &processor, opts.unpremult, opts.roi, opts.nthreads)
}

/// Value form of [`ocionamedtransform_into`].
pub fn ocionamedtransform(
    src: &ImageBuf,
    name: &str,
    inverse: bool,
    opts: &ColorOptions<'_>,
) -> ImageBuf {
    into_new("ocionamedtransform", |dst| ocionamedtransform_into(dst, src, name, inverse, opts))
}
