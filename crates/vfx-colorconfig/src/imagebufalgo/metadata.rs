//! Declared color space metadata.
//!
//! Changing an image's color space invalidates format-specific hints that
//! readers attach (TIFF photometric tags, EXIF color space, gamma), so
//! they are cleared whenever the tag changes.

use crate::config::ColorConfig;
use crate::imagebuf::{ImageSpec, ATTR_COLORSPACE, ATTR_GAMMA};

const STALE_ATTRS: [&str; 3] = ["tiff:ColorSpace", "tiff:PhotometricInterpretation", ATTR_GAMMA];

impl ColorConfig {
    /// Tags `spec` as being in `colorspace` (`""` removes the tag).
    ///
    /// Does nothing if the tag is unchanged. Otherwise contradicting
    /// metadata is erased; `Exif:ColorSpace` survives only for sRGB.
    pub fn set_colorspace(&self, spec: &mut ImageSpec, colorspace: &str) {
        if !colorspace.is_empty() && spec.colorspace() == Some(colorspace) {
            return;
        }
        if colorspace.is_empty() {
            spec.erase_attr(ATTR_COLORSPACE);
        } else {
            spec.set_attr(ATTR_COLORSPACE, colorspace);
        }
        if !self.equivalent(colorspace, "srgb_rec709_scene") {
            spec.erase_attr("Exif:ColorSpace");
        }
        for attr in STALE_ATTRS {
            spec.erase_attr(attr);
        }
    }

    /// Tags `spec` with the Rec.709-primaries color space of a pure power
    /// `gamma` (rounded to 0.01), recording the gamma unless it is 1.
    pub fn set_colorspace_rec709_gamma(&self, spec: &mut ImageSpec, gamma: f32) {
        let gamma = (gamma * 100.0).round() / 100.0;
        let near = |g: f32| (gamma - g).abs() <= 0.01;
        if near(1.0) {
            self.set_colorspace(spec, "lin_rec709_scene");
            return;
        }
        let (name, gamma) = if near(1.8) {
            ("g18_rec709_scene".to_string(), 1.8)
        } else if near(2.2) {
            ("g22_rec709_scene".to_string(), 2.2)
        } else if near(2.4) {
            ("g24_rec709_scene".to_string(), 2.4)
        } else {
            (format!("g{}_rec709_scene", (gamma * 10.0).round() as i32), gamma)
        };
        self.set_colorspace(spec, &name);
        spec.set_attr(ATTR_GAMMA, gamma);
    }
}

/// [`ColorConfig::set_colorspace`] on the default config.
pub fn set_colorspace(spec: &mut ImageSpec, colorspace: &str) {
    ColorConfig::default_colorconfig().set_colorspace(spec, colorspace);
}

/// [`ColorConfig::set_colorspace_rec709_gamma`] on the default config.
pub fn set_colorspace_rec709_gamma(spec: &mut ImageSpec, gamma: f32) {
    ColorConfig::default_colorconfig().set_colorspace_rec709_gamma(spec, gamma);
}
