//! Capability contract of the external color engine.
//!
//! The color math itself (curves, matrices, LUT evaluation, document
//! parsing) lives behind these traits. [`ColorConfig`](crate::ColorConfig)
//! only ever talks to an engine through them, which is what lets the
//! name heuristics keep working when no engine is present at all.
//!
//! - [`Engine`] is the process-level entry point: loads documents and
//!   answers the cross-document queries (builtin identification,
//!   processors bridging two documents, processor composition).
//! - [`EngineConfig`] is one loaded, read-only document.
//! - [`EngineProcessor`] is one compiled transform.
//!
//! Implementations must be safe to query concurrently from many threads;
//! documents are never mutated after loading.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::context::Context;
use crate::error::{EngineError, EngineResult};

/// Shared handle to a loaded engine document.
pub type ConfigRef = Arc<dyn EngineConfig>;

/// Shared handle to a compiled engine transform.
pub type ProcessorRef = Arc<dyn EngineProcessor>;

/// URI of the engine's builtin default document.
pub const DEFAULT_CONFIG_URI: &str = "ocio://default";

/// Role name of the scene-linear working space.
pub const ROLE_SCENE_LINEAR: &str = "scene_linear";

/// Where a configuration document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Builtin document addressed by URI (e.g. `ocio://default`).
    Uri(String),
    /// Document on disk.
    File(PathBuf),
    /// Document text held in memory.
    Inline(String),
}

impl ConfigSource {
    /// Classifies a caller-supplied source string.
    ///
    /// Text containing a newline is an inline document, `ocio://...` is a
    /// builtin URI, anything else is a file path.
    pub fn parse(source: &str) -> Self {
        if source.contains('\n') {
            Self::Inline(source.to_string())
        } else if source.starts_with("ocio://") {
            Self::Uri(source.to_string())
        } else {
            Self::File(PathBuf::from(source))
        }
    }

    /// Builtin default document.
    pub fn builtin_default() -> Self {
        Self::Uri(DEFAULT_CONFIG_URI.to_string())
    }

    /// File path, if this source names one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uri(uri) => f.write_str(uri),
            Self::File(p) => write!(f, "{}", p.display()),
            Self::Inline(_) => f.write_str("<inline config>"),
        }
    }
}

/// Transform direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum TransformDirection {
    /// Forward application.
    #[default]
    Forward,
    /// Inverse application.
    Inverse,
}

impl TransformDirection {
    /// Maps an `inverse` flag to a direction.
    #[inline]
    pub fn from_inverse(inverse: bool) -> Self {
        if inverse { Self::Inverse } else { Self::Forward }
    }

    /// True for [`TransformDirection::Inverse`].
    #[inline]
    pub fn is_inverse(self) -> bool {
        self == Self::Inverse
    }

    /// Opposite direction.
    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Inverse,
            Self::Inverse => Self::Forward,
        }
    }
}

/// Interpolation requested for file transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Nearest neighbor.
    Nearest,
    /// Linear.
    Linear,
    /// Tetrahedral (3D LUTs).
    Tetrahedral,
    /// Best quality the engine offers.
    #[default]
    Best,
}

/// Which reference space a color space is defined against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSpace {
    /// Scene-referred reference.
    Scene,
    /// Display-referred reference.
    Display,
}

/// Pixel bit depth a color space advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    /// Not specified by the document.
    #[default]
    Unknown,
    /// 8-bit unsigned integer.
    U8,
    /// 10-bit unsigned integer.
    U10,
    /// 12-bit unsigned integer.
    U12,
    /// 14-bit unsigned integer.
    U14,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 16-bit float.
    F16,
    /// 32-bit float.
    F32,
}

/// Shape of a transform graph node, as far as this layer needs to know.
///
/// Only used to detect 3D lookup tables before running expensive
/// equivalence probes.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformNode {
    /// A 3D LUT.
    Lut3d,
    /// A look reference.
    Look,
    /// A display/view reference.
    DisplayView,
    /// External LUT file.
    File {
        /// File path as written in the document.
        src: String,
    },
    /// Ordered group of transforms.
    Group(Vec<TransformNode>),
    /// Reference to other color spaces (or to a named transform when only
    /// one side is set).
    ColorSpace {
        /// Source color space.
        src: Option<String>,
        /// Destination color space.
        dst: Option<String>,
    },
    /// Matrix, exponent, log or any other analytic op.
    Other,
}

/// Everything the engine knows about one color space.
#[derive(Debug, Clone, Default)]
pub struct ColorSpaceInfo {
    /// Native name.
    pub name: String,
    /// Alternative names.
    pub aliases: Vec<String>,
    /// Non-color data (passthrough).
    pub is_data: bool,
    /// Advertised bit depth.
    pub bit_depth: BitDepth,
    /// Family string (`/`-separated hierarchy).
    pub family: String,
    /// Encoding string.
    pub encoding: String,
    /// Interop id recorded in the document, if the engine supports it.
    pub interop_id: Option<String>,
    /// Transform to the reference space.
    pub to_reference: Option<TransformNode>,
    /// Transform from the reference space.
    pub from_reference: Option<TransformNode>,
}

/// A config-defined named transform.
#[derive(Debug, Clone, Default)]
pub struct NamedTransformInfo {
    /// Native name.
    pub name: String,
    /// Alternative names.
    pub aliases: Vec<String>,
    /// Forward transform graph.
    pub forward: Option<TransformNode>,
}

/// One compile request against a single document.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformRequest<'a> {
    /// Color space to color space.
    ColorSpace {
        /// Source space.
        src: &'a str,
        /// Destination space.
        dst: &'a str,
    },
    /// Looks applied between two spaces.
    Look {
        /// Comma-separated look names.
        looks: &'a str,
        /// Source space.
        src: &'a str,
        /// Destination space.
        dst: &'a str,
    },
    /// Display/view pipeline with optional looks override.
    DisplayView {
        /// Input space.
        src: &'a str,
        /// Display name.
        display: &'a str,
        /// View name.
        view: &'a str,
        /// Looks replacing the view's own looks, if any.
        looks_override: Option<&'a str>,
    },
    /// External LUT or matrix file.
    File {
        /// File path (already joined with the working directory).
        path: &'a str,
        /// Interpolation.
        interpolation: Interpolation,
    },
    /// Config-defined named transform.
    Named {
        /// Named transform name.
        name: &'a str,
    },
}

/// A compiled transform.
pub trait EngineProcessor: Send + Sync + fmt::Debug {
    /// True if the transform does nothing.
    fn is_noop(&self) -> bool;

    /// True if output channels depend on more than one input channel.
    fn has_channel_crosstalk(&self) -> bool;

    /// Transforms packed float pixels in place.
    ///
    /// `data` holds `width * height * channels` values; `channels` is 3 or 4.
    /// Must tolerate concurrent calls on disjoint buffers.
    fn apply(&self, data: &mut [f32], width: usize, height: usize, channels: usize);
}

/// A loaded, read-only configuration document.
pub trait EngineConfig: Send + Sync + fmt::Debug {
    /// Document name.
    fn name(&self) -> String;

    /// Source the document was loaded from, when known.
    fn source(&self) -> Option<ConfigSource> {
        None
    }

    /// Number of color spaces.
    fn num_colorspaces(&self) -> usize;

    /// Color space name at `index`.
    fn colorspace_name_by_index(&self, index: usize) -> Option<String>;

    /// Looks up a color space by name, alias or role.
    fn colorspace(&self, name: &str) -> Option<ColorSpaceInfo>;

    /// Whether `name` is linear relative to the given reference space.
    fn is_colorspace_linear(&self, name: &str, reference: ReferenceSpace) -> bool;

    /// Number of roles.
    fn num_roles(&self) -> usize;

    /// Role name at `index`.
    fn role_name(&self, index: usize) -> Option<String>;

    /// Color space assigned to `role`.
    fn role_colorspace(&self, role: &str) -> Option<String>;

    /// Number of looks.
    fn num_looks(&self) -> usize;

    /// Look name at `index`.
    fn look_name(&self, index: usize) -> Option<String>;

    /// Number of active displays.
    fn num_displays(&self) -> usize;

    /// Display name at `index`.
    fn display_name(&self, index: usize) -> Option<String>;

    /// Default display.
    fn default_display(&self) -> Option<String>;

    /// Number of views for `display` (optionally filtered for an input space).
    fn num_views(&self, display: &str, input_colorspace: Option<&str>) -> usize;

    /// View name at `index` for `display`.
    fn view_name(&self, display: &str, input_colorspace: Option<&str>, index: usize)
    -> Option<String>;

    /// Default view for `display` (optionally for an input space).
    fn default_view(&self, display: &str, input_colorspace: Option<&str>) -> Option<String>;

    /// Color space the view outputs.
    fn display_view_colorspace(&self, display: &str, view: &str) -> Option<String>;

    /// Looks the view applies.
    fn display_view_looks(&self, display: &str, view: &str) -> Option<String>;

    /// Number of named transforms.
    fn num_named_transforms(&self) -> usize;

    /// Named transform name at `index`.
    fn named_transform_name(&self, index: usize) -> Option<String>;

    /// Looks up a named transform by name or alias.
    fn named_transform(&self, name: &str) -> Option<NamedTransformInfo>;

    /// Ambient context of the document.
    fn current_context(&self) -> Context;

    /// Compiles a transform against this document.
    fn processor(
        &self,
        context: &Context,
        request: &TransformRequest<'_>,
        direction: TransformDirection,
    ) -> EngineResult<ProcessorRef>;

    /// Color space selected by the document's file rules.
    fn colorspace_from_filepath(&self, _path: &str) -> Option<String> {
        None
    }

    /// True if only the catch-all file rule matches `path`.
    fn filepath_only_matches_default_rule(&self, _path: &str) -> bool {
        true
    }
}

/// Process-level engine entry point.
pub trait Engine: Send + Sync + fmt::Debug {
    /// Engine name.
    fn name(&self) -> &str;

    /// Version packed as `0xMMmmpp00`.
    fn version_hex(&self) -> u32;

    /// Loads a document.
    fn load_config(&self, source: &ConfigSource) -> EngineResult<ConfigRef>;

    /// The engine's current (environment-selected) document.
    fn current_config(&self) -> EngineResult<ConfigRef>;

    /// True if builtin identification and builtin-targeted processors are
    /// available.
    fn supports_builtin_configs(&self) -> bool {
        false
    }

    /// Names the space of `config` equivalent to `builtin_name` in
    /// `builtin_config`.
    fn identify_builtin_colorspace(
        &self,
        _config: &dyn EngineConfig,
        _builtin_config: &dyn EngineConfig,
        _builtin_name: &str,
    ) -> EngineResult<Option<String>> {
        Err(EngineError::Unsupported("identify_builtin_colorspace".into()))
    }

    /// Processor from `src` in `config` to a builtin reference space.
    fn processor_to_builtin(
        &self,
        _config: &dyn EngineConfig,
        _src: &str,
        _builtin_name: &str,
    ) -> EngineResult<ProcessorRef> {
        Err(EngineError::Unsupported("processor_to_builtin".into()))
    }

    /// Processor bridging two documents.
    fn processor_between_configs(
        &self,
        _context: &Context,
        _src_config: &dyn EngineConfig,
        _src: &str,
        _dst_config: &dyn EngineConfig,
        _dst: &str,
        _direction: TransformDirection,
    ) -> EngineResult<ProcessorRef> {
        Err(EngineError::Unsupported("processor_between_configs".into()))
    }

    /// Composes processors, applied in slice order.
    fn combine(&self, _processors: &[ProcessorRef]) -> EngineResult<ProcessorRef> {
        Err(EngineError::Unsupported("combine".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_source_kinds() {
        assert_eq!(
            ConfigSource::parse("ocio://default"),
            ConfigSource::Uri("ocio://default".into())
        );
        assert!(matches!(
            ConfigSource::parse("ocio_profile_version: 2\nroles: {}"),
            ConfigSource::Inline(_)
        ));
        assert_eq!(
            ConfigSource::parse("/shows/demo/config.ocio").path(),
            Some(Path::new("/shows/demo/config.ocio"))
        );
    }

    #[test]
    fn direction_helpers() {
        assert_eq!(TransformDirection::from_inverse(true), TransformDirection::Inverse);
        assert!(!TransformDirection::default().is_inverse());
        assert_eq!(TransformDirection::Forward.flipped(), TransformDirection::Inverse);
    }
}
