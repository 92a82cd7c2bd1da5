//! Color space classification.
//!
//! Decides which registry entries are "the" sRGB, linear sRGB, ACEScg and
//! Rec709 spaces of a config, even when they carry studio-specific names.
//! Three passes of increasing cost:
//!
//! 1. **Names**: a fixed list of well-known names, run for every entry at
//!    inventory time. A match is final.
//! 2. **Conversions**: lazily, on first query, ask the engine whether the
//!    space round-trips a handful of test colors unchanged against builtin
//!    reference spaces. Data spaces and spaces containing 3D LUTs are
//!    skipped.
//! 3. **Legacy**: engines without builtin-config support get a numeric
//!    check that converting to the known sRGB space yields the sRGB
//!    encoding of the test colors.
//!
//! Independently, [`identify_builtin_equivalents`] asks the engine once, at
//! load time, which spaces are equivalent to the builtin references.

use tracing::debug;

use crate::config::{ColorConfig, ConfigState};
use crate::engine::{Engine, EngineConfig, TransformNode};
use crate::registry::{ClassAlias, Classification, CsFlags};
use crate::settings::Settings;

/// Probe colors: red, green, blue, white, 50% gray.
pub(crate) const TEST_COLORS: [[f32; 3]; 5] = [
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
    [0.5, 0.5, 0.5],
];

/// Per-channel tolerance for probe comparisons.
pub(crate) const PROBE_TOLERANCE: f32 = 1.0e-3;

/// Nesting limit for transform graph walks.
const MAX_WALK_DEPTH: usize = 32;

const SRGB_NAMES: &[&str] = &[
    "srgb_rec709_scene",
    "srgb_tx",
    "srgb_texture",
    "srgb texture",
    "sRGB - Texture",
    "sRGB",
];
const LIN_SRGB_NAMES: &[&str] = &[
    "lin_rec709_scene",
    "lin_rec709",
    "Linear Rec.709 (sRGB)",
    "lin_srgb",
    "linear",
];
const ACESCG_NAMES: &[&str] = &["ACEScg", "lin_ap1_scene", "lin_ap1"];
const REC709_NAMES: &[&str] = &["Rec709"];

/// Builtin reference spaces probed by the conversion pass, with the flags
/// a match implies.
const BUILTIN_REFERENCES: [(&str, CsFlags, ClassAlias); 3] = [
    ("srgb_tx", CsFlags::SRGB, ClassAlias::Srgb),
    (
        "lin_srgb",
        CsFlags::LIN_SRGB.union(CsFlags::LINEAR_RESPONSE),
        ClassAlias::LinSrgb,
    ),
    (
        "ACEScg",
        CsFlags::ACESCG.union(CsFlags::LINEAR_RESPONSE),
        ClassAlias::AcesCg,
    ),
];

/// Fallback inventory used without a usable engine document.
const FALLBACK_LINEAR: &[&str] = &[
    "linear",
    "scene_linear",
    "default",
    "rgb",
    "lin_rec709_scene",
    "lin_srgb",
    "lin_rec709",
];
const FALLBACK_SRGB: &[&str] = &["srgb_rec709_scene", "sRGB"];
const FALLBACK_REC709: &[&str] = &["Rec709"];

/// Name pass: classification implied by a well-known name, if any.
pub fn classify_by_name(name: &str) -> Option<Classification> {
    let matches = |list: &[&str]| list.iter().any(|n| n.eq_ignore_ascii_case(name));
    let (flags, alias) = if matches(SRGB_NAMES) {
        (CsFlags::SRGB, ClassAlias::Srgb)
    } else if matches(LIN_SRGB_NAMES) {
        (CsFlags::LIN_SRGB | CsFlags::LINEAR_RESPONSE, ClassAlias::LinSrgb)
    } else if matches(ACESCG_NAMES) {
        (CsFlags::ACESCG | CsFlags::LINEAR_RESPONSE, ClassAlias::AcesCg)
    } else if matches(REC709_NAMES) {
        (CsFlags::REC709, ClassAlias::Rec709)
    } else {
        return None;
    };
    Some(Classification {
        flags,
        alias: Some(alias),
    })
}

/// Fills the registry from the live document, or with the fallback names
/// when there is none (or it only declares data spaces).
pub(crate) fn inventory(state: &mut ConfigState, engine_enabled: bool) {
    if let Some(config) = state.config.clone().filter(|_| engine_enabled) {
        let n = config.num_colorspaces();
        let names: Vec<String> = (0..n)
            .filter_map(|i| config.colorspace_name_by_index(i))
            .collect();
        let nonraw = names
            .iter()
            .any(|name| config.colorspace(name).is_some_and(|cs| !cs.is_data));
        if nonraw {
            for (i, name) in names.iter().enumerate() {
                state.registry.add(name, i, CsFlags::NONE);
            }
            name_pass(state);
            if let Some(lin) = config.colorspace(crate::engine::ROLE_SCENE_LINEAR) {
                state.registry.set_alias(ClassAlias::SceneLinear, &lin.name);
            }
            debug!(count = n, "inventoried engine color spaces");
            return;
        }
        debug!("color config only declares data spaces, using builtin names");
    }
    state.config = None;

    let linflags = CsFlags::LINEAR_RESPONSE | CsFlags::SCENE_LINEAR | CsFlags::LIN_SRGB;
    for name in FALLBACK_LINEAR {
        state.registry.add(name, 0, linflags);
    }
    for name in FALLBACK_SRGB {
        state.registry.add(name, 1, CsFlags::SRGB);
    }
    for name in FALLBACK_REC709 {
        state.registry.add(name, 2, CsFlags::REC709);
    }
    name_pass(state);
}

fn name_pass(state: &ConfigState) {
    for pos in 0..state.registry.len() {
        let Some(name) = state.registry.name_at(pos) else {
            continue;
        };
        if let Some(result) = classify_by_name(&name) {
            debug!(%name, flags = ?result.flags, "classified by name");
            state.registry.mark_classified(pos, result);
        }
    }
}

/// Names the live space equivalent to a builtin reference: the interop
/// identities document is tried first, then the builtin default.
fn identify_builtin(
    state: &ConfigState,
    engine: &dyn Engine,
    builtin_name: &str,
) -> Option<String> {
    let config = state.config.as_deref()?;
    [state.interop.as_deref(), state.builtin.as_deref()]
        .into_iter()
        .flatten()
        .find_map(|reference| {
            engine
                .identify_builtin_colorspace(config, reference, builtin_name)
                .ok()
                .flatten()
                .filter(|n| !n.is_empty())
        })
}

/// Tags the spaces the engine identifies as the builtin references.
pub(crate) fn identify_builtin_equivalents(
    state: &ConfigState,
    engine: Option<&dyn Engine>,
    settings: &Settings,
) {
    let Some(engine) = engine else { return };
    if !settings.builtin_probing() || !engine.supports_builtin_configs() {
        return;
    }
    for (builtin_name, flags, alias) in BUILTIN_REFERENCES {
        match identify_builtin(state, engine, builtin_name) {
            Some(name) => {
                if state.registry.accrete(&name, flags, Some(alias)) {
                    debug!(%name, builtin = builtin_name, "identified builtin equivalent");
                }
            }
            None => debug!(builtin = builtin_name, "no equivalent color space identified"),
        }
    }
}

/// True if `node` (or anything it references) contains a 3D LUT.
///
/// Look and display/view references count as LUTs. File transforms
/// count unless they are `.spi1d` or `.spimtx`.
pub fn transform_has_lut3d(node: &TransformNode, config: Option<&dyn EngineConfig>) -> bool {
    walk_lut3d(node, config, 0)
}

fn walk_lut3d(node: &TransformNode, config: Option<&dyn EngineConfig>, depth: usize) -> bool {
    if depth > MAX_WALK_DEPTH {
        return false;
    }
    match node {
        TransformNode::Lut3d | TransformNode::Look | TransformNode::DisplayView => true,
        TransformNode::File { src } => {
            let src = src.to_ascii_lowercase();
            !(src.ends_with(".spi1d") || src.ends_with(".spimtx"))
        }
        TransformNode::Group(children) => {
            children.iter().any(|c| walk_lut3d(c, config, depth + 1))
        }
        TransformNode::ColorSpace { src, dst } => {
            let Some(config) = config else { return false };
            match (src.as_deref(), dst.as_deref()) {
                (None, None) => false,
                (Some(one), None) | (None, Some(one)) => config
                    .named_transform(one)
                    .and_then(|nt| nt.forward)
                    .is_some_and(|fwd| walk_lut3d(&fwd, Some(config), depth + 1)),
                (Some(src), Some(dst)) => [src, dst]
                    .into_iter()
                    .filter_map(|name| config.colorspace(name))
                    .flat_map(|cs| [cs.to_reference, cs.from_reference])
                    .flatten()
                    .any(|t| walk_lut3d(&t, Some(config), depth + 1)),
            }
        }
        TransformNode::Other => false,
    }
}

/// True if every probe color matches within tolerance.
pub(crate) fn close_colors(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| (x - y).abs() <= PROBE_TOLERANCE)
}

/// Standard linear to sRGB transfer.
pub(crate) fn linear_to_srgb(x: f32) -> f32 {
    if x <= 0.003_130_8 {
        x * 12.92
    } else {
        1.055 * x.powf(1.0 / 2.4) - 0.055
    }
}

fn flat_test_colors() -> Vec<f32> {
    TEST_COLORS.iter().flatten().copied().collect()
}

impl ColorConfig {
    /// Runs the lazy classification passes for the entry at `pos`.
    ///
    /// Safe to call from many threads: the engine is probed with no lock
    /// held and the first commit wins.
    pub(crate) fn examine(&self, pos: usize) {
        let Some(entry) = self.registry().begin_classify(pos) else {
            return;
        };
        let name = entry.name();
        let mut result = Classification::default();

        if self.is_colorspace_linear(name) {
            result.flags |= CsFlags::LINEAR_RESPONSE;
        }

        if !entry.flags().intersects(CsFlags::KNOWN) && !self.state.config_is_builtin {
            if let Some(found) = self.classify_by_conversions(name) {
                result.flags |= found.flags;
                result.alias = found.alias;
            }
        }

        let known = (entry.flags() | result.flags).intersects(CsFlags::KNOWN);
        let legacy_engine = self
            .engine()
            .is_some_and(|engine| !engine.supports_builtin_configs());
        if !known && legacy_engine {
            if let Some(found) = self.reclassify_heuristically(name) {
                result.flags |= found.flags;
                result.alias = found.alias;
            }
        }

        let committed = self.registry().commit_classification(pos, result);
        debug!(%name, flags = ?result.flags, committed, "examined color space");
    }

    /// Examines the first entry named `name`, if any.
    pub(crate) fn examine_name(&self, name: &str) {
        if let Some(pos) = self.registry().position(name) {
            self.examine(pos);
        }
    }

    fn classify_by_conversions(&self, name: &str) -> Option<Classification> {
        let engine = self.engine()?;
        let config = self.live()?;
        if !engine.supports_builtin_configs() {
            return None;
        }
        let cs = config.colorspace(name)?;
        // Data spaces convert as a no-op and would match every reference.
        if cs.is_data {
            return None;
        }
        let has_lut = [cs.to_reference.as_ref(), cs.from_reference.as_ref()]
            .into_iter()
            .flatten()
            .any(|t| transform_has_lut3d(t, Some(config.as_ref())));
        if has_lut {
            debug!(%name, "skipping equivalence probe, transform has a 3D LUT");
            return None;
        }
        BUILTIN_REFERENCES
            .into_iter()
            .find(|(builtin, _, _)| self.same_as_builtin(name, builtin))
            .map(|(_, flags, alias)| Classification {
                flags,
                alias: Some(alias),
            })
    }

    /// True if converting `name` to the builtin space leaves the probe
    /// colors unchanged.
    fn same_as_builtin(&self, name: &str, builtin: &str) -> bool {
        if !self.settings.builtin_probing() {
            return false;
        }
        let (Some(engine), Some(config)) = (self.engine(), self.live()) else {
            return false;
        };
        let Ok(processor) = engine.processor_to_builtin(config.as_ref(), name, builtin) else {
            return false;
        };
        let expected = flat_test_colors();
        let mut colors = expected.clone();
        processor.apply(&mut colors, TEST_COLORS.len(), 1, 3);
        close_colors(&colors, &expected)
    }

    fn reclassify_heuristically(&self, name: &str) -> Option<Classification> {
        let srgb = self.registry().alias(ClassAlias::Srgb);
        if srgb.is_empty() {
            return None;
        }
        let expected: Vec<f32> = flat_test_colors().into_iter().map(linear_to_srgb).collect();
        if self.test_conversion_yields(name, &srgb, &expected) {
            Some(Classification {
                flags: CsFlags::LIN_SRGB | CsFlags::LINEAR_RESPONSE,
                alias: Some(ClassAlias::LinSrgb),
            })
        } else {
            None
        }
    }

    /// True if converting the probe colors `from` -> `to` yields `expected`.
    fn test_conversion_yields(&self, from: &str, to: &str, expected: &[f32]) -> bool {
        let handle = self.create_color_processor(from, to, "", "");
        let Some(processor) = handle.get() else {
            return false;
        };
        let mut colors = flat_test_colors();
        processor.apply(&mut colors, TEST_COLORS.len(), 1, 3);
        close_colors(&colors, expected)
    }
}
