//! Test double of a color engine.
//!
//! Documents are small YAML files describing each color space by a
//! transfer curve and a set of primaries (`transfer: srgb`,
//! `primaries: rec709`). Processors are built from those signatures with
//! real math, so equivalence probes, builtin identification and pixel
//! results behave like a real engine would for the same spaces.
//!
//! Every compile goes through atomic counters, letting tests check that
//! the cache kept the engine from being asked twice.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::{Mat3, Vec3};
use serde::Deserialize;

use vfx_colorconfig::interop::{INTEROP_IDENTITIES, INTEROP_IDENTITIES_CONFIG};
use vfx_colorconfig::{
    BitDepth, ColorConfig, ColorSpaceInfo, ConfigRef, ConfigSource, Context, Engine,
    EngineConfig, EngineError, EngineProcessor, EngineResult, NamedTransformInfo, ProcessorRef,
    ReferenceSpace, Settings, TransformDirection, TransformNode, TransformRequest,
};

// ============================================================================
// Documents
// ============================================================================

/// The engine's `ocio://default` document.
pub const BUILTIN_CONFIG: &str = r#"
name: mock-builtin-default
roles:
  scene_linear: ACEScg
  data: Raw
colorspaces:
  - {name: ACES2065-1, family: ACES, transfer: linear, primaries: ap0}
  - {name: ACEScg, family: ACES, transfer: linear, primaries: ap1}
  - {name: lin_srgb, aliases: [Linear Rec.709 (sRGB)], transfer: linear, primaries: rec709}
  - {name: srgb_tx, aliases: [sRGB - Texture], transfer: srgb, primaries: rec709}
  - {name: g22_rec709_tx, transfer: g22, primaries: rec709}
  - {name: Raw, data: true}
displays:
  - name: sRGB - Display
    views:
      - {name: ACES 1.0 - SDR Video, colorspace: srgb_tx}
"#;

/// What the engine reports as its current config when nothing else is set
/// up: a single raw space, which is too small to be useful.
pub const RAW_CONFIG: &str = r#"
name: raw
colorspaces:
  - {name: raw, data: true}
"#;

/// A studio document with renamed spaces, displays, looks, named
/// transforms, file rules and a context variable.
pub const STUDIO_CONFIG: &str = r#"
name: studio
environment:
  GRADE: linear
roles:
  scene_linear: ACEScg
  texture_paint: Utility - sRGB - Texture
colorspaces:
  - name: ACEScg
    aliases: [cg]
    family: ACES
    bitdepth: f32
    transfer: linear
    primaries: ap1
  - name: ACES2065-1
    family: ACES
    bitdepth: f16
    interop_id: lin_ap0_scene
    transfer: linear
    primaries: ap0
  - name: Utility - sRGB - Texture
    aliases: [srgb_texture_util]
    family: Utility
    bitdepth: u8
    transfer: srgb
    primaries: rec709
  - name: studio_texture
    bitdepth: u10
    transfer: srgb
    primaries: rec709
  - name: baked_texture
    transfer: srgb
    primaries: rec709
    lut3d: true
  - name: Utility - Linear - Rec.709
    transfer: linear
    primaries: rec709
  - name: Gamma 2.2 Rec.709
    transfer: g22
    primaries: rec709
  - name: shot_grade
    transfer: $GRADE
    primaries: rec709
  - name: Output - sRGB
    transfer: srgb
    primaries: rec709
  - name: Raw
    data: true
  - name: explode
    transfer: linear
    primaries: rec709
    panic: true
displays:
  - name: sRGB Monitor
    views:
      - {name: Film, colorspace: Output - sRGB, looks: warm}
      - {name: Raw, colorspace: Raw}
  - name: Gamma Monitor
    views:
      - {name: Standard, colorspace: Gamma 2.2 Rec.709}
      - {name: Shared, colorspace: <USE_DISPLAY_NAME>}
looks:
  - {name: warm, gain: 1.25}
  - {name: dim, gain: 0.5}
named_transforms:
  - {name: cg_to_texture, aliases: [to_tex], from: ACEScg, to: Utility - sRGB - Texture}
file_rules:
  - {extension: exr, colorspace: ACEScg}
  - {extension: cube, colorspace: ACEScg}
  - {extension: png, colorspace: Utility - sRGB - Texture}
default_rule: Raw
"#;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct DocSpec {
    name: String,
    environment: BTreeMap<String, String>,
    roles: BTreeMap<String, String>,
    colorspaces: Vec<SpaceSpec>,
    displays: Vec<DisplaySpec>,
    looks: Vec<LookSpec>,
    named_transforms: Vec<NamedSpec>,
    file_rules: Vec<RuleSpec>,
    default_rule: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SpaceSpec {
    name: String,
    aliases: Vec<String>,
    family: String,
    bitdepth: Option<String>,
    transfer: String,
    primaries: String,
    data: bool,
    lut3d: bool,
    interop_id: Option<String>,
    panic: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct DisplaySpec {
    name: String,
    views: Vec<ViewSpec>,
}

#[derive(Debug, Clone, Deserialize)]
struct ViewSpec {
    name: String,
    colorspace: String,
    #[serde(default)]
    looks: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct LookSpec {
    name: String,
    gain: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct NamedSpec {
    name: String,
    #[serde(default)]
    aliases: Vec<String>,
    from: String,
    to: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RuleSpec {
    extension: String,
    colorspace: String,
}

fn parse_doc(text: &str) -> EngineResult<DocSpec> {
    serde_yaml::from_str(text).map_err(|e| EngineError::msg(format!("bad mock config: {e}")))
}

/// The interop identities document, one space per id with the signature
/// spelled out in the id (`srgb_rec709_scene`: sRGB curve, Rec.709).
fn interop_doc() -> DocSpec {
    let colorspaces = INTEROP_IDENTITIES
        .iter()
        .map(|row| {
            let mut parts = row.id.split('_');
            let transfer = parts.next().unwrap_or_default();
            let primaries = parts.next().unwrap_or_default();
            SpaceSpec {
                name: row.id.to_string(),
                transfer: transfer.to_string(),
                primaries: primaries.to_string(),
                data: row.id == "data",
                interop_id: Some(row.id.to_string()),
                ..SpaceSpec::default()
            }
        })
        .collect();
    let mut roles = BTreeMap::new();
    roles.insert("scene_linear".to_string(), "lin_ap1_scene".to_string());
    DocSpec {
        name: "interop-identities".to_string(),
        roles,
        colorspaces,
        ..DocSpec::default()
    }
}

// ============================================================================
// Color math
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Transfer {
    Linear,
    Srgb,
    Gamma(f32),
}

impl Transfer {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" | "lin" => Some(Self::Linear),
            "srgb" => Some(Self::Srgb),
            "g18" => Some(Self::Gamma(1.8)),
            "g22" => Some(Self::Gamma(2.2)),
            "g24" => Some(Self::Gamma(2.4)),
            "g26" => Some(Self::Gamma(2.6)),
            _ => None,
        }
    }

    fn decode(self, v: f32) -> f32 {
        match self {
            Self::Linear => v,
            Self::Srgb if v <= 0.040_45 => v / 12.92,
            Self::Srgb => ((v + 0.055) / 1.055).powf(2.4),
            Self::Gamma(g) => v.signum() * v.abs().powf(g),
        }
    }

    fn encode(self, v: f32) -> f32 {
        match self {
            Self::Linear => v,
            Self::Srgb if v <= 0.003_130_8 => v * 12.92,
            Self::Srgb => 1.055 * v.powf(1.0 / 2.4) - 0.055,
            Self::Gamma(g) => v.signum() * v.abs().powf(1.0 / g),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Primaries {
    Rec709,
    P3D65,
    Rec2020,
    Ap1,
    Ap0,
}

impl Primaries {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rec709" => Some(Self::Rec709),
            "p3d65" => Some(Self::P3D65),
            "rec2020" => Some(Self::Rec2020),
            "ap1" => Some(Self::Ap1),
            "ap0" => Some(Self::Ap0),
            _ => None,
        }
    }

    /// Red, green, blue and white chromaticities.
    fn xy(self) -> [[f32; 2]; 4] {
        const D65: [f32; 2] = [0.3127, 0.3290];
        const ACES_WHITE: [f32; 2] = [0.32168, 0.33767];
        match self {
            Self::Rec709 => [[0.64, 0.33], [0.30, 0.60], [0.15, 0.06], D65],
            Self::P3D65 => [[0.68, 0.32], [0.265, 0.69], [0.15, 0.06], D65],
            Self::Rec2020 => [[0.708, 0.292], [0.170, 0.797], [0.131, 0.046], D65],
            Self::Ap1 => [[0.713, 0.293], [0.165, 0.830], [0.128, 0.044], ACES_WHITE],
            Self::Ap0 => [[0.7347, 0.2653], [0.0, 1.0], [0.0001, -0.077], ACES_WHITE],
        }
    }

    fn to_xyz(self) -> Mat3 {
        let xyz = |[x, y]: [f32; 2]| Vec3::new(x / y, 1.0, (1.0 - x - y) / y);
        let [r, g, b, w] = self.xy();
        let m = Mat3::from_cols(xyz(r), xyz(g), xyz(b));
        let s = m.inverse() * xyz(w);
        Mat3::from_cols(m.x_axis * s.x, m.y_axis * s.y, m.z_axis * s.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Signature {
    Data,
    Color(Transfer, Primaries),
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Decode(Transfer),
    Encode(Transfer),
    Matrix(Mat3),
    Gain(f32),
}

impl Step {
    fn inverse(self) -> Self {
        match self {
            Self::Decode(t) => Self::Encode(t),
            Self::Encode(t) => Self::Decode(t),
            Self::Matrix(m) => Self::Matrix(m.inverse()),
            Self::Gain(g) => Self::Gain(1.0 / g),
        }
    }

    fn apply(self, rgb: Vec3) -> Vec3 {
        match self {
            Self::Decode(t) => Vec3::new(t.decode(rgb.x), t.decode(rgb.y), t.decode(rgb.z)),
            Self::Encode(t) => Vec3::new(t.encode(rgb.x), t.encode(rgb.y), t.encode(rgb.z)),
            Self::Matrix(m) => m * rgb,
            Self::Gain(g) => rgb * g,
        }
    }
}

fn invert(steps: Vec<Step>) -> Vec<Step> {
    steps.into_iter().rev().map(Step::inverse).collect()
}

/// Steps converting `src` to `dst`. Data spaces pass through.
fn conversion(src: Signature, dst: Signature) -> Vec<Step> {
    let (Signature::Color(st, sp), Signature::Color(dt, dp)) = (src, dst) else {
        return Vec::new();
    };
    let mut steps = Vec::new();
    if st == dt && sp == dp {
        return steps;
    }
    if st != Transfer::Linear {
        steps.push(Step::Decode(st));
    }
    if sp != dp {
        steps.push(Step::Matrix(dp.to_xyz().inverse() * sp.to_xyz()));
    }
    if dt != Transfer::Linear {
        steps.push(Step::Encode(dt));
    }
    steps
}

/// Steps converting `src` to `dst` with gains applied in the linear
/// version of `src`.
fn graded(src: Signature, dst: Signature, gains: &[f32]) -> Vec<Step> {
    let working = match src {
        Signature::Color(_, p) => Signature::Color(Transfer::Linear, p),
        Signature::Data => Signature::Data,
    };
    let mut steps = conversion(src, working);
    steps.extend(gains.iter().map(|&g| Step::Gain(g)));
    steps.extend(conversion(working, dst));
    steps
}

/// Signature of `name` in any document, with `$VAR`s expanded.
fn signature(config: &dyn EngineConfig, name: &str, context: &Context) -> EngineResult<Signature> {
    let info = config
        .colorspace(name)
        .ok_or_else(|| EngineError::ColorSpaceNotFound { name: name.to_string() })?;
    if info.is_data {
        return Ok(Signature::Data);
    }
    let encoding = context.resolve(&info.encoding);
    let (transfer, primaries) = encoding.split_once('/').unwrap_or((encoding.as_str(), ""));
    match (Transfer::parse(transfer), Primaries::parse(primaries)) {
        (Some(t), Some(p)) => Ok(Signature::Color(t, p)),
        _ => Err(EngineError::msg(format!(
            "no mock math for \"{}\" ({encoding})",
            info.name
        ))),
    }
}

// ============================================================================
// Processors
// ============================================================================

/// A compiled mock transform.
#[derive(Debug)]
enum MockProcessor {
    /// Per-pixel steps on RGB.
    Steps(Vec<Step>),
    /// Processors applied in order.
    Chain(Vec<ProcessorRef>),
}

impl EngineProcessor for MockProcessor {
    fn is_noop(&self) -> bool {
        match self {
            Self::Steps(steps) => steps.is_empty(),
            Self::Chain(chain) => chain.iter().all(|p| p.is_noop()),
        }
    }

    fn has_channel_crosstalk(&self) -> bool {
        match self {
            Self::Steps(steps) => steps.iter().any(|s| matches!(s, Step::Matrix(_))),
            Self::Chain(chain) => chain.iter().any(|p| p.has_channel_crosstalk()),
        }
    }

    fn apply(&self, data: &mut [f32], width: usize, height: usize, channels: usize) {
        match self {
            Self::Steps(steps) => {
                for px in data.chunks_exact_mut(channels).take(width * height) {
                    let rgb = steps
                        .iter()
                        .fold(Vec3::new(px[0], px[1], px[2]), |rgb, step| step.apply(rgb));
                    px[..3].copy_from_slice(&rgb.to_array());
                }
            }
            Self::Chain(chain) => {
                for p in chain {
                    p.apply(data, width, height, channels);
                }
            }
        }
    }
}

// ============================================================================
// Documents as engine configs
// ============================================================================

/// Compile counters shared by an engine and every document it loaded.
#[derive(Debug, Default)]
pub struct Counters {
    /// Calls to `EngineConfig::processor`.
    pub compiles: AtomicUsize,
    /// Calls to `Engine::processor_between_configs`.
    pub bridges: AtomicUsize,
    /// Calls to `Engine::processor_to_builtin`.
    pub probes: AtomicUsize,
}

/// One loaded mock document.
#[derive(Debug)]
pub struct MockConfig {
    doc: DocSpec,
    source: Option<ConfigSource>,
    counters: Arc<Counters>,
}

impl MockConfig {
    fn space(&self, name: &str) -> Option<&SpaceSpec> {
        let by_name = |n: &str| {
            self.doc.colorspaces.iter().find(|cs| {
                cs.name.eq_ignore_ascii_case(n) || cs.aliases.iter().any(|a| a.eq_ignore_ascii_case(n))
            })
        };
        by_name(name).or_else(|| {
            self.doc
                .roles
                .iter()
                .find(|(role, _)| role.eq_ignore_ascii_case(name))
                .and_then(|(_, cs)| by_name(cs))
        })
    }

    fn view(&self, display: &str, view: &str) -> Option<&ViewSpec> {
        self.doc
            .displays
            .iter()
            .find(|d| d.name == display)?
            .views
            .iter()
            .find(|v| v.name == view)
    }

    fn views(&self, display: &str) -> &[ViewSpec] {
        self.doc
            .displays
            .iter()
            .find(|d| d.name == display)
            .map_or(&[], |d| d.views.as_slice())
    }

    /// Gains of a comma-separated look list; `-name` inverts a look.
    fn look_gains(&self, looks: &str) -> EngineResult<Vec<f32>> {
        looks
            .split(',')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| {
                let (name, inverse) = match l.strip_prefix('-') {
                    Some(rest) => (rest, true),
                    None => (l.trim_start_matches('+'), false),
                };
                let look = self
                    .doc
                    .looks
                    .iter()
                    .find(|look| look.name == name)
                    .ok_or_else(|| EngineError::msg(format!("look not found: {name}")))?;
                Ok(if inverse { 1.0 / look.gain } else { look.gain })
            })
            .collect()
    }

    fn matched_rule(&self, path: &str) -> Option<&RuleSpec> {
        let ext = Path::new(path).extension()?.to_str()?;
        self.doc
            .file_rules
            .iter()
            .find(|r| r.extension.eq_ignore_ascii_case(ext))
    }

    fn check_panic(&self, name: &str) {
        if self.space(name).is_some_and(|cs| cs.panic) {
            panic!("mock engine blew up compiling {name}");
        }
    }
}

fn info(cs: &SpaceSpec) -> ColorSpaceInfo {
    let bit_depth = match cs.bitdepth.as_deref() {
        Some("u8") => BitDepth::U8,
        Some("u10") => BitDepth::U10,
        Some("u12") => BitDepth::U12,
        Some("u16") => BitDepth::U16,
        Some("f16") => BitDepth::F16,
        Some("f32") => BitDepth::F32,
        _ => BitDepth::Unknown,
    };
    let node = if cs.lut3d {
        TransformNode::Group(vec![TransformNode::Other, TransformNode::Lut3d])
    } else {
        TransformNode::Other
    };
    ColorSpaceInfo {
        name: cs.name.clone(),
        aliases: cs.aliases.clone(),
        is_data: cs.data,
        bit_depth,
        family: cs.family.clone(),
        encoding: if cs.data {
            "data".to_string()
        } else {
            format!("{}/{}", cs.transfer, cs.primaries)
        },
        interop_id: cs.interop_id.clone(),
        to_reference: Some(node),
        from_reference: None,
    }
}

impl EngineConfig for MockConfig {
    fn name(&self) -> String {
        self.doc.name.clone()
    }

    fn source(&self) -> Option<ConfigSource> {
        self.source.clone()
    }

    fn num_colorspaces(&self) -> usize {
        self.doc.colorspaces.len()
    }

    fn colorspace_name_by_index(&self, index: usize) -> Option<String> {
        self.doc.colorspaces.get(index).map(|cs| cs.name.clone())
    }

    fn colorspace(&self, name: &str) -> Option<ColorSpaceInfo> {
        self.space(name).map(info)
    }

    fn is_colorspace_linear(&self, name: &str, reference: ReferenceSpace) -> bool {
        reference == ReferenceSpace::Scene
            && matches!(
                signature(self, name, &self.current_context()),
                Ok(Signature::Color(Transfer::Linear, _))
            )
    }

    fn num_roles(&self) -> usize {
        self.doc.roles.len()
    }

    fn role_name(&self, index: usize) -> Option<String> {
        self.doc.roles.keys().nth(index).cloned()
    }

    fn role_colorspace(&self, role: &str) -> Option<String> {
        self.doc.roles.get(role).cloned()
    }

    fn num_looks(&self) -> usize {
        self.doc.looks.len()
    }

    fn look_name(&self, index: usize) -> Option<String> {
        self.doc.looks.get(index).map(|l| l.name.clone())
    }

    fn num_displays(&self) -> usize {
        self.doc.displays.len()
    }

    fn display_name(&self, index: usize) -> Option<String> {
        self.doc.displays.get(index).map(|d| d.name.clone())
    }

    fn default_display(&self) -> Option<String> {
        self.display_name(0)
    }

    fn num_views(&self, display: &str, _input_colorspace: Option<&str>) -> usize {
        self.views(display).len()
    }

    fn view_name(&self, display: &str, _input_colorspace: Option<&str>, index: usize) -> Option<String> {
        self.views(display).get(index).map(|v| v.name.clone())
    }

    fn default_view(&self, display: &str, input_colorspace: Option<&str>) -> Option<String> {
        self.view_name(display, input_colorspace, 0)
    }

    fn display_view_colorspace(&self, display: &str, view: &str) -> Option<String> {
        self.view(display, view).map(|v| v.colorspace.clone())
    }

    fn display_view_looks(&self, display: &str, view: &str) -> Option<String> {
        self.view(display, view).and_then(|v| v.looks.clone())
    }

    fn num_named_transforms(&self) -> usize {
        self.doc.named_transforms.len()
    }

    fn named_transform_name(&self, index: usize) -> Option<String> {
        self.doc.named_transforms.get(index).map(|nt| nt.name.clone())
    }

    fn named_transform(&self, name: &str) -> Option<NamedTransformInfo> {
        self.doc
            .named_transforms
            .iter()
            .find(|nt| nt.name == name || nt.aliases.iter().any(|a| a == name))
            .map(|nt| NamedTransformInfo {
                name: nt.name.clone(),
                aliases: nt.aliases.clone(),
                forward: Some(TransformNode::ColorSpace {
                    src: Some(nt.from.clone()),
                    dst: Some(nt.to.clone()),
                }),
            })
    }

    fn current_context(&self) -> Context {
        let mut context = Context::new();
        for (k, v) in &self.doc.environment {
            context.set(k.as_str(), v.as_str());
        }
        context
    }

    fn processor(
        &self,
        context: &Context,
        request: &TransformRequest<'_>,
        direction: TransformDirection,
    ) -> EngineResult<ProcessorRef> {
        self.counters.compiles.fetch_add(1, Ordering::SeqCst);
        let steps = match *request {
            TransformRequest::ColorSpace { src, dst } => {
                self.check_panic(src);
                self.check_panic(dst);
                conversion(signature(self, src, context)?, signature(self, dst, context)?)
            }
            TransformRequest::Look { looks, src, dst } => graded(
                signature(self, src, context)?,
                signature(self, dst, context)?,
                &self.look_gains(looks)?,
            ),
            TransformRequest::DisplayView {
                src,
                display,
                view,
                looks_override,
            } => {
                let target = self
                    .view(display, view)
                    .ok_or_else(|| EngineError::msg(format!("no view {display}/{view}")))?;
                let looks = looks_override
                    .map(str::to_string)
                    .or_else(|| target.looks.clone())
                    .unwrap_or_default();
                graded(
                    signature(self, src, context)?,
                    signature(self, &target.colorspace, context)?,
                    &self.look_gains(&looks)?,
                )
            }
            TransformRequest::File { path, .. } => {
                let text = fs::read_to_string(path)?;
                let gain = text
                    .trim()
                    .strip_prefix("gain ")
                    .and_then(|g| g.trim().parse::<f32>().ok())
                    .ok_or_else(|| EngineError::msg(format!("unreadable transform file {path}")))?;
                vec![Step::Gain(gain)]
            }
            TransformRequest::Named { name } => {
                let nt = self
                    .named_transform(name)
                    .and_then(|nt| match nt.forward {
                        Some(TransformNode::ColorSpace { src: Some(s), dst: Some(d) }) => Some((s, d)),
                        _ => None,
                    })
                    .ok_or_else(|| EngineError::msg(format!("no named transform {name}")))?;
                conversion(signature(self, &nt.0, context)?, signature(self, &nt.1, context)?)
            }
        };
        let steps = if direction.is_inverse() { invert(steps) } else { steps };
        Ok(Arc::new(MockProcessor::Steps(steps)))
    }

    fn colorspace_from_filepath(&self, path: &str) -> Option<String> {
        self.matched_rule(path)
            .map(|r| r.colorspace.clone())
            .or_else(|| self.doc.default_rule.clone())
    }

    fn filepath_only_matches_default_rule(&self, path: &str) -> bool {
        self.matched_rule(path).is_none()
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Mock engine. Builtin identification is supported unless built with
/// [`MockEngine::legacy`].
#[derive(Debug)]
pub struct MockEngine {
    builtin: ConfigRef,
    interop: ConfigRef,
    current: ConfigRef,
    builtin_support: bool,
    counters: Arc<Counters>,
}

impl MockEngine {
    pub fn new() -> Self {
        let counters = Arc::new(Counters::default());
        let doc = |d: DocSpec, source: Option<ConfigSource>| -> ConfigRef {
            Arc::new(MockConfig {
                doc: d,
                source,
                counters: counters.clone(),
            })
        };
        let builtin = parse_doc(BUILTIN_CONFIG).unwrap();
        let raw = parse_doc(RAW_CONFIG).unwrap();
        Self {
            builtin: doc(builtin, Some(ConfigSource::builtin_default())),
            interop: doc(interop_doc(), None),
            current: doc(raw, None),
            builtin_support: true,
            counters: counters.clone(),
        }
    }

    /// Engine without builtin identification or builtin processors.
    pub fn legacy() -> Self {
        Self {
            builtin_support: false,
            ..Self::new()
        }
    }

    /// Replaces the current (environment) config.
    pub fn with_current(mut self, text: &str) -> Self {
        self.current = self.make(text, None).unwrap();
        self
    }

    fn make(&self, text: &str, source: Option<ConfigSource>) -> EngineResult<ConfigRef> {
        Ok(Arc::new(MockConfig {
            doc: parse_doc(text)?,
            source,
            counters: self.counters.clone(),
        }))
    }

    pub fn compiles(&self) -> usize {
        self.counters.compiles.load(Ordering::SeqCst)
    }

    pub fn bridges(&self) -> usize {
        self.counters.bridges.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.counters.probes.load(Ordering::SeqCst)
    }
}

impl Engine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    fn version_hex(&self) -> u32 {
        0x0204_0000
    }

    fn load_config(&self, source: &ConfigSource) -> EngineResult<ConfigRef> {
        match source {
            ConfigSource::Uri(uri) if uri == "ocio://default" => Ok(self.builtin.clone()),
            ConfigSource::Uri(uri) => Err(EngineError::msg(format!("unknown builtin config {uri}"))),
            ConfigSource::Inline(text) if text == INTEROP_IDENTITIES_CONFIG => Ok(self.interop.clone()),
            ConfigSource::Inline(text) => self.make(text, None),
            ConfigSource::File(path) => {
                let text = fs::read_to_string(path)?;
                self.make(&text, Some(source.clone()))
            }
        }
    }

    fn current_config(&self) -> EngineResult<ConfigRef> {
        Ok(self.current.clone())
    }

    fn supports_builtin_configs(&self) -> bool {
        self.builtin_support
    }

    fn identify_builtin_colorspace(
        &self,
        config: &dyn EngineConfig,
        builtin_config: &dyn EngineConfig,
        builtin_name: &str,
    ) -> EngineResult<Option<String>> {
        if !self.builtin_support {
            return Err(EngineError::Unsupported("identify_builtin_colorspace".into()));
        }
        let target = signature(builtin_config, builtin_name, &builtin_config.current_context())?;
        if target == Signature::Data {
            return Ok(None);
        }
        let context = config.current_context();
        Ok((0..config.num_colorspaces())
            .filter_map(|i| config.colorspace_name_by_index(i))
            .find(|name| signature(config, name, &context).ok() == Some(target)))
    }

    fn processor_to_builtin(
        &self,
        config: &dyn EngineConfig,
        src: &str,
        builtin_name: &str,
    ) -> EngineResult<ProcessorRef> {
        if !self.builtin_support {
            return Err(EngineError::Unsupported("processor_to_builtin".into()));
        }
        self.counters.probes.fetch_add(1, Ordering::SeqCst);
        let from = signature(config, src, &config.current_context())?;
        let to = signature(self.builtin.as_ref(), builtin_name, &Context::new())?;
        Ok(Arc::new(MockProcessor::Steps(conversion(from, to))))
    }

    fn processor_between_configs(
        &self,
        context: &Context,
        src_config: &dyn EngineConfig,
        src: &str,
        dst_config: &dyn EngineConfig,
        dst: &str,
        direction: TransformDirection,
    ) -> EngineResult<ProcessorRef> {
        self.counters.bridges.fetch_add(1, Ordering::SeqCst);
        let steps = conversion(
            signature(src_config, src, context)?,
            signature(dst_config, dst, context)?,
        );
        let steps = if direction.is_inverse() { invert(steps) } else { steps };
        Ok(Arc::new(MockProcessor::Steps(steps)))
    }

    fn combine(&self, processors: &[ProcessorRef]) -> EngineResult<ProcessorRef> {
        Ok(Arc::new(MockProcessor::Chain(processors.to_vec())))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Config loaded from `source` through `engine`, with every toggle off.
pub fn config_with(engine: &Arc<MockEngine>, source: &str) -> ColorConfig {
    ColorConfig::builder()
        .engine(engine.clone())
        .settings(Settings::new())
        .source(source)
        .build()
}

/// The studio document loaded through a fresh engine.
pub fn studio() -> (Arc<MockEngine>, ColorConfig) {
    let engine = Arc::new(MockEngine::new());
    let config = config_with(&engine, STUDIO_CONFIG);
    (engine, config)
}

/// sRGB encoding of a linear value.
pub fn srgb_encode(v: f32) -> f32 {
    Transfer::Srgb.encode(v)
}

/// sRGB decoding to a linear value.
pub fn srgb_decode(v: f32) -> f32 {
    Transfer::Srgb.decode(v)
}

/// Asserts two sample slices match within `eps`.
pub fn assert_close(actual: &[f32], expected: &[f32], eps: f32) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() <= eps, "sample {i}: {a} vs {e} (eps {eps})");
    }
}

/// Runs `handle` over one packed RGB pixel.
pub fn apply_rgb(handle: &vfx_colorconfig::ProcessorHandle, rgb: [f32; 3]) -> [f32; 3] {
    let mut px = rgb;
    handle.get().unwrap().apply(&mut px, 1, 1, 3);
    px
}
