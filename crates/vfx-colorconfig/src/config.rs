//! OIIO-style color management configuration.
//!
//! [`ColorConfig`] owns everything needed to turn color space names into
//! processors: the loaded engine documents, the [`Registry`] of classified
//! names, the [`ProcessorCache`], and a sticky error message.
//!
//! Construction never fails. A bad source records an error and the config
//! falls back to the engine's current document, then to `ocio://default`,
//! and finally (no engine at all) to a small builtin inventory of names
//! that keeps resolution and equivalence tests working.
//!
//! # Example
//!
//! ```ignore
//! use vfx_colorconfig::ColorConfig;
//!
//! let config = ColorConfig::from_source("aces/config.ocio");
//! if config.has_error() {
//!     eprintln!("{}", config.geterror(true));
//! }
//! for i in 0..config.num_colorspaces() {
//!     println!("{:?}", config.colorspace_name_by_index(i));
//! }
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};
use std::time::Instant;

use tracing::debug;

use crate::cache::ProcessorCache;
use crate::engine::{
    BitDepth, ConfigRef, ConfigSource, DEFAULT_CONFIG_URI, Engine, EngineConfig,
    ROLE_SCENE_LINEAR, ReferenceSpace,
};
use crate::imagebuf::DataFormat;
use crate::interop::INTEROP_IDENTITIES_CONFIG;
use crate::registry::Registry;
use crate::settings::{ENV_CONFIG, Settings};

static DEFAULT_ENGINE: OnceLock<Arc<dyn Engine>> = OnceLock::new();
static DEFAULT_CONFIG: OnceLock<ColorConfig> = OnceLock::new();

/// Registers the process-wide color engine.
///
/// Only the first call has an effect; returns false if an engine was
/// already registered. Configs built afterwards with [`ColorConfig::new`]
/// or [`ColorConfig::from_source`] use it.
pub fn set_default_engine(engine: Arc<dyn Engine>) -> bool {
    DEFAULT_ENGINE.set(engine).is_ok()
}

/// The process-wide color engine, if one was registered.
pub fn default_engine() -> Option<Arc<dyn Engine>> {
    DEFAULT_ENGINE.get().cloned()
}

/// Loaded documents and derived state, rebuilt on every reset.
#[derive(Debug, Default)]
pub(crate) struct ConfigState {
    /// Live document; `None` in heuristics-only mode.
    pub(crate) config: Option<ConfigRef>,
    /// Engine builtin default document.
    pub(crate) builtin: Option<ConfigRef>,
    /// Interop identities reference document.
    pub(crate) interop: Option<ConfigRef>,
    /// Live document is one of the engine's builtin documents.
    pub(crate) config_is_builtin: bool,
    pub(crate) configname: String,
    pub(crate) configfilename: String,
    pub(crate) registry: Registry,
    pub(crate) cache: ProcessorCache,
    pub(crate) error: Mutex<String>,
    pub(crate) working_dir: RwLock<PathBuf>,
}

/// OIIO-style color configuration.
///
/// Cheap to query from many threads at once; only [`ColorConfig::reset`]
/// needs exclusive access.
#[derive(Debug)]
pub struct ColorConfig {
    pub(crate) engine: Option<Arc<dyn Engine>>,
    pub(crate) settings: Settings,
    pub(crate) state: ConfigState,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorConfig {
    /// Config selected by `$OCIO`, else the engine default, using the
    /// registered default engine and the environment settings.
    pub fn new() -> Self {
        Self::from_source("")
    }

    /// Config from a file path, `ocio://` URI or inline document text
    /// (detected by a newline). `""` and `"$OCIO"` mean the environment.
    pub fn from_source(source: &str) -> Self {
        Self::builder().source(source).build()
    }

    /// Heuristics-only config that never consults an engine.
    pub fn without_engine() -> Self {
        Self::builder().settings(Settings::engine_disabled()).build()
    }

    /// Starts a builder with the default engine and environment settings.
    pub fn builder() -> ColorConfigBuilder {
        ColorConfigBuilder::new()
    }

    /// Process-wide default config, created on first use.
    pub fn default_colorconfig() -> &'static ColorConfig {
        DEFAULT_CONFIG.get_or_init(ColorConfig::new)
    }

    /// True if a color engine is registered and not disabled.
    pub fn supports_engine() -> bool {
        DEFAULT_ENGINE.get().is_some() && !Settings::global().disable_engine
    }

    /// Version of the registered engine as `0xMMmmpp00`, 0 without one.
    pub fn engine_version_hex() -> u32 {
        DEFAULT_ENGINE.get().map_or(0, |e| e.version_hex())
    }

    /// Reloads from `source`.
    ///
    /// Asking for the config already in use (or `""` while on
    /// `ocio://default`) is a cheap no-op.
    pub fn reset(&mut self, source: &str) -> bool {
        let current = self.state.configname.as_str();
        if source == current || (source.is_empty() && current == DEFAULT_CONFIG_URI) {
            return true;
        }
        self.state = load_state(self.engine.as_deref(), &self.settings, source, None);
        self.state.config.is_some()
    }

    // --- internal accessors -------------------------------------------------

    /// Engine, unless disabled.
    pub(crate) fn engine(&self) -> Option<&dyn Engine> {
        if self.settings.disable_engine {
            None
        } else {
            self.engine.as_deref()
        }
    }

    /// Live document, unless the engine is disabled.
    pub(crate) fn live(&self) -> Option<&ConfigRef> {
        if self.settings.disable_engine {
            None
        } else {
            self.state.config.as_ref()
        }
    }

    pub(crate) fn interop_config(&self) -> Option<&ConfigRef> {
        if self.settings.disable_engine {
            None
        } else {
            self.state.interop.as_ref()
        }
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.state.registry
    }

    /// Settings in effect.
    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Processor cache.
    pub fn cache(&self) -> &ProcessorCache {
        &self.state.cache
    }

    // --- error slot ---------------------------------------------------------

    /// Records `message`, replacing any previous one.
    pub(crate) fn error(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(%message, "color config error");
        *self.state.error.lock().unwrap_or_else(PoisonError::into_inner) = message;
    }

    /// True if an error message is pending.
    pub fn has_error(&self) -> bool {
        !self
            .state
            .error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Pending error message; cleared when `clear` is true.
    pub fn geterror(&self, clear: bool) -> String {
        let mut slot = self.state.error.lock().unwrap_or_else(PoisonError::into_inner);
        if clear {
            std::mem::take(&mut *slot)
        } else {
            slot.clone()
        }
    }

    // --- identity -----------------------------------------------------------

    /// Name (source) of the loaded config, `"built-in"` in heuristics-only
    /// mode.
    pub fn configname(&self) -> &str {
        if self.live().is_some() {
            &self.state.configname
        } else {
            "built-in"
        }
    }

    /// File the config came from (`""` for inline text, `"current"` when
    /// the engine's current config was used).
    pub fn configfilename(&self) -> &str {
        &self.state.configfilename
    }

    /// Name recorded inside the engine document.
    pub fn engine_config_name(&self) -> Option<String> {
        self.live().map(|c| c.name())
    }

    /// Directory relative file transform paths are resolved against.
    pub fn working_dir(&self) -> PathBuf {
        self.state
            .working_dir
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sets the working directory for relative file lookups.
    pub fn set_working_dir(&self, dir: impl AsRef<Path>) {
        *self
            .state
            .working_dir
            .write()
            .unwrap_or_else(PoisonError::into_inner) = dir.as_ref().to_path_buf();
    }

    // --- color spaces -------------------------------------------------------

    /// Number of known color spaces (fallback names included).
    pub fn num_colorspaces(&self) -> usize {
        self.registry().len()
    }

    /// Color space name at `index`.
    pub fn colorspace_name_by_index(&self, index: usize) -> Option<String> {
        self.registry().name_at(index)
    }

    /// All color space names in order.
    pub fn colorspace_names(&self) -> Vec<String> {
        self.registry().names()
    }

    /// Index of `name`: exact (case-insensitive) match first, then any
    /// equivalent space.
    pub fn colorspace_index(&self, name: &str) -> Option<usize> {
        let names = self.colorspace_names();
        names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .or_else(|| names.iter().position(|n| self.equivalent(n, name)))
    }

    /// Family string of a color space.
    pub fn colorspace_family_by_name(&self, name: &str) -> Option<String> {
        self.live()?.colorspace(name).map(|cs| cs.family)
    }

    /// Aliases of a color space.
    pub fn aliases(&self, colorspace: &str) -> Vec<String> {
        self.live()
            .and_then(|c| c.colorspace(colorspace))
            .map(|cs| cs.aliases)
            .unwrap_or_default()
    }

    /// Pixel format and bit count advertised by a color space.
    ///
    /// 10/12/14-bit integer depths map to 16-bit storage.
    pub fn colorspace_data_type(&self, name: &str) -> Option<(DataFormat, u32)> {
        let cs = self.live()?.colorspace(name)?;
        match cs.bit_depth {
            BitDepth::Unknown => None,
            BitDepth::U8 => Some((DataFormat::U8, 8)),
            BitDepth::U10 => Some((DataFormat::U16, 10)),
            BitDepth::U12 => Some((DataFormat::U16, 12)),
            BitDepth::U14 => Some((DataFormat::U16, 14)),
            BitDepth::U16 => Some((DataFormat::U16, 16)),
            BitDepth::U32 => Some((DataFormat::U32, 32)),
            BitDepth::F16 => Some((DataFormat::F16, 16)),
            BitDepth::F32 => Some((DataFormat::F32, 32)),
        }
    }

    /// True if `name` has a linear response.
    ///
    /// Asks the engine (scene or display reference) when builtin probing is
    /// allowed, otherwise guesses from the name.
    pub fn is_colorspace_linear(&self, name: &str) -> bool {
        if let Some(config) = self.live().filter(|_| self.settings.builtin_probing()) {
            return config.is_colorspace_linear(name, ReferenceSpace::Scene)
                || config.is_colorspace_linear(name, ReferenceSpace::Display);
        }
        name_looks_linear(name)
    }

    // --- roles --------------------------------------------------------------

    /// Number of roles.
    pub fn num_roles(&self) -> usize {
        self.live().map_or(0, |c| c.num_roles())
    }

    /// Role name at `index`.
    pub fn role_by_index(&self, index: usize) -> Option<String> {
        self.live()?.role_name(index)
    }

    /// All role names.
    pub fn roles(&self) -> Vec<String> {
        (0..self.num_roles())
            .filter_map(|i| self.role_by_index(i))
            .collect()
    }

    /// Color space playing `role`, with a few informal synonyms
    /// (`RGB`/`default` for `linear`, `linear` and `scene_linear` for each
    /// other, `srgb` for `sRGB - Texture`).
    pub fn colorspace_name_by_role(&self, role: &str) -> Option<String> {
        if let Some(config) = self.live() {
            let lookup = |n: &str| config.colorspace(n).map(|cs| cs.name);
            let mut found = lookup(role);
            let mut role = role;
            if found.is_none()
                && (role.eq_ignore_ascii_case("RGB") || role.eq_ignore_ascii_case("default"))
            {
                role = "linear";
            }
            if found.is_none() && role.eq_ignore_ascii_case("linear") {
                found = lookup(ROLE_SCENE_LINEAR);
            }
            if found.is_none() && role.eq_ignore_ascii_case(ROLE_SCENE_LINEAR) {
                found = lookup("linear");
            }
            if found.is_none() && role.eq_ignore_ascii_case("srgb") {
                found = lookup("sRGB - Texture");
            }
            if found.is_some() {
                return found;
            }
        }
        if role.eq_ignore_ascii_case("linear") || role.eq_ignore_ascii_case(ROLE_SCENE_LINEAR) {
            return Some("linear".to_string());
        }
        None
    }

    // --- looks --------------------------------------------------------------

    /// Number of looks.
    pub fn num_looks(&self) -> usize {
        self.live().map_or(0, |c| c.num_looks())
    }

    /// Look name at `index`.
    pub fn look_name_by_index(&self, index: usize) -> Option<String> {
        self.live()?.look_name(index)
    }

    /// All look names.
    pub fn look_names(&self) -> Vec<String> {
        (0..self.num_looks())
            .filter_map(|i| self.look_name_by_index(i))
            .collect()
    }

    // --- displays & views ---------------------------------------------------

    /// Number of displays.
    pub fn num_displays(&self) -> usize {
        self.live().map_or(0, |c| c.num_displays())
    }

    /// Display name at `index`.
    pub fn display_name_by_index(&self, index: usize) -> Option<String> {
        self.live()?.display_name(index)
    }

    /// All display names.
    pub fn display_names(&self) -> Vec<String> {
        (0..self.num_displays())
            .filter_map(|i| self.display_name_by_index(i))
            .collect()
    }

    /// Default display.
    pub fn default_display_name(&self) -> Option<String> {
        self.live()?.default_display()
    }

    fn display_or_default(&self, display: &str) -> Option<String> {
        if display.is_empty() || display == "default" {
            self.default_display_name()
        } else {
            Some(display.to_string())
        }
    }

    /// Number of views of `display` (`""` = default display).
    pub fn num_views(&self, display: &str) -> usize {
        match (self.live(), self.display_or_default(display)) {
            (Some(c), Some(d)) => c.num_views(&d, None),
            _ => 0,
        }
    }

    /// View name at `index` of `display` (`""` = default display).
    pub fn view_name_by_index(&self, display: &str, index: usize) -> Option<String> {
        let d = self.display_or_default(display)?;
        self.live()?.view_name(&d, None, index)
    }

    /// All view names of `display` (`""` = default display).
    pub fn view_names(&self, display: &str) -> Vec<String> {
        (0..self.num_views(display))
            .filter_map(|i| self.view_name_by_index(display, i))
            .collect()
    }

    /// Default view of `display` (`""`/`"default"` = default display).
    pub fn default_view_name(&self, display: &str) -> Option<String> {
        let d = self.display_or_default(display)?;
        self.live()?.default_view(&d, None)
    }

    /// Default view of `display` for content in `input_colorspace`.
    ///
    /// An empty or `"default"` input space is inferred from the file
    /// rules' default.
    pub fn default_view_name_for(&self, display: &str, input_colorspace: &str) -> Option<String> {
        let config = self.live()?;
        let d = self.display_or_default(display)?;
        let input = if input_colorspace.is_empty() || input_colorspace == "default" {
            config.colorspace_from_filepath(input_colorspace).unwrap_or_default()
        } else {
            input_colorspace.to_string()
        };
        config.default_view(&d, Some(&input))
    }

    /// Color space a display/view outputs. Shared views using the display
    /// name resolve to the display.
    pub fn display_view_colorspace_name(&self, display: &str, view: &str) -> Option<String> {
        let name = self.live()?.display_view_colorspace(display, view)?;
        if name == "<USE_DISPLAY_NAME>" {
            Some(display.to_string())
        } else {
            Some(name)
        }
    }

    /// Looks a display/view applies.
    pub fn display_view_looks(&self, display: &str, view: &str) -> Option<String> {
        self.live()?.display_view_looks(display, view)
    }

    // --- named transforms ---------------------------------------------------

    /// Number of named transforms.
    pub fn num_named_transforms(&self) -> usize {
        self.live().map_or(0, |c| c.num_named_transforms())
    }

    /// Named transform name at `index`.
    pub fn named_transform_name_by_index(&self, index: usize) -> Option<String> {
        self.live()?.named_transform_name(index)
    }

    /// All named transform names.
    pub fn named_transform_names(&self) -> Vec<String> {
        (0..self.num_named_transforms())
            .filter_map(|i| self.named_transform_name_by_index(i))
            .collect()
    }

    /// Aliases of a named transform.
    pub fn named_transform_aliases(&self, name: &str) -> Vec<String> {
        self.live()
            .and_then(|c| c.named_transform(name))
            .map(|nt| nt.aliases)
            .unwrap_or_default()
    }
}

/// Name-only linearity guess.
pub(crate) fn name_looks_linear(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == "linear"
        || lower.starts_with("linear ")
        || lower.starts_with("linear_")
        || lower.starts_with("lin_")
        || lower.ends_with("_linear")
        || lower.ends_with("_lin")
}

/// Builder for [`ColorConfig`].
///
/// ```ignore
/// let config = ColorConfig::builder()
///     .engine(engine)
///     .settings(Settings::new())
///     .source("show.ocio")
///     .working_dir("/shows/demo/luts")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ColorConfigBuilder {
    engine: Option<Arc<dyn Engine>>,
    settings: Settings,
    source: String,
    working_dir: Option<PathBuf>,
}

impl Default for ColorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorConfigBuilder {
    /// Default engine, environment settings, environment source.
    pub fn new() -> Self {
        Self {
            engine: default_engine(),
            settings: *Settings::global(),
            source: String::new(),
            working_dir: None,
        }
    }

    /// Uses `engine` instead of the process default.
    pub fn engine(mut self, engine: Arc<dyn Engine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Builds without any engine.
    pub fn no_engine(mut self) -> Self {
        self.engine = None;
        self
    }

    /// Overrides the environment toggles.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Config source (path, URI or inline text).
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Working directory for relative file transforms.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Loads the config. Never fails; check [`ColorConfig::has_error`].
    pub fn build(self) -> ColorConfig {
        let state = load_state(
            self.engine.as_deref(),
            &self.settings,
            &self.source,
            self.working_dir,
        );
        ColorConfig {
            engine: self.engine,
            settings: self.settings,
            state,
        }
    }
}

/// Loads documents for `source` and takes inventory.
fn load_state(
    engine: Option<&dyn Engine>,
    settings: &Settings,
    source: &str,
    working_dir: Option<PathBuf>,
) -> ConfigState {
    let timer = Instant::now();
    let mut state = ConfigState::default();
    let mut errors: Vec<String> = Vec::new();

    let engine = engine.filter(|_| !settings.disable_engine);
    if let Some(engine) = engine {
        match engine.load_config(&ConfigSource::builtin_default()) {
            Ok(c) => state.builtin = Some(c),
            Err(e) => errors.push(format!("Error making builtin color config: {e}")),
        }
        match engine.load_config(&ConfigSource::Inline(INTEROP_IDENTITIES_CONFIG.to_string())) {
            Ok(c) => state.interop = Some(c),
            Err(e) => errors.push(format!("Error making interop identities config: {e}")),
        }

        let mut name = source.to_string();
        if name.is_empty() || name.eq_ignore_ascii_case("$OCIO") {
            name = env::var(ENV_CONFIG).unwrap_or_default();
        }
        if name.is_empty() {
            name = DEFAULT_CONFIG_URI.to_string();
        }

        let parsed = ConfigSource::parse(&name);
        match &parsed {
            ConfigSource::Inline(_) => match engine.load_config(&parsed) {
                Ok(c) => {
                    state.config = Some(c);
                    state.configname = name.clone();
                }
                Err(e) => errors.push(format!("Error reading color config from text: {e}")),
            },
            ConfigSource::File(path) if !path.exists() => {
                errors.push(format!("Requested non-existent color config \"{name}\""));
            }
            _ => match engine.load_config(&parsed) {
                Ok(c) => {
                    state.config = Some(c);
                    state.configname = name.clone();
                    state.configfilename = name.clone();
                    state.config_is_builtin = matches!(parsed, ConfigSource::Uri(_));
                }
                Err(e) => errors.push(format!("Error reading color config \"{name}\": {e}")),
            },
        }

        if state.config.is_none() {
            debug!("falling back to current color config");
            match engine.current_config() {
                Ok(current) if current.num_colorspaces() <= 1 => {
                    debug!("current color config is unusable, using {DEFAULT_CONFIG_URI}");
                    if let Ok(c) = engine.load_config(&ConfigSource::builtin_default()) {
                        state.config = Some(c);
                        state.config_is_builtin = true;
                    }
                    state.configname = DEFAULT_CONFIG_URI.to_string();
                    state.configfilename = DEFAULT_CONFIG_URI.to_string();
                }
                Ok(current) => {
                    let current_name = current.name();
                    state.configname = if current_name.is_empty() {
                        "current".to_string()
                    } else {
                        current_name
                    };
                    state.configfilename = "current".to_string();
                    state.config = Some(current);
                }
                Err(e) => errors.push(format!("No current color config: {e}")),
            }
        }

        if let Some(dir) = parsed.path().and_then(Path::parent) {
            *state.working_dir.get_mut().unwrap_or_else(PoisonError::into_inner) =
                dir.to_path_buf();
        }
        debug!(
            config = %state.configname,
            elapsed = ?timer.elapsed(),
            "color config loaded"
        );
    }

    if let Some(dir) = working_dir {
        *state.working_dir.get_mut().unwrap_or_else(PoisonError::into_inner) = dir;
    }
    if let Some(last) = errors.pop() {
        *state.error.get_mut().unwrap_or_else(PoisonError::into_inner) = last;
    }

    crate::classify::inventory(&mut state, engine.is_some());
    crate::classify::identify_builtin_equivalents(&state, engine, settings);
    debug!(
        colorspaces = state.registry.len(),
        aliases = ?state.registry.aliases(),
        elapsed = ?timer.elapsed(),
        "color config classified"
    );
    state
}

/// Free-function form of [`ColorConfig::equivalent`] on the default config.
pub fn equivalent_colorspace(a: &str, b: &str) -> bool {
    ColorConfig::default_colorconfig().equivalent(a, b)
}
