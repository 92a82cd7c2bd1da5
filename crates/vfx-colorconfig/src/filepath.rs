//! Color space inference from file names.
//!
//! The engine's file rules are authoritative when a document is loaded.
//! Without one, [`ColorConfig::parse_colorspace_from_string`] looks for
//! the right-most color space name embedded in the string, preferring the
//! longest candidate at that position (`"plate_ACEScg.exr"` ->
//! `"ACEScg"`).

use crate::config::ColorConfig;

impl ColorConfig {
    /// Color space for `path` from the engine's file rules, else parsed
    /// from the name.
    pub fn colorspace_from_filepath(&self, path: &str) -> String {
        if let Some(config) = self.live() {
            return config.colorspace_from_filepath(path).unwrap_or_default();
        }
        self.parse_colorspace_from_string(path)
    }

    /// Like [`colorspace_from_filepath`](Self::colorspace_from_filepath),
    /// but falls back to `default` when only the catch-all rule matched.
    ///
    /// With `cs_name_match`, a color space name found in the path wins over
    /// `default`.
    pub fn colorspace_from_filepath_or(
        &self,
        path: &str,
        default: &str,
        cs_name_match: bool,
    ) -> String {
        if let Some(config) = self.live() {
            let found = config.colorspace_from_filepath(path);
            if !config.filepath_only_matches_default_rule(path) {
                return found.unwrap_or_default();
            }
        }
        if cs_name_match {
            let parsed = self.parse_colorspace_from_string(path);
            if !parsed.is_empty() {
                return parsed;
            }
        }
        default.to_string()
    }

    /// True if only the default file rule matches `path` (always true
    /// without a document).
    pub fn filepath_only_matches_default_rule(&self, path: &str) -> bool {
        self.live()
            .is_none_or(|config| config.filepath_only_matches_default_rule(path))
    }

    /// Right-most (then longest) known color space name occurring in `s`,
    /// compared case-insensitively; `""` if none.
    pub fn parse_colorspace_from_string(&self, s: &str) -> String {
        if s.is_empty() {
            return String::new();
        }
        let mut names = self.colorspace_names();
        names.sort_by_key(String::len);

        let haystack = s.to_ascii_lowercase();
        let mut best: Option<(usize, String)> = None;
        for name in names {
            if name.is_empty() {
                continue;
            }
            let Some(start) = haystack.rfind(&name.to_ascii_lowercase()) else {
                continue;
            };
            let end = start + name.len();
            if best.as_ref().is_none_or(|(pos, _)| end >= *pos) {
                best = Some((end, name));
            }
        }
        best.map(|(_, name)| name).unwrap_or_default()
    }
}
