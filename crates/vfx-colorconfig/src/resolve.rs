//! Name resolution, equivalence and interop ids.
//!
//! [`ColorConfig::resolve`] turns any name a user might type (a color space,
//! an alias, a role, an interop id or an informal synonym like `"linear"`)
//! into the name the config uses. It never fails: unknown names come back
//! unchanged.
//!
//! [`ColorConfig::equivalent`] is deliberately approximate. Two spaces that
//! land in the same well-known class (sRGB, linear sRGB, ACEScg, Rec709)
//! are interchangeable even if their transforms differ in ways those
//! classes do not capture.

use crate::config::ColorConfig;
use crate::interop::{self, DATA_ID, UNKNOWN_ID};
use crate::registry::{ClassAlias, CsFlags};

/// Informal synonyms and the class representative they resolve to.
const SYNONYMS: &[(&[&str], ClassAlias)] = &[
    (&["sRGB", "srgb_rec709_scene"], ClassAlias::Srgb),
    (
        &["lin_srgb", "lin_rec709", "lin_rec709_scene", "linear"],
        ClassAlias::LinSrgb,
    ),
    (&["ACEScg", "lin_ap1_scene"], ClassAlias::AcesCg),
    (&["scene_linear"], ClassAlias::SceneLinear),
    (&["Rec709"], ClassAlias::Rec709),
];

impl ColorConfig {
    /// Name the config uses for `name`; `name` itself when nothing matches.
    pub fn resolve(&self, name: &str) -> String {
        if let Some(config) = self.live() {
            if let Some(cs) = config.colorspace(name) {
                return cs.name;
            }
        } else if self.registry().position(name).is_some() {
            return name.to_string();
        }

        if let Some(found) = self.identify_via_interop(name) {
            return found;
        }

        let aliases = self.registry().aliases();
        for (names, class) in SYNONYMS {
            if names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                let alias = aliases.get(*class);
                if !alias.is_empty() {
                    return alias.to_string();
                }
            }
        }
        name.to_string()
    }

    /// Live space the engine deems equivalent to the interop identity
    /// `name`.
    fn identify_via_interop(&self, name: &str) -> Option<String> {
        let (engine, config, interop) = (self.engine()?, self.live()?, self.interop_config()?);
        let reference = interop.colorspace(name)?;
        engine
            .identify_builtin_colorspace(config.as_ref(), interop.as_ref(), &reference.name)
            .ok()
            .flatten()
            .filter(|n| !n.is_empty())
    }

    /// True if `a` and `b` name the same (or an interchangeable) space.
    ///
    /// Empty names are never equivalent to anything.
    pub fn equivalent(&self, a: &str, b: &str) -> bool {
        if a.is_empty() || b.is_empty() {
            return false;
        }
        if a.eq_ignore_ascii_case(b) {
            return true;
        }
        let (a, b) = (self.resolve(a), self.resolve(b));
        if a.is_empty() || b.is_empty() {
            return false;
        }
        if a.eq_ignore_ascii_case(&b) {
            return true;
        }

        self.examine_name(&a);
        self.examine_name(&b);
        let (Some(ea), Some(eb)) = (self.registry().find(&a), self.registry().find(&b)) else {
            return false;
        };
        let (fa, fb) = (ea.flags().known(), eb.flags().known());
        if fa != CsFlags::NONE && fa == fb {
            return true;
        }
        !ea.canonical().is_empty()
            && !eb.canonical().is_empty()
            && ea.canonical().eq_ignore_ascii_case(eb.canonical())
    }

    /// Portable interop ids: every space of the interop identities
    /// document, plus `data` and `unknown`.
    pub fn builtin_interop_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = match self.interop_config() {
            Some(interop) => (0..interop.num_colorspaces())
                .filter_map(|i| interop.colorspace_name_by_index(i))
                .collect(),
            None => interop::INTEROP_IDENTITIES
                .iter()
                .map(|row| row.id.to_string())
                .collect(),
        };
        for id in [DATA_ID, UNKNOWN_ID] {
            if !ids.iter().any(|i| i == id) {
                ids.push(id.to_string());
            }
        }
        ids
    }

    /// Interop id of `colorspace`, or `""` if none can be determined.
    ///
    /// With `strict`, only ids recorded in the document or implied by the
    /// static identity table are returned; otherwise name and alias
    /// matches against the interop identities are tried as well.
    pub fn color_interop_id(&self, colorspace: &str, strict: bool) -> String {
        if colorspace.is_empty() {
            return String::new();
        }

        let info = self.live().and_then(|c| c.colorspace(colorspace));
        let known = info.is_some()
            || (self.live().is_none() && self.registry().position(colorspace).is_some());
        if !known {
            return match self.interop_config() {
                Some(interop) => interop
                    .colorspace(colorspace)
                    .map(|cs| cs.name)
                    .unwrap_or_default(),
                None => interop::find(colorspace)
                    .map(|row| row.id.to_string())
                    .unwrap_or_default(),
            };
        }

        if let Some(cs) = &info {
            if cs.is_data {
                return DATA_ID.to_string();
            }
            if let Some(id) = cs.interop_id.as_deref().filter(|id| !id.is_empty()) {
                return id.to_string();
            }
        }

        if let Some(row) = interop::INTEROP_IDENTITIES
            .iter()
            .find(|row| self.equivalent(colorspace, row.id))
        {
            return row.id.to_string();
        }
        if strict {
            return String::new();
        }

        let Some(cs) = info else {
            return String::new();
        };
        if let Some(interop) = self.interop_config() {
            let by_name = std::iter::once(&cs.name)
                .chain(cs.aliases.iter())
                .find_map(|n| interop.colorspace(n));
            if let Some(found) = by_name {
                return found.name;
            }
        }
        self.builtin_interop_ids()
            .into_iter()
            .find(|id| self.equivalent(&cs.name, id))
            .unwrap_or_default()
    }

    /// First interop id whose CICP primaries and transfer match `cicp`.
    pub fn color_interop_id_from_cicp(&self, cicp: [i32; 4]) -> Option<&'static str> {
        interop::id_from_cicp(cicp)
    }

    /// CICP code of `colorspace`, via its interop id.
    pub fn cicp(&self, colorspace: &str) -> Option<[i32; 4]> {
        let id = self.color_interop_id(colorspace, false);
        if id.is_empty() {
            None
        } else {
            interop::cicp_for_id(&id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_resolution() {
        let config = ColorConfig::without_engine();
        assert_eq!(config.resolve("linear"), "linear");
        assert_eq!(config.resolve("SRGB"), "srgb_rec709_scene");
        assert_eq!(config.resolve("lin_ap1_scene"), "lin_ap1_scene");
        assert_eq!(config.resolve("not a space"), "not a space");
    }

    #[test]
    fn fallback_equivalence() {
        let config = ColorConfig::without_engine();
        assert!(config.equivalent("sRGB", "srgb_rec709_scene"));
        assert!(config.equivalent("scene_linear", "lin_rec709"));
        assert!(config.equivalent("LINEAR", "linear"));
        assert!(!config.equivalent("sRGB", "linear"));
        assert!(!config.equivalent("Rec709", "sRGB"));
        assert!(!config.equivalent("", ""));
        assert!(!config.equivalent("", "linear"));
    }

    #[test]
    fn fallback_interop_ids() {
        let config = ColorConfig::without_engine();
        assert_eq!(config.color_interop_id("sRGB", false), "srgb_rec709_scene");
        assert_eq!(config.color_interop_id("linear", true), "lin_rec709_scene");
        assert_eq!(
            config.color_interop_id("pq_rec2020_display", false),
            "pq_rec2020_display"
        );
        assert_eq!(config.color_interop_id("bogus", false), "");
        assert_eq!(config.color_interop_id("", false), "");
    }

    #[test]
    fn cicp_lookup() {
        let config = ColorConfig::without_engine();
        assert_eq!(config.cicp("srgb_rec709_display"), Some([1, 13, 1, 1]));
        assert_eq!(config.cicp("sRGB"), Some([1, 13, 1, 1]));
        assert_eq!(config.cicp("lin_ap1_scene"), None);
        assert_eq!(
            config.color_interop_id_from_cicp([9, 16, 9, 1]),
            Some("pq_rec2020_display")
        );
    }

    #[test]
    fn builtin_ids_end_with_data_and_unknown() {
        let config = ColorConfig::without_engine();
        let ids = config.builtin_interop_ids();
        assert_eq!(ids.iter().filter(|i| *i == "data").count(), 1);
        assert_eq!(ids.iter().filter(|i| *i == "unknown").count(), 1);
        assert!(ids.iter().any(|i| i == "srgb_rec709_display"));
    }
}
