//! Inventory of color space names and their classification.
//!
//! Every name the config knows (plus fallback names when there is no
//! usable engine document) gets a [`ColorSpaceEntry`]. Entries start
//! unclassified and accrete [`CsFlags`] as the classifier learns about
//! them; flags are never removed.
//!
//! The registry also remembers, per well-known class, the first entry found
//! to belong to it ([`ClassAliases`]). Those names drive the informal
//! synonyms in [`resolve`](crate::ColorConfig::resolve).
//!
//! # Locking
//!
//! One `RwLock` guards all entries and aliases. Queries take the read lock.
//! Lazy classification is split in two: [`Registry::begin_classify`] hands
//! out a snapshot without holding any lock during the (possibly slow) engine
//! probing, then [`Registry::commit_classification`] applies the result
//! under the write lock, discarding it if another thread already committed.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bitflags::bitflags;

bitflags! {
    /// Classification bits for a color space.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CsFlags: u32 {
        /// Values are proportional to light (any primaries).
        const LINEAR_RESPONSE = 0b00_0001;
        /// The config's scene-linear working space.
        const SCENE_LINEAR    = 0b00_0010;
        /// sRGB primaries with the sRGB transfer curve.
        const SRGB            = 0b00_0100;
        /// sRGB/Rec.709 primaries, linear.
        const LIN_SRGB        = 0b00_1000;
        /// ACES AP1 primaries, linear.
        const ACESCG          = 0b01_0000;
        /// Rec.709 primaries with the BT.709 curve.
        const REC709          = 0b10_0000;
        /// Bits naming a specific well-known space.
        const KNOWN = Self::SRGB.bits() | Self::LIN_SRGB.bits() | Self::ACESCG.bits() | Self::REC709.bits();
    }
}

impl CsFlags {
    /// No flags.
    pub const NONE: Self = Self::empty();

    /// Only the well-known-space bits.
    #[inline]
    pub const fn known(self) -> Self {
        self.intersection(Self::KNOWN)
    }

    /// Canonical label implied by the flags, by priority
    /// sRGB, linear sRGB, ACEScg, Rec709.
    pub fn canonical_name(self) -> Option<&'static str> {
        if self.intersects(Self::SRGB) {
            Some("srgb_rec709_scene")
        } else if self.intersects(Self::LIN_SRGB) {
            Some("lin_rec709_scene")
        } else if self.intersects(Self::ACESCG) {
            Some("lin_ap1_scene")
        } else if self.intersects(Self::REC709) {
            Some("Rec709")
        } else {
            None
        }
    }
}

/// Lazy classification progress of one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassState {
    /// Nothing but the initial flags known yet.
    #[default]
    Unclassified,
    /// A thread is probing the engine for this entry.
    Classifying,
    /// Final; later passes never run again.
    Classified,
}

/// One known color space name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorSpaceEntry {
    name: String,
    index: usize,
    flags: CsFlags,
    canonical: String,
    state: ClassState,
}

impl ColorSpaceEntry {
    fn new(name: &str, index: usize, flags: CsFlags) -> Self {
        Self {
            name: name.to_string(),
            index,
            flags,
            canonical: String::new(),
            state: ClassState::Unclassified,
        }
    }

    /// Name as registered.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordinal index; aliases of one space share an index.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Classification flags.
    #[inline]
    pub fn flags(&self) -> CsFlags {
        self.flags
    }

    /// Canonical label, empty until classified into a known class.
    #[inline]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Classification progress.
    #[inline]
    pub fn state(&self) -> ClassState {
        self.state
    }

    /// True once classification is final.
    #[inline]
    pub fn is_examined(&self) -> bool {
        self.state == ClassState::Classified
    }

    fn accrete(&mut self, flags: CsFlags) {
        self.flags |= flags;
        if let Some(canonical) = self.flags.canonical_name() {
            self.canonical = canonical.to_string();
        }
    }
}

/// Well-known classes that get a representative name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassAlias {
    /// sRGB transfer, Rec.709 primaries.
    Srgb,
    /// Linear Rec.709 primaries.
    LinSrgb,
    /// Linear AP1 primaries.
    AcesCg,
    /// BT.709 transfer, Rec.709 primaries.
    Rec709,
    /// The scene-linear role.
    SceneLinear,
}

impl ClassAlias {
    /// Alias class implied by a set of well-known flags, by flag priority.
    pub fn from_flags(flags: CsFlags) -> Option<Self> {
        if flags.intersects(CsFlags::SRGB) {
            Some(Self::Srgb)
        } else if flags.intersects(CsFlags::LIN_SRGB) {
            Some(Self::LinSrgb)
        } else if flags.intersects(CsFlags::ACESCG) {
            Some(Self::AcesCg)
        } else if flags.intersects(CsFlags::REC709) {
            Some(Self::Rec709)
        } else {
            None
        }
    }
}

/// First-discovered representative name per well-known class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassAliases {
    /// sRGB representative.
    pub srgb: String,
    /// Linear sRGB representative.
    pub lin_srgb: String,
    /// ACEScg representative.
    pub acescg: String,
    /// Rec709 representative.
    pub rec709: String,
    /// Scene-linear role target.
    pub scene_linear: String,
}

impl ClassAliases {
    /// Representative for `class`, empty if none discovered.
    pub fn get(&self, class: ClassAlias) -> &str {
        match class {
            ClassAlias::Srgb => &self.srgb,
            ClassAlias::LinSrgb => &self.lin_srgb,
            ClassAlias::AcesCg => &self.acescg,
            ClassAlias::Rec709 => &self.rec709,
            ClassAlias::SceneLinear => &self.scene_linear,
        }
    }

    fn slot(&mut self, class: ClassAlias) -> &mut String {
        match class {
            ClassAlias::Srgb => &mut self.srgb,
            ClassAlias::LinSrgb => &mut self.lin_srgb,
            ClassAlias::AcesCg => &mut self.acescg,
            ClassAlias::Rec709 => &mut self.rec709,
            ClassAlias::SceneLinear => &mut self.scene_linear,
        }
    }

    /// Records `name` for `class` unless one is already recorded.
    pub fn set_if_empty(&mut self, class: ClassAlias, name: &str) {
        let slot = self.slot(class);
        if slot.is_empty() {
            *slot = name.to_string();
        }
    }

    /// Overwrites the representative for `class`.
    pub fn set(&mut self, class: ClassAlias, name: &str) {
        *self.slot(class) = name.to_string();
    }
}

/// Result of one classification computation, applied atomically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    /// Flags to add.
    pub flags: CsFlags,
    /// Class whose representative should become this entry, if unset.
    pub alias: Option<ClassAlias>,
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: Vec<ColorSpaceEntry>,
    aliases: ClassAliases,
}

/// Thread-safe color space inventory.
#[derive(Debug, Default)]
pub struct Registry {
    state: RwLock<RegistryState>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an entry. Duplicate names are allowed (aliases).
    pub fn add(&self, name: &str, index: usize, flags: CsFlags) {
        self.write()
            .entries
            .push(ColorSpaceEntry::new(name, index, flags));
    }

    /// Removes all entries and aliases.
    pub fn clear(&self) {
        let mut state = self.write();
        state.entries.clear();
        state.aliases = ClassAliases::default();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Entry name at position `pos`.
    pub fn name_at(&self, pos: usize) -> Option<String> {
        self.read().entries.get(pos).map(|e| e.name.clone())
    }

    /// All entry names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.read().entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Position of the first entry named exactly `name` (case-sensitive).
    pub fn position(&self, name: &str) -> Option<usize> {
        self.read().entries.iter().position(|e| e.name == name)
    }

    /// Snapshot of the first entry named exactly `name`.
    pub fn find(&self, name: &str) -> Option<ColorSpaceEntry> {
        self.read().entries.iter().find(|e| e.name == name).cloned()
    }

    /// Snapshot of the entry at `pos`.
    pub fn entry_at(&self, pos: usize) -> Option<ColorSpaceEntry> {
        self.read().entries.get(pos).cloned()
    }

    /// Snapshot of the class representatives.
    pub fn aliases(&self) -> ClassAliases {
        self.read().aliases.clone()
    }

    /// Representative name for one class.
    pub fn alias(&self, class: ClassAlias) -> String {
        self.read().aliases.get(class).to_string()
    }

    /// Overwrites a class representative.
    pub fn set_alias(&self, class: ClassAlias, name: &str) {
        self.write().aliases.set(class, name);
    }

    /// Adds flags to the first entry named `name` and records it as the
    /// representative of `alias` if none is recorded. Returns false if the
    /// name is unknown.
    pub fn accrete(&self, name: &str, flags: CsFlags, alias: Option<ClassAlias>) -> bool {
        let mut state = self.write();
        let RegistryState { entries, aliases } = &mut *state;
        let Some(entry) = entries.iter_mut().find(|e| e.name == name) else {
            return false;
        };
        entry.accrete(flags);
        if let Some(class) = alias {
            aliases.set_if_empty(class, &entry.name);
        }
        true
    }

    /// Applies a name-pass result to the entry at `pos` and marks it final.
    pub fn mark_classified(&self, pos: usize, result: Classification) {
        let mut state = self.write();
        let RegistryState { entries, aliases } = &mut *state;
        if let Some(entry) = entries.get_mut(pos) {
            entry.accrete(result.flags);
            if let Some(class) = result.alias {
                aliases.set_if_empty(class, &entry.name);
            }
            entry.state = ClassState::Classified;
        }
    }

    /// Starts lazy classification of the entry at `pos`.
    ///
    /// Returns a snapshot to classify, or `None` if the entry is already
    /// final (or out of range). A concurrent caller seeing `Classifying`
    /// also gets a snapshot; the first commit wins.
    pub fn begin_classify(&self, pos: usize) -> Option<ColorSpaceEntry> {
        if self.read().entries.get(pos)?.is_examined() {
            return None;
        }
        let mut state = self.write();
        let entry = state.entries.get_mut(pos)?;
        match entry.state {
            ClassState::Classified => None,
            ClassState::Unclassified | ClassState::Classifying => {
                entry.state = ClassState::Classifying;
                Some(entry.clone())
            }
        }
    }

    /// Commits a lazy classification result. Returns false if another
    /// thread committed first (the result is discarded).
    pub fn commit_classification(&self, pos: usize, result: Classification) -> bool {
        let mut state = self.write();
        let RegistryState { entries, aliases } = &mut *state;
        let Some(entry) = entries.get_mut(pos) else {
            return false;
        };
        if entry.state == ClassState::Classified {
            return false;
        }
        entry.accrete(result.flags);
        if let Some(class) = result.alias {
            aliases.set_if_empty(class, &entry.name);
        }
        entry.state = ClassState::Classified;
        true
    }
}
