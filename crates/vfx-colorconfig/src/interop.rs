//! Portable color space identities and their CICP codes.
//!
//! Interop ids (`srgb_rec709_scene`, `pq_rec2020_display`, ...) name color
//! spaces independently of any particular config. Many of them also have a
//! CICP coding (ITU-T H.273: primaries, transfer, matrix, range), used to
//! tag content for video-oriented systems.
//!
//! The table is fixed and ordered: display-referred ids come first, so a
//! code-to-id lookup prefers the display interpretation.
//!
//! ```
//! use vfx_colorconfig::interop;
//!
//! assert_eq!(interop::cicp_for_id("srgb_rec709_display"), Some([1, 13, 1, 1]));
//! assert_eq!(interop::id_from_cicp([1, 13, 0, 0]), Some("srgb_rec709_display"));
//! ```

/// Engine document declaring one color space per interop id.
///
/// Handed to the engine as inline text; resolution and bridging
/// transforms consult it when the live config lacks a name.
pub const INTEROP_IDENTITIES_CONFIG: &str = include_str!("interop_identities.ocio");

/// Interop id of non-color data.
pub const DATA_ID: &str = "data";

/// Interop id of unknown content.
pub const UNKNOWN_ID: &str = "unknown";

/// CICP color primaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CicpPrimaries {
    /// ITU-R BT.709 / sRGB.
    Rec709 = 1,
    /// Unspecified.
    Unspecified = 2,
    /// ITU-R BT.2020.
    Rec2020 = 9,
    /// CIE 1931 XYZ, D65 white.
    XyzD65 = 10,
    /// Display P3, D65 white.
    P3D65 = 12,
}

/// CICP transfer characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CicpTransfer {
    /// ITU-R BT.709.
    Bt709 = 1,
    /// Unspecified.
    Unspecified = 2,
    /// Pure 2.2 gamma.
    Gamma22 = 4,
    /// Linear.
    Linear = 8,
    /// IEC 61966-2-1 sRGB.
    Srgb = 13,
    /// SMPTE ST 2084 (PQ).
    Pq = 16,
    /// Pure 2.6 gamma (SMPTE ST 428-1).
    Gamma26 = 17,
    /// ARIB STD-B67 (HLG).
    Hlg = 18,
}

/// CICP matrix coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CicpMatrix {
    /// Identity (RGB).
    Rgb = 0,
    /// ITU-R BT.709.
    Bt709 = 1,
    /// Unspecified.
    Unspecified = 2,
    /// BT.2020 non-constant luminance.
    Rec2020Ncl = 9,
    /// BT.2020 constant luminance.
    Rec2020Cl = 10,
}

/// CICP video range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CicpRange {
    /// Narrow ("legal") range.
    Narrow = 0,
    /// Full range.
    Full = 1,
}

/// One row of the identity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteropIdentity {
    /// Portable id.
    pub id: &'static str,
    /// `[primaries, transfer, matrix, range]`, if the space has a CICP code.
    pub cicp: Option<[i32; 4]>,
}

impl InteropIdentity {
    const fn uncoded(id: &'static str) -> Self {
        Self { id, cicp: None }
    }

    const fn coded(
        id: &'static str,
        primaries: CicpPrimaries,
        transfer: CicpTransfer,
        matrix: CicpMatrix,
    ) -> Self {
        Self {
            id,
            cicp: Some([
                primaries as i32,
                transfer as i32,
                matrix as i32,
                CicpRange::Full as i32,
            ]),
        }
    }
}

use CicpMatrix as M;
use CicpPrimaries as P;
use CicpTransfer as T;

/// Known interop ids, display-referred first.
pub static INTEROP_IDENTITIES: &[InteropIdentity] = &[
    InteropIdentity::coded("srgb_rec709_display", P::Rec709, T::Srgb, M::Bt709),
    InteropIdentity::coded("g24_rec709_display", P::Rec709, T::Bt709, M::Bt709),
    InteropIdentity::coded("srgb_p3d65_display", P::P3D65, T::Srgb, M::Bt709),
    InteropIdentity::coded("srgbe_p3d65_display", P::P3D65, T::Srgb, M::Bt709),
    InteropIdentity::coded("pq_p3d65_display", P::P3D65, T::Pq, M::Rec2020Ncl),
    InteropIdentity::coded("pq_rec2020_display", P::Rec2020, T::Pq, M::Rec2020Ncl),
    InteropIdentity::coded("hlg_rec2020_display", P::Rec2020, T::Hlg, M::Rec2020Ncl),
    InteropIdentity::coded("g22_rec709_display", P::Rec709, T::Gamma22, M::Bt709),
    // Adobe RGB primaries have no CICP code.
    InteropIdentity::uncoded("g22_adobergb_display"),
    InteropIdentity::coded("g26_p3d65_display", P::P3D65, T::Gamma26, M::Bt709),
    InteropIdentity::coded("g26_xyzd65_display", P::XyzD65, T::Gamma26, M::Unspecified),
    InteropIdentity::coded("pq_xyzd65_display", P::XyzD65, T::Pq, M::Unspecified),
    InteropIdentity::uncoded("lin_ap1_scene"),
    InteropIdentity::uncoded("lin_ap0_scene"),
    InteropIdentity::coded("lin_rec709_scene", P::Rec709, T::Linear, M::Bt709),
    InteropIdentity::coded("lin_p3d65_scene", P::P3D65, T::Linear, M::Bt709),
    InteropIdentity::coded("lin_rec2020_scene", P::Rec2020, T::Linear, M::Rec2020Cl),
    InteropIdentity::uncoded("lin_adobergb_scene"),
    InteropIdentity::coded("lin_ciexyzd65_scene", P::XyzD65, T::Linear, M::Unspecified),
    InteropIdentity::coded("srgb_rec709_scene", P::Rec709, T::Srgb, M::Bt709),
    InteropIdentity::coded("g22_rec709_scene", P::Rec709, T::Gamma22, M::Bt709),
    InteropIdentity::uncoded("g18_rec709_scene"),
    InteropIdentity::uncoded("srgb_ap1_scene"),
    InteropIdentity::uncoded("g22_ap1_scene"),
    InteropIdentity::coded("srgb_p3d65_scene", P::P3D65, T::Srgb, M::Bt709),
    InteropIdentity::uncoded("g22_adobergb_scene"),
    InteropIdentity::uncoded(DATA_ID),
    InteropIdentity::coded(UNKNOWN_ID, P::Unspecified, T::Unspecified, M::Unspecified),
];

/// Table row for `id` (exact match).
pub fn find(id: &str) -> Option<&'static InteropIdentity> {
    INTEROP_IDENTITIES.iter().find(|row| row.id == id)
}

/// CICP code of `id`, if it has one.
pub fn cicp_for_id(id: &str) -> Option<[i32; 4]> {
    find(id).and_then(|row| row.cicp)
}

/// First id whose primaries and transfer match `cicp`.
///
/// Matrix and range are ignored: several matrix encodings share one id.
pub fn id_from_cicp(cicp: [i32; 4]) -> Option<&'static str> {
    INTEROP_IDENTITIES
        .iter()
        .find(|row| {
            row.cicp
                .is_some_and(|code| code[0] == cicp[0] && code[1] == cicp[1])
        })
        .map(|row| row.id)
}
