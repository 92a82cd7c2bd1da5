//! Image description: format, region of interest and metadata.

use std::collections::HashMap;

/// Per-channel storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataFormat {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 16-bit half-precision float.
    F16,
    /// 32-bit single-precision float.
    #[default]
    F32,
}

impl DataFormat {
    /// Number of bytes per channel.
    #[inline]
    pub const fn bytes_per_channel(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::F16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }

    /// True for floating-point formats.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F16 | Self::F32)
    }
}

/// Metadata attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Integer value
    Int(i64),
    /// Floating-point value
    Float(f64),
    /// String value
    String(String),
}

impl AttrValue {
    /// Returns this value as an integer, if applicable.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) => Some(*v as i64),
            Self::String(_) => None,
        }
    }

    /// Returns this value as a float, if applicable.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::String(_) => None,
        }
    }

    /// Returns this value as a string, if applicable.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for AttrValue {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

/// Attribute holding the declared color space of an image.
pub const ATTR_COLORSPACE: &str = "oiio:ColorSpace";
/// Attribute marking pixels as not premultiplied.
pub const ATTR_UNASSOCIATED_ALPHA: &str = "oiio:UnassociatedAlpha";
/// Attribute holding a display gamma hint.
pub const ATTR_GAMMA: &str = "oiio:Gamma";

/// Region of interest: half-open pixel and channel ranges.
///
/// An undefined ROI (`xbegin == i32::MIN`) means "everything".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Roi {
    /// X begin (inclusive)
    pub xbegin: i32,
    /// X end (exclusive)
    pub xend: i32,
    /// Y begin (inclusive)
    pub ybegin: i32,
    /// Y end (exclusive)
    pub yend: i32,
    /// Channel begin (inclusive)
    pub chbegin: i32,
    /// Channel end (exclusive)
    pub chend: i32,
}

impl Default for Roi {
    fn default() -> Self {
        Self::all()
    }
}

impl Roi {
    /// Creates a ROI with all bounds specified.
    #[inline]
    pub const fn new(
        xbegin: i32,
        xend: i32,
        ybegin: i32,
        yend: i32,
        chbegin: i32,
        chend: i32,
    ) -> Self {
        Self {
            xbegin,
            xend,
            ybegin,
            yend,
            chbegin,
            chend,
        }
    }

    /// Undefined ROI meaning "the whole image".
    #[inline]
    pub const fn all() -> Self {
        Self::new(i32::MIN, 0, 0, 0, 0, 0)
    }

    /// True unless this is [`Roi::all`].
    #[inline]
    pub const fn defined(&self) -> bool {
        self.xbegin != i32::MIN
    }

    /// Width in pixels.
    #[inline]
    pub const fn width(&self) -> usize {
        span(self.xbegin, self.xend)
    }

    /// Height in pixels.
    #[inline]
    pub const fn height(&self) -> usize {
        span(self.ybegin, self.yend)
    }

    /// Number of channels.
    #[inline]
    pub const fn nchannels(&self) -> usize {
        span(self.chbegin, self.chend)
    }

    /// Number of pixels.
    #[inline]
    pub const fn npixels(&self) -> usize {
        self.width() * self.height()
    }

    /// True if `other` lies entirely within this ROI.
    pub fn contains(&self, other: &Roi) -> bool {
        other.xbegin >= self.xbegin
            && other.xend <= self.xend
            && other.ybegin >= self.ybegin
            && other.yend <= self.yend
            && other.chbegin >= self.chbegin
            && other.chend <= self.chend
    }
}

const fn span(begin: i32, end: i32) -> usize {
    if end > begin {
        (end - begin) as usize
    } else {
        0
    }
}

/// Image dimensions, pixel format and metadata.
#[derive(Debug, Clone, Default)]
pub struct ImageSpec {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Number of channels per pixel
    pub nchannels: usize,
    /// Data type for each channel
    pub format: DataFormat,
    /// Optional channel names (e.g., ["R", "G", "B", "A"])
    pub channel_names: Vec<String>,
    /// Index of the alpha channel, if any
    pub alpha_channel: Option<usize>,
    /// Arbitrary metadata attributes
    pub attributes: HashMap<String, AttrValue>,
}

impl ImageSpec {
    /// Creates a spec. Four-channel images get `A` as alpha.
    pub fn new(width: u32, height: u32, nchannels: usize, format: DataFormat) -> Self {
        let names = ["R", "G", "B", "A"];
        let channel_names = (0..nchannels)
            .map(|c| names.get(c).map_or_else(|| format!("channel{c}"), |n| n.to_string()))
            .collect();
        Self {
            width,
            height,
            nchannels,
            format,
            channel_names,
            alpha_channel: (nchannels == 4).then_some(3),
            attributes: HashMap::new(),
        }
    }

    /// RGBA float spec.
    pub fn rgba(width: u32, height: u32) -> Self {
        Self::new(width, height, 4, DataFormat::F32)
    }

    /// RGB float spec.
    pub fn rgb(width: u32, height: u32) -> Self {
        Self::new(width, height, 3, DataFormat::F32)
    }

    /// Full-image ROI.
    pub fn roi(&self) -> Roi {
        Roi::new(0, self.width as i32, 0, self.height as i32, 0, self.nchannels as i32)
    }

    /// Total number of samples.
    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize * self.nchannels
    }

    /// Sets an attribute value.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Gets an attribute value by key.
    pub fn get_attr(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    /// Gets an attribute as a string.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get_attr(key).and_then(|v| v.as_str())
    }

    /// Gets an attribute as an integer.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get_attr(key).and_then(|v| v.as_int())
    }

    /// Gets an attribute as a float.
    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get_attr(key).and_then(|v| v.as_float())
    }

    /// Removes an attribute; returns the old value.
    pub fn erase_attr(&mut self, key: &str) -> Option<AttrValue> {
        self.attributes.remove(key)
    }

    /// Declared color space, if any.
    pub fn colorspace(&self) -> Option<&str> {
        self.get_string(ATTR_COLORSPACE).filter(|s| !s.is_empty())
    }
}
