//! # vfx-colorconfig
//!
//! OIIO-style color configuration layer on top of a pluggable color engine.
//!
//! A [`ColorConfig`] owns one loaded engine document and adds what image
//! pipelines need around it:
//!
//! - **Classification** - every color space is tagged with coarse
//!   categories (sRGB, linear sRGB, ACEScg, Rec.709) by name, by comparing
//!   against the engine's builtin reference config, or by probing pixels.
//! - **Resolution** - [`ColorConfig::resolve`] maps aliases, roles,
//!   interop ids and common synonyms to a concrete space;
//!   [`ColorConfig::equivalent`] compares two names.
//! - **Interop** - portable interop ids and CICP codes ([`interop`]).
//! - **Processor cache** - transform builders share a per-config
//!   [`ProcessorCache`]; failures are cached too and reported through a
//!   sticky error message.
//! - **Image operations** - [`imagebufalgo`] applies processors to
//!   [`imagebuf::ImageBuf`]s in parallel and keeps color metadata current.
//!
//! Without an engine (none registered, or `VFX_DISABLE_OCIO` set) the
//! config runs on a built-in inventory of well-known names and the name
//! heuristics alone.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vfx_colorconfig::{set_default_engine, ColorConfig};
//!
//! set_default_engine(Arc::new(MyEngine::new()));
//!
//! let config = ColorConfig::new();
//! let processor = config.create_color_processor("sRGB", "ACEScg", "", "");
//! if processor.is_empty() {
//!     eprintln!("{}", config.geterror(true));
//! }
//! ```
//!
//! # Engine contract
//!
//! Implement [`Engine`], [`EngineConfig`] and [`EngineProcessor`] to plug
//! in a color engine. Everything else in this crate is engine-agnostic.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cache;
mod classify;
mod config;
mod context;
mod error;
mod factory;
mod filepath;
mod processor;
mod registry;
mod resolve;
mod settings;

pub mod engine;
pub mod imagebuf;
pub mod imagebufalgo;
pub mod interop;

// Re-exports
pub use cache::{CacheStats, ContextKey, ProcessorCache, ProcessorKey};
pub use classify::{classify_by_name, transform_has_lut3d};
pub use config::{
    default_engine, equivalent_colorspace, set_default_engine, ColorConfig, ColorConfigBuilder,
};
pub use context::{parse_pairs, Context};
pub use engine::{
    BitDepth, ColorSpaceInfo, ConfigRef, ConfigSource, Engine, EngineConfig, EngineProcessor,
    Interpolation, NamedTransformInfo, ProcessorRef, ReferenceSpace, TransformDirection,
    TransformNode, TransformRequest,
};
pub use error::{ColorError, ColorResult, EngineError, EngineResult};
pub use factory::UNKNOWN_ENGINE_ERROR;
pub use processor::{ColorProcessor, ProcessorHandle};
pub use registry::{
    ClassAlias, ClassAliases, ClassState, Classification, ColorSpaceEntry, CsFlags, Registry,
};
pub use settings::Settings;
