//! Transform builders.
//!
//! Each builder turns a request into a [`ProcessorKey`], consults the
//! config's [`ProcessorCache`](crate::ProcessorCache) and only on a miss
//! asks the engine to compile. Engine errors (and panics) never escape: the
//! message lands in the config's error slot and an empty handle is cached
//! and returned, so a failing request is compiled only once.
//!
//! Matrix transforms never touch the engine and are not cached.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, warn};

use crate::cache::{ContextKey, ProcessorKey};
use crate::config::ColorConfig;
use crate::context::Context;
use crate::error::EngineResult;
use crate::engine::{
    ConfigRef, Interpolation, ProcessorRef, ROLE_SCENE_LINEAR, TransformDirection,
    TransformRequest,
};
use crate::processor::{ColorProcessor, ProcessorHandle};

/// Message recorded when the engine panics while compiling.
pub const UNKNOWN_ENGINE_ERROR: &str = "An unknown error occurred in the color engine";

impl ColorConfig {
    /// Runs one engine compile, absorbing errors and panics into the error
    /// slot.
    fn compile<F>(&self, what: &str, compile: F) -> ProcessorHandle
    where
        F: FnOnce() -> EngineResult<ProcessorRef>,
    {
        match panic::catch_unwind(AssertUnwindSafe(compile)) {
            Ok(Ok(processor)) => {
                debug!(what, "compiled processor");
                ProcessorHandle::new(ColorProcessor::engine(processor))
            }
            Ok(Err(e)) => {
                warn!(what, error = %e, "engine could not compile processor");
                self.error(e.to_string());
                ProcessorHandle::empty()
            }
            Err(_) => {
                warn!(what, "engine panicked while compiling processor");
                self.error(UNKNOWN_ENGINE_ERROR);
                ProcessorHandle::empty()
            }
        }
    }

    /// Current context of `config` with the comma-list overrides applied.
    fn context_for(config: &ConfigRef, keys: &str, values: &str) -> Context {
        config.current_context().with_overrides(keys, values)
    }

    /// Processor converting `input` to `output`.
    ///
    /// Names are resolved first. Spaces known only to the interop
    /// identities document are bridged across documents. `context_key` and
    /// `context_value` are parallel comma-separated lists of context
    /// variables.
    pub fn create_color_processor(
        &self,
        input: &str,
        output: &str,
        context_key: &str,
        context_value: &str,
    ) -> ProcessorHandle {
        let src = self.resolve(input);
        let dst = self.resolve(output);
        let key = ProcessorKey::conversion(&src, &dst, ContextKey::new(context_key, context_value));
        self.cache().get_or_insert_with(key, || {
            let (Some(engine), Some(config)) = (self.engine(), self.live()) else {
                return ProcessorHandle::empty();
            };
            let context = Self::context_for(config, context_key, context_value);

            let interop = self.interop_config();
            let in_live = config.colorspace(&src).is_some();
            let out_live = config.colorspace(&dst).is_some();
            let in_interop = !in_live && interop.is_some_and(|c| c.colorspace(&src).is_some());
            let out_interop = !out_live && interop.is_some_and(|c| c.colorspace(&dst).is_some());

            match interop.filter(|_| (in_interop || out_interop) && !(in_live && out_live)) {
                Some(interop) => {
                    let src_cfg = if in_interop { interop } else { config };
                    let dst_cfg = if out_interop { interop } else { config };
                    self.compile("interop conversion", || {
                        engine.processor_between_configs(
                            &context,
                            src_cfg.as_ref(),
                            &src,
                            dst_cfg.as_ref(),
                            &dst,
                            TransformDirection::Forward,
                        )
                    })
                }
                None => self.compile("conversion", || {
                    config.processor(
                        &context,
                        &TransformRequest::ColorSpace { src: &src, dst: &dst },
                        TransformDirection::Forward,
                    )
                }),
            }
        })
    }

    /// Processor applying `looks` between `input` and `output`.
    ///
    /// The inverse keeps the endpoints: it still maps `input` to `output`
    /// but undoes the looks, rather than inverting `input -> output`.
    pub fn create_look_transform(
        &self,
        looks: &str,
        input: &str,
        output: &str,
        inverse: bool,
        context_key: &str,
        context_value: &str,
    ) -> ProcessorHandle {
        let key = ProcessorKey::Look {
            looks: looks.to_string(),
            src: input.to_string(),
            dst: output.to_string(),
            inverse,
            context: ContextKey::new(context_key, context_value),
        };
        self.cache().get_or_insert_with(key, || {
            let Some(config) = self.live() else {
                return ProcessorHandle::empty();
            };
            let (src, dst) = if inverse {
                (self.resolve(output), self.resolve(input))
            } else {
                (self.resolve(input), self.resolve(output))
            };
            let context = Self::context_for(config, context_key, context_value);
            self.compile("look", || {
                config.processor(
                    &context,
                    &TransformRequest::Look { looks, src: &src, dst: &dst },
                    TransformDirection::from_inverse(inverse),
                )
            })
        })
    }

    /// Substitutes the config defaults for empty or `"default"` display and
    /// view names.
    pub(crate) fn display_and_view(&self, display: &str, view: &str, input: &str) -> (String, String) {
        let display = if display.is_empty() || display == "default" {
            self.default_display_name().unwrap_or_default()
        } else {
            display.to_string()
        };
        let view = if view.is_empty() || view == "default" {
            self.default_view_name_for(&display, input).unwrap_or_default()
        } else {
            view.to_string()
        };
        (display, view)
    }

    /// Processor from `input` through a display/view.
    ///
    /// Empty or `"default"` display and view pick the config defaults.
    /// Non-empty `looks` replaces the view's own looks. An input known only
    /// to the interop identities document is bridged to `scene_linear`
    /// first.
    #[allow(clippy::too_many_arguments)]
    pub fn create_display_transform(
        &self,
        display: &str,
        view: &str,
        input: &str,
        looks: &str,
        inverse: bool,
        context_key: &str,
        context_value: &str,
    ) -> ProcessorHandle {
        let (display, view) = self.display_and_view(display, view, input);
        let key = ProcessorKey::Display {
            display: display.clone(),
            view: view.clone(),
            src: input.to_string(),
            looks: looks.to_string(),
            inverse,
            context: ContextKey::new(context_key, context_value),
        };
        self.cache().get_or_insert_with(key, || {
            let (Some(engine), Some(config)) = (self.engine(), self.live()) else {
                return ProcessorHandle::empty();
            };
            let interop = self.interop_config();
            let substitute = config.colorspace(input).is_none()
                && interop.is_some_and(|c| c.colorspace(input).is_some());
            let src = if substitute { ROLE_SCENE_LINEAR } else { input };
            let direction = TransformDirection::from_inverse(inverse);
            let context = Self::context_for(config, context_key, context_value);

            self.compile("display", || {
                let display_proc = config.processor(
                    &context,
                    &TransformRequest::DisplayView {
                        src,
                        display: &display,
                        view: &view,
                        looks_override: Some(looks).filter(|l| !l.is_empty()),
                    },
                    direction,
                )?;
                let Some(interop) = interop.filter(|_| !input.eq_ignore_ascii_case(src)) else {
                    return Ok(display_proc);
                };
                let pre = engine.processor_between_configs(
                    &context,
                    interop.as_ref(),
                    input,
                    config.as_ref(),
                    src,
                    direction,
                )?;
                if inverse {
                    engine.combine(&[display_proc, pre])
                } else {
                    engine.combine(&[pre, display_proc])
                }
            })
        })
    }

    /// Processor reading an external transform file.
    ///
    /// Relative paths are joined to the working directory. Works with the
    /// engine's current config when no document is loaded.
    pub fn create_file_transform(&self, name: &str, inverse: bool) -> ProcessorHandle {
        let key = ProcessorKey::file(name, inverse);
        self.cache().get_or_insert_with(key, || {
            let Some(engine) = self.engine() else {
                return ProcessorHandle::empty();
            };
            let config = match self.live() {
                Some(c) => c.clone(),
                None => match engine.current_config() {
                    Ok(c) => c,
                    Err(e) => {
                        self.error(e.to_string());
                        return ProcessorHandle::empty();
                    }
                },
            };
            let working_dir = self.working_dir();
            let path = if Path::new(name).is_relative() && !working_dir.as_os_str().is_empty() {
                working_dir.join(name).to_string_lossy().into_owned()
            } else {
                name.to_string()
            };
            let context = config.current_context();
            self.compile("file", || {
                config.processor(
                    &context,
                    &TransformRequest::File {
                        path: &path,
                        interpolation: Interpolation::Best,
                    },
                    TransformDirection::from_inverse(inverse),
                )
            })
        })
    }

    /// Processor for a config-defined named transform.
    pub fn create_named_transform(
        &self,
        name: &str,
        inverse: bool,
        context_key: &str,
        context_value: &str,
    ) -> ProcessorHandle {
        let key = ProcessorKey::named(name, inverse, ContextKey::new(context_key, context_value));
        self.cache().get_or_insert_with(key, || {
            let Some(config) = self.live() else {
                return ProcessorHandle::empty();
            };
            let context = Self::context_for(config, context_key, context_value);
            self.compile("named", || {
                config.processor(
                    &context,
                    &TransformRequest::Named { name },
                    TransformDirection::from_inverse(inverse),
                )
            })
        })
    }

    /// Matrix processor from 16 row-major values (row-vector convention).
    /// Never cached.
    pub fn create_matrix_transform(&self, m: &[f32; 16], inverse: bool) -> ProcessorHandle {
        ProcessorHandle::new(ColorProcessor::matrix(m, inverse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engineless_requests_are_empty_without_error() {
        let config = ColorConfig::without_engine();
        assert!(config.create_color_processor("sRGB", "linear", "", "").is_empty());
        assert!(config.create_file_transform("grade.cube", false).is_empty());
        assert!(config.create_named_transform("nt", false, "", "").is_empty());
        assert!(config.create_look_transform("look", "a", "b", false, "", "").is_empty());
        assert!(!config.has_error());
        // Cached even though empty.
        assert_eq!(config.cache().len(), 4);
    }

    #[test]
    fn matrix_transform_is_not_cached() {
        let config = ColorConfig::without_engine();
        #[rustfmt::skip]
        let m = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        let a = config.create_matrix_transform(&m, false);
        let b = config.create_matrix_transform(&m, false);
        assert!(a.is_noop());
        assert!(!a.ptr_eq(&b));
        assert!(config.cache().is_empty());
    }
}
