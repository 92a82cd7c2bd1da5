//! Context variables for transform requests.
//!
//! Color engine documents may reference variables such as `$SHOT` or
//! `${CAMERA_EI}` in file paths. Callers supply values as two parallel
//! comma-separated lists (keys and values); [`Context::with_overrides`]
//! installs them on top of an ambient context only when both lists are
//! non-empty and have the same length.
//!
//! # Example
//!
//! ```
//! use vfx_colorconfig::Context;
//!
//! let mut ctx = Context::new();
//! ctx.set("SHOT", "sh010");
//! assert_eq!(ctx.resolve("/shows/$SHOT/grade.cube"), "/shows/sh010/grade.cube");
//!
//! let ctx = ctx.with_overrides("SEQ,EI", "sq01,800");
//! assert_eq!(ctx.get("EI"), Some("800"));
//! ```

use std::collections::BTreeMap;

/// String variables handed to the engine with every compile request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    vars: BTreeMap<String, String>,
}

impl Context {
    /// Creates an empty context.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a variable, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Looks up a variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Number of variables.
    #[inline]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// True if no variables are set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns a copy with the comma-separated `keys`/`values` installed.
    ///
    /// The lists are ignored (ambient copy returned) unless both are
    /// non-empty and contain the same number of items.
    pub fn with_overrides(&self, keys: &str, values: &str) -> Self {
        let mut ctx = self.clone();
        if let Some(pairs) = parse_pairs(keys, values) {
            for (k, v) in pairs {
                ctx.set(k, v);
            }
        }
        ctx
    }

    /// Expands `$VAR` and `${VAR}` references. Unknown variables are kept.
    pub fn resolve(&self, input: &str) -> String {
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            if chars.peek() == Some(&'{') {
                chars.next();
                let name: String = chars.by_ref().take_while(|&c| c != '}').collect();
                match self.get(&name) {
                    Some(value) => result.push_str(value),
                    None => {
                        result.push_str("${");
                        result.push_str(&name);
                        result.push('}');
                    }
                }
            } else {
                let mut name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match self.get(&name) {
                    _ if name.is_empty() => result.push('$'),
                    Some(value) => result.push_str(value),
                    None => {
                        result.push('$');
                        result.push_str(&name);
                    }
                }
            }
        }
        result
    }
}

/// Splits parallel comma lists into pairs, or `None` if they don't line up.
pub fn parse_pairs<'a>(keys: &'a str, values: &'a str) -> Option<Vec<(&'a str, &'a str)>> {
    let keys = split_list(keys);
    let values = split_list(values);
    if keys.is_empty() || values.is_empty() || keys.len() != values.len() {
        return None;
    }
    Some(keys.into_iter().zip(values).collect())
}

fn split_list(s: &str) -> Vec<&str> {
    if s.is_empty() {
        return Vec::new();
    }
    s.split(',').collect()
}
