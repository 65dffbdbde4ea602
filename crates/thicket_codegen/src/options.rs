// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Generator configuration.

use thiserror::Error;

const FAST_INIT: &str = "thicket.fastInit";
const FULL_BINDING_GRAPH: &str = "thicket.fullBindingGraph";

/// Options that change how components are resolved and generated.
///
/// # Examples
///
/// ```
/// use thicket_codegen::options::CompilerOptions;
///
/// let options = CompilerOptions::from_options([("thicket.fastInit", "enabled")]).unwrap();
/// assert!(options.fast_init());
/// assert!(!options.full_binding_graph());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct CompilerOptions {
    fast_init: bool,
    full_binding_graph: bool,
}

impl CompilerOptions {
    /// Generates memoized fields and switching providers instead of one framework field per
    /// binding, so that component construction does less work up front.
    #[must_use]
    pub const fn with_fast_init(self, fast_init: bool) -> Self {
        Self { fast_init, ..self }
    }

    /// Resolves every binding of every installed module, not only the reachable ones.
    #[must_use]
    pub const fn with_full_binding_graph(self, full_binding_graph: bool) -> Self {
        Self {
            full_binding_graph,
            ..self
        }
    }

    /// Whether fast-init mode is on.
    #[must_use]
    pub const fn fast_init(&self) -> bool {
        self.fast_init
    }

    /// Whether full binding graph mode is on.
    #[must_use]
    pub const fn full_binding_graph(&self) -> bool {
        self.full_binding_graph
    }

    /// Parses processor-style `key=value` options. Unrelated keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`OptionsError::InvalidValue`] if a recognized key has a value other than
    /// `enabled` or `disabled`.
    pub fn from_options<I, K, V>(options: I) -> Result<Self, OptionsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut parsed = Self::default();
        for (key, value) in options {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                FAST_INIT => parsed.fast_init = parse_feature(key, value)?,
                FULL_BINDING_GRAPH => parsed.full_binding_graph = parse_feature(key, value)?,
                _ => {}
            }
        }
        Ok(parsed)
    }
}

fn parse_feature(key: &str, value: &str) -> Result<bool, OptionsError> {
    match value.to_ascii_lowercase().as_str() {
        "enabled" => Ok(true),
        "disabled" => Ok(false),
        _ => Err(OptionsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// An option could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum OptionsError {
    /// The value is not `enabled` or `disabled`.
    #[error("invalid value `{value}` for option `{key}`, expected `enabled` or `disabled`")]
    InvalidValue {
        /// The option key.
        key: String,
        /// The rejected value.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_are_disabled() {
        let options = CompilerOptions::from_options(Vec::<(&str, &str)>::new()).unwrap();

        assert_eq!(options, CompilerOptions::default());
    }

    #[test]
    fn values_are_case_insensitive() {
        let options =
            CompilerOptions::from_options([("thicket.fullBindingGraph", "ENABLED"), ("other", "x")]).unwrap();

        assert!(options.full_binding_graph());
        assert!(!options.fast_init());
    }

    #[test]
    fn invalid_value_is_rejected() {
        let error = CompilerOptions::from_options([("thicket.fastInit", "yes")]).unwrap_err();

        assert_eq!(
            error.to_string(),
            "invalid value `yes` for option `thicket.fastInit`, expected `enabled` or `disabled`"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_from_json() {
        let options: CompilerOptions = serde_json::from_str(r#"{ "fastInit": true }"#).unwrap();

        assert_eq!(options, CompilerOptions::default().with_fast_init(true));
    }
}
