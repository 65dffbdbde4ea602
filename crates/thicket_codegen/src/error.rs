// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

use crate::options::OptionsError;
use crate::types::TypeName;

/// Why a component could not be generated.
///
/// User mistakes in the declarations are reported to the diagnostic sink one by one; this type
/// only summarizes the outcome.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerateError {
    /// A referenced type is not available yet. Retrying in a later pass may succeed.
    #[error("`{type_name}` is not available yet, retry in a later pass")]
    Deferred {
        /// The unavailable type.
        type_name: TypeName,
    },

    /// The declarations contain errors, all of which were reported to the diagnostic sink.
    #[error("component has {error_count} error(s)")]
    Invalid {
        /// How many errors were reported.
        error_count: usize,
    },

    /// The requested root component is not declared.
    #[error("`{0}` is not a declared component")]
    UnknownComponent(TypeName),

    /// The compiler options could not be parsed.
    #[error(transparent)]
    Options(#[from] OptionsError),
}

impl GenerateError {
    /// Returns `true` if the same unit of work may succeed in a later pass.
    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }
}
