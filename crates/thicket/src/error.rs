// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::sync::Arc;

/// A component creator was asked to build before a required setter was called.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{component} requires `{requirement}` to be set before it is built")]
pub struct MissingRequirement {
    component: Cow<'static, str>,
    requirement: Cow<'static, str>,
}

impl MissingRequirement {
    /// Creates an error naming the component being built and the missing requirement.
    #[must_use]
    pub fn new(component: impl Into<Cow<'static, str>>, requirement: impl Into<Cow<'static, str>>) -> Self {
        Self {
            component: component.into(),
            requirement: requirement.into(),
        }
    }

    /// The component whose creator failed.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// The requirement that was never set.
    #[must_use]
    pub fn requirement(&self) -> &str {
        &self.requirement
    }
}

/// A production binding failed.
///
/// The error is cheap to clone so that a single failure can be observed by every consumer of the
/// failed producer.
#[derive(Debug, Clone, thiserror::Error)]
#[error("production failed: {source}")]
pub struct ProductionError {
    source: Arc<dyn std::error::Error + Send + Sync>,
}

impl ProductionError {
    /// Wraps the error returned by a producer method.
    pub fn new(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self { source: Arc::new(source) }
    }

    /// The error returned by the producer method.
    #[must_use]
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.source.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn missing_requirement_message() {
        let error = MissingRequirement::new("AppComponent", "config");

        assert_eq!(error.component(), "AppComponent");
        assert_eq!(error.requirement(), "config");
        assert_eq!(
            error.to_string(),
            "AppComponent requires `config` to be set before it is built"
        );
    }

    #[test]
    fn production_error_keeps_cause() {
        let error = ProductionError::new(DiskFull);

        assert_eq!(error.to_string(), "production failed: disk full");
        assert_eq!(error.clone().cause().to_string(), "disk full");
    }
}
