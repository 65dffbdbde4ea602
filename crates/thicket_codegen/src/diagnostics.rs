// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The channel through which user-facing problems are reported.

use std::fmt::{Display, Formatter};

use tracing::{Level, event};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Prevents generation.
    Error,
    /// Worth fixing, but generation proceeds.
    Warning,
    /// Additional context.
    Note,
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// How serious the problem is.
    pub severity: Severity,
    /// What is wrong, including the dependency trace where one is known.
    pub message: String,
    /// The most specific declaration the problem is attributed to.
    pub element: Option<String>,
}

impl Diagnostic {
    /// An error attributed to `element`.
    #[must_use]
    pub fn error(message: impl Into<String>, element: Option<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            element,
        }
    }

    /// A warning attributed to `element`.
    #[must_use]
    pub fn warning(message: impl Into<String>, element: Option<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            element,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        };
        match &self.element {
            Some(element) => write!(f, "{severity}: {} [{element}]", self.message),
            None => write!(f, "{severity}: {}", self.message),
        }
    }
}

/// Receives diagnostics. Formatting and batching are up to the implementation.
pub trait DiagnosticSink {
    /// Accepts one diagnostic.
    fn report(&mut self, diagnostic: Diagnostic);
}

/// A [`DiagnosticSink`] that keeps everything it receives.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    reported: Vec<Diagnostic>,
}

impl Diagnostics {
    /// An empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of reported errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.reported
            .iter()
            .filter(|diagnostic| diagnostic.severity == Severity::Error)
            .count()
    }

    /// Returns `true` if nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reported.is_empty()
    }

    /// Iterates the reported diagnostics in order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.reported.iter()
    }

    /// The messages of all reported errors, for assertions.
    #[must_use]
    pub fn error_messages(&self) -> Vec<&str> {
        self.reported
            .iter()
            .filter(|diagnostic| diagnostic.severity == Severity::Error)
            .map(|diagnostic| diagnostic.message.as_str())
            .collect()
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.reported.push(diagnostic);
    }
}

/// Forwards to an inner sink while counting errors.
pub(crate) struct Reporter<'a> {
    sink: &'a mut dyn DiagnosticSink,
    errors: usize,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(sink: &'a mut dyn DiagnosticSink) -> Self {
        Self { sink, errors: 0 }
    }

    pub(crate) fn error(&mut self, message: impl Into<String>, element: Option<String>) {
        self.report(Diagnostic::error(message, element));
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        event!(Level::DEBUG, %diagnostic, "diagnostic reported");
        if diagnostic.severity == Severity::Error {
            self.errors += 1;
        }
        self.sink.report(diagnostic);
    }

    pub(crate) const fn error_count(&self) -> usize {
        self.errors
    }
}

impl std::fmt::Debug for Reporter<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter").field("errors", &self.errors).finish_non_exhaustive()
    }
}
