// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashSet;

use proc_macro2::{Ident, Span};

use crate::key::Key;
use crate::types::TypeRef;

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "crate", "do", "dyn", "else", "enum", "extern", "false",
    "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override",
    "priv", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "try", "type", "typeof",
    "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Converts `UpperCamelCase` or mixed names to `snake_case`.
pub(crate) fn snake_case(name: &str) -> String {
    let mut snake = String::with_capacity(name.len() + 4);
    let mut previous_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if previous_lower && !snake.ends_with('_') {
                snake.push('_');
            }
            snake.push(c.to_ascii_lowercase());
            previous_lower = false;
        } else if c.is_ascii_alphanumeric() {
            snake.push(c);
            previous_lower = true;
        } else if !snake.is_empty() && !snake.ends_with('_') {
            snake.push('_');
            previous_lower = false;
        }
    }
    let snake = snake.trim_end_matches('_').to_string();
    if snake.is_empty() {
        return "value".to_string();
    }
    if snake.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("_{snake}");
    }
    if KEYWORDS.contains(&snake.as_str()) {
        return format!("{snake}_");
    }
    snake
}

/// A readable base name for members that hold or produce a key's value.
///
/// `thicket::Set<crate::Plugin>` becomes `set_of_plugin`; a qualifier value is appended, so
/// `#[Named("admin")] crate::Client` becomes `client_admin`.
pub(crate) fn key_base_name(key: &Key) -> String {
    let mut name = type_base_name(key.ty());
    if let Some(value) = key.qualifier().and_then(|qualifier| qualifier.value.as_deref()) {
        name.push('_');
        name.push_str(value);
    }
    snake_case(&name)
}

fn type_base_name(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Declared(declared) => {
            let simple = declared.name.simple_name();
            if declared.args.is_empty() {
                simple.to_string()
            } else {
                let args: Vec<String> = declared.args.iter().map(type_base_name).collect();
                format!("{simple}_of_{}", args.join("_and_"))
            }
        }
        TypeRef::Primitive(primitive) => primitive.name().to_string(),
        TypeRef::Variable(name) => name.to_string(),
        TypeRef::Wildcard => "any".to_string(),
        TypeRef::Unavailable(name) => name.simple_name().to_string(),
    }
}

/// Hands out names that are unique within one generated type.
#[derive(Debug, Default)]
pub(crate) struct UniqueNameSet {
    taken: HashSet<String>,
}

impl UniqueNameSet {
    /// Reserves a name without renaming it.
    pub(crate) fn claim(&mut self, name: &str) {
        self.taken.insert(name.to_string());
    }

    /// Returns `base`, or `base` followed by the first free number starting at 2.
    pub(crate) fn unique(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        (2..)
            .map(|suffix| format!("{base}{suffix}"))
            .find(|candidate| self.taken.insert(candidate.clone()))
            .unwrap_or_else(|| unreachable!("internal error: unbounded suffixes are exhausted"))
    }

    pub(crate) fn unique_ident(&mut self, base: &str) -> Ident {
        Ident::new(&self.unique(base), Span::call_site())
    }
}

pub(crate) fn ident(name: &str) -> Ident {
    Ident::new(name, Span::call_site())
}
