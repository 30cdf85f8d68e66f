// Copyright 2023 The urlcanon developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The set of schemes that follow the authority-plus-path generic syntax.

use std::sync::{OnceLock, RwLock};

/// Schemes always treated as standard.
const BUILTIN_STANDARD_SCHEMES: &[&str] = &[
    "http",
    "https",
    "file",
    "ftp",
    "gopher",
    "ws",
    "wss",
    "filesystem",
];

/// An explicit registry of standard schemes.
///
/// Most callers use the process-wide instance through
/// [`add_standard_scheme`] / [`is_standard`]; embedders that want isolated
/// parsing contexts can hold their own value.
#[derive(Clone, Debug)]
pub struct SchemeRegistry {
    standard: Vec<String>,
    locked: bool,
}

impl SchemeRegistry {
    /// A registry seeded with the built-in standard schemes.
    pub fn new() -> SchemeRegistry {
        SchemeRegistry {
            standard: BUILTIN_STANDARD_SCHEMES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            locked: false,
        }
    }

    /// Register `scheme` as standard. Registering after [`lock`] is a
    /// programming error; it asserts in debug builds and is ignored in
    /// release builds.
    ///
    /// [`lock`]: SchemeRegistry::lock
    pub fn add(&mut self, scheme: &str) {
        debug_assert!(
            !self.locked,
            "tried to register scheme {:?} after the registry was locked",
            scheme
        );
        if self.locked {
            return;
        }
        let lower = scheme.to_ascii_lowercase();
        if !self.standard.iter().any(|s| *s == lower) {
            self.standard.push(lower);
        }
    }

    /// Forbid further registration. Call once at startup, before threads
    /// start parsing.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Whether `scheme` (any case) follows the standard syntax.
    pub fn is_standard(&self, scheme: &str) -> bool {
        self.standard
            .iter()
            .any(|s| s.eq_ignore_ascii_case(scheme))
    }
}

impl Default for SchemeRegistry {
    fn default() -> SchemeRegistry {
        SchemeRegistry::new()
    }
}

fn global() -> &'static RwLock<SchemeRegistry> {
    static REGISTRY: OnceLock<RwLock<SchemeRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(SchemeRegistry::new()))
}

/// Register a scheme as standard in the process-wide registry.
///
/// Must happen before any concurrent parsing and before
/// [`lock_standard_schemes`].
pub fn add_standard_scheme(scheme: &str) {
    let mut registry = global().write().expect("scheme registry poisoned");
    registry.add(scheme);
}

/// Lock the process-wide registry against further registration.
pub fn lock_standard_schemes() {
    let mut registry = global().write().expect("scheme registry poisoned");
    registry.lock();
}

/// Whether `scheme` is standard per the process-wide registry.
pub fn is_standard(scheme: &str) -> bool {
    let registry = global().read().expect("scheme registry poisoned");
    registry.is_standard(scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_standard() {
        let registry = SchemeRegistry::new();
        for scheme in BUILTIN_STANDARD_SCHEMES {
            assert!(registry.is_standard(scheme));
        }
        assert!(registry.is_standard("HTTP"));
        assert!(!registry.is_standard("javascript"));
        assert!(!registry.is_standard("mailto"));
    }

    #[test]
    fn registration_and_lock() {
        let mut registry = SchemeRegistry::new();
        registry.add("Custom");
        assert!(registry.is_standard("custom"));
        registry.lock();
        assert!(registry.is_locked());
    }
}
