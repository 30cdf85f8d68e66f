// Copyright 2023 The urlcanon developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Resolving reference strings against a canonical base URL.

use crate::canon::{
    canonicalize_fragment, canonicalize_partial_path, canonicalize_query, CharsetConverter,
};
use crate::canonicalize::{canonicalize_url, categorize_scheme, SchemeCategory};
use crate::chars::is_url_slash;
use crate::output::CanonOutput;
use crate::parsed::{Component, Parsed};
use crate::parser::{
    begins_unc_path, begins_windows_drive_spec, extract_scheme, is_valid_scheme,
    parse_path_internal, trim_url,
};

/// How a reference string relates to a hierarchical base.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Relativity {
    /// The reference stands on its own (different scheme, or same scheme
    /// with its own authority); canonicalize it alone.
    Absolute,
    /// The reference is relative; the component is the portion of the
    /// reference text to merge with the base.
    Relative(Component),
    /// The base cannot host relative references.
    Unresolvable,
}

fn is_hierarchical(category: SchemeCategory) -> bool {
    matches!(
        category,
        SchemeCategory::Standard | SchemeCategory::File | SchemeCategory::FileSystem
    )
}

/// Classify `reference` against a base of scheme `base_scheme`.
///
/// Empty references are relative (they only clear the fragment). A
/// reference with its own valid scheme is absolute when the scheme differs
/// or is followed by an authority; with the same scheme and at most one
/// slash, the part after the colon resolves relative to the base, which is
/// what browsers do.
pub fn classify_relative(base_scheme: &str, reference: &str) -> Relativity {
    let base_hierarchical = is_hierarchical(categorize_scheme(base_scheme));
    if reference.is_empty() {
        return if base_hierarchical {
            Relativity::Relative(Component::new(0, 0))
        } else {
            Relativity::Unresolvable
        };
    }

    if let Some(scheme) = extract_scheme(reference) {
        if is_valid_scheme(scheme.slice(reference)) {
            if !scheme.slice(reference).eq_ignore_ascii_case(base_scheme) {
                return Relativity::Absolute;
            }
            let after = scheme.end() + 1;
            let bytes = reference.as_bytes();
            let slashes = bytes[after..].iter().take_while(|&&b| is_url_slash(b)).count();
            if slashes >= 2 {
                return Relativity::Absolute;
            }
            return if base_hierarchical {
                Relativity::Relative(Component::new(after, reference.len() - after))
            } else {
                Relativity::Absolute
            };
        }
    }

    if base_hierarchical {
        Relativity::Relative(Component::new(0, reference.len()))
    } else {
        Relativity::Unresolvable
    }
}

/// Where the base's path text starts and ends; for a `filesystem:` base
/// with no outer path this is the insertion point after the inner URL.
fn base_path_bounds(base_parsed: &Parsed) -> (usize, usize) {
    if base_parsed.path.is_valid() {
        (base_parsed.path.begin, base_parsed.path.end())
    } else if let Some(inner) = base_parsed.inner.as_deref() {
        (inner.length(), inner.length())
    } else {
        let end = [
            base_parsed.scheme,
            base_parsed.username,
            base_parsed.password,
            base_parsed.host,
            base_parsed.port,
        ]
        .iter()
        .filter(|c| c.is_valid())
        .map(|c| c.end())
        .max()
        .unwrap_or(0);
        (end, end)
    }
}

/// Resolve `reference` against a canonical base.
///
/// `base_valid` propagates into the result wherever base components are
/// reused. The output is always fully canonical.
pub fn resolve_relative(
    base_spec: &str,
    base_parsed: &Parsed,
    base_valid: bool,
    reference: &str,
    converter: Option<&dyn CharsetConverter>,
) -> (String, Parsed, bool) {
    let cleaned = crate::canonicalize::remove_embedded_whitespace(reference);
    let reference = trim_url(&cleaned, true);
    let base_scheme = base_parsed.scheme.slice(base_spec);

    // Drive letters and UNC paths are absolute file paths, not relative
    // references, when the context is a file URL.
    if categorize_scheme(base_scheme) == SchemeCategory::File {
        let bytes = reference.as_bytes();
        if begins_windows_drive_spec(bytes, 0) || begins_unc_path(bytes) {
            return canonicalize_url(&format!("file:{}", reference), converter);
        }
    }

    match classify_relative(base_scheme, reference) {
        Relativity::Absolute => canonicalize_url(reference, converter),
        Relativity::Unresolvable => {
            let (spec, parsed, _) = canonicalize_url(reference, converter);
            (spec, parsed, false)
        }
        Relativity::Relative(rel) => {
            resolve_against_base(base_spec, base_parsed, base_valid, reference, rel, converter)
        }
    }
}

fn resolve_against_base(
    base_spec: &str,
    base_parsed: &Parsed,
    base_valid: bool,
    reference: &str,
    rel: Component,
    converter: Option<&dyn CharsetConverter>,
) -> (String, Parsed, bool) {
    let bytes = reference.as_bytes();
    let range = rel.range();

    if range.is_empty() {
        return copy_base_clearing_fragment(base_spec, base_parsed, base_valid);
    }

    match bytes[range.start] {
        b'#' => {
            // Fragment replacement: keep everything else.
            let keep_end = if base_parsed.fragment.is_valid() {
                base_parsed.fragment.begin - 1
            } else {
                base_spec.len()
            };
            let mut out = CanonOutput::with_capacity(base_spec.len() + range.len());
            out.push_str(&base_spec[..keep_end]);
            let mut parsed = base_parsed.clone();
            parsed.fragment = canonicalize_fragment(
                reference,
                Component::new(range.start + 1, range.end - range.start - 1),
                &mut out,
            );
            (out.finish(), parsed, base_valid)
        }
        b'?' => {
            // Query (and fragment) replacement: keep through the path.
            let (_, path_end) = base_path_bounds(base_parsed);
            let mut out = CanonOutput::with_capacity(base_spec.len() + range.len());
            out.push_str(&base_spec[..path_end]);
            let mut parsed = base_parsed.clone();
            let (_, query, fragment) = parse_path_internal(bytes, range.start, range.end);
            parsed.query = canonicalize_query(reference, query, converter, &mut out);
            parsed.fragment = canonicalize_fragment(reference, fragment, &mut out);
            (out.finish(), parsed, base_valid)
        }
        b if is_url_slash(b) => {
            let slashes = bytes[range.clone()]
                .iter()
                .take_while(|&&b| is_url_slash(b))
                .count();
            if slashes >= 2 {
                // Authority replacement: same scheme, new everything else.
                let spliced = format!(
                    "{}:{}",
                    base_parsed.scheme.slice(base_spec),
                    &reference[range]
                );
                canonicalize_url(&spliced, converter)
            } else {
                merge_paths(base_spec, base_parsed, base_valid, reference, rel, true, converter)
            }
        }
        _ => merge_paths(base_spec, base_parsed, base_valid, reference, rel, false, converter),
    }
}

fn copy_base_clearing_fragment(
    base_spec: &str,
    base_parsed: &Parsed,
    base_valid: bool,
) -> (String, Parsed, bool) {
    let keep_end = if base_parsed.fragment.is_valid() {
        base_parsed.fragment.begin - 1
    } else {
        base_spec.len()
    };
    let mut parsed = base_parsed.clone();
    parsed.fragment = Component::none();
    (base_spec[..keep_end].to_string(), parsed, base_valid)
}

/// Replace or merge the base path with the reference's path, then take the
/// reference's query and fragment.
fn merge_paths(
    base_spec: &str,
    base_parsed: &Parsed,
    base_valid: bool,
    reference: &str,
    rel: Component,
    replace_whole_path: bool,
    converter: Option<&dyn CharsetConverter>,
) -> (String, Parsed, bool) {
    let bytes = reference.as_bytes();
    let range = rel.range();
    let (ref_path, ref_query, ref_fragment) = parse_path_internal(bytes, range.start, range.end);

    let (path_begin, _) = base_path_bounds(base_parsed);
    let mut out = CanonOutput::with_capacity(base_spec.len() + range.len());
    out.push_str(&base_spec[..path_begin]);
    let mut success = base_valid;

    // Lay down the retained part of the base path, ending in a slash.
    if replace_whole_path || !base_parsed.path.is_valid() {
        out.push(b'/');
    } else {
        let base_path = base_parsed.path.slice(base_spec);
        match base_path.rfind('/') {
            Some(last_slash) => out.push_str(&base_path[..=last_slash]),
            None => out.push(b'/'),
        }
    }

    if ref_path.is_valid() {
        let start = if replace_whole_path {
            // Skip the reference's leading slash; the root is down already.
            ref_path.begin + 1
        } else {
            ref_path.begin
        };
        success &= canonicalize_partial_path(
            reference,
            Component::new(start, ref_path.end().saturating_sub(start)),
            path_begin,
            &mut out,
        );
    }

    let mut parsed = base_parsed.clone();
    parsed.path = Component::new(path_begin, out.len() - path_begin);
    parsed.query = canonicalize_query(reference, ref_query, converter, &mut out);
    parsed.fragment = canonicalize_fragment(reference, ref_fragment, &mut out);
    (out.finish(), parsed, success)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(base: &str, reference: &str) -> (String, bool) {
        let (spec, parsed, valid) = canonicalize_url(base, None);
        assert!(valid, "base {:?} must be valid", base);
        let (result, _, ok) = resolve_relative(&spec, &parsed, valid, reference, None);
        (result, ok)
    }

    #[test]
    fn classification() {
        assert_eq!(
            classify_relative("http", "https://other/"),
            Relativity::Absolute
        );
        assert_eq!(
            classify_relative("http", "http://other/"),
            Relativity::Absolute
        );
        assert_eq!(
            classify_relative("http", "http:foo"),
            Relativity::Relative(Component::new(5, 3))
        );
        assert_eq!(
            classify_relative("http", ""),
            Relativity::Relative(Component::new(0, 0))
        );
        assert_eq!(classify_relative("data", "x"), Relativity::Unresolvable);
        // A colon inside a path segment is not a scheme.
        assert_eq!(
            classify_relative("http", "a/b:c"),
            Relativity::Relative(Component::new(0, 5))
        );
    }

    #[test]
    fn dot_merging() {
        let (spec, ok) = resolve(
            "http://www.google.com/blah/bloo?c#d",
            "../../../hello/./world.html?a#b",
        );
        assert!(ok);
        assert_eq!(spec, "http://www.google.com/hello/world.html?a#b");
    }

    #[test]
    fn empty_reference_clears_fragment() {
        let (spec, ok) = resolve("http://host/dir/file?q#frag", "");
        assert!(ok);
        assert_eq!(spec, "http://host/dir/file?q");
    }

    #[test]
    fn fragment_only() {
        let (spec, _) = resolve("http://host/dir/file?q#old", "#new");
        assert_eq!(spec, "http://host/dir/file?q#new");
    }

    #[test]
    fn query_only() {
        let (spec, _) = resolve("http://host/dir/file?old#f", "?new");
        assert_eq!(spec, "http://host/dir/file?new");
    }

    #[test]
    fn absolute_path() {
        let (spec, _) = resolve("http://host/dir/file", "/top");
        assert_eq!(spec, "http://host/top");
    }

    #[test]
    fn host_relative() {
        let (spec, _) = resolve("http://host/dir/file", "//other/x");
        assert_eq!(spec, "http://other/x");
    }

    #[test]
    fn same_scheme_compat() {
        let (spec, _) = resolve("http://host/dir/file", "http:new");
        assert_eq!(spec, "http://host/dir/new");
        let (spec, _) = resolve("http://host/dir/file", "http://second/");
        assert_eq!(spec, "http://second/");
    }

    #[test]
    fn file_drive_references() {
        let (spec, _) = resolve("file:///C:/old/path", "D:\\new\\dir");
        assert_eq!(spec, "file:///D:/new/dir");
        let (spec, _) = resolve("file:///C:/old/path", "\\\\server\\share");
        assert_eq!(spec, "file://server/share");
    }

    #[test]
    fn unresolvable_base() {
        let (spec, parsed, valid) = canonicalize_url("data:text/plain,x", None);
        let (_, _, ok) = resolve_relative(&spec, &parsed, valid, "y", None);
        assert!(!ok);
    }
}
