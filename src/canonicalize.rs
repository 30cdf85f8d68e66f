// Copyright 2023 The urlcanon developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Whole-URL canonicalization: scheme-category dispatch, per-category
//! composition of the piece canonicalizers, and component replacement.

use std::borrow::Cow;

use crate::canon::{
    canonicalize_fragment, canonicalize_opaque_path, canonicalize_partial_path, canonicalize_path,
    canonicalize_port, canonicalize_query, canonicalize_scheme, canonicalize_userinfo,
    CharsetConverter,
};
use crate::chars::{is_removable_whitespace, is_url_slash};
use crate::host::{canonicalize_host, HostFamily};
use crate::output::CanonOutput;
use crate::parsed::{Component, Parsed};
use crate::parser::{
    begins_windows_drive_spec, default_port, extract_scheme, parse_file_url, parse_filesystem_url,
    parse_mailto_url, parse_path_url, parse_standard_url, trim_url,
};
use crate::registry;
use crate::replace::{Override, Replacements};

/// The five grammars a scheme can follow.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SchemeCategory {
    /// Authority plus hierarchical path (`http:`, registered schemes).
    Standard,
    File,
    FileSystem,
    Mailto,
    /// Opaque: everything after the scheme is path text (`data:`, ...).
    Path,
}

/// Pick the grammar for a scheme name, consulting the process-wide
/// registry for the Standard set.
pub fn categorize_scheme(scheme: &str) -> SchemeCategory {
    if scheme.eq_ignore_ascii_case("file") {
        SchemeCategory::File
    } else if scheme.eq_ignore_ascii_case("filesystem") {
        SchemeCategory::FileSystem
    } else if scheme.eq_ignore_ascii_case("mailto") {
        SchemeCategory::Mailto
    } else if registry::is_standard(scheme) {
        SchemeCategory::Standard
    } else {
        SchemeCategory::Path
    }
}

/// One component's input text: its own source string plus the range within
/// it. Replacement lets every component come from a different string.
#[derive(Copy, Clone)]
pub(crate) struct PieceRef<'a> {
    pub s: &'a str,
    pub c: Component,
}

impl<'a> PieceRef<'a> {
    fn new(s: &'a str, c: Component) -> PieceRef<'a> {
        PieceRef { s, c }
    }

    fn none() -> PieceRef<'a> {
        PieceRef {
            s: "",
            c: Component::none(),
        }
    }

    fn whole(s: &'a str) -> PieceRef<'a> {
        PieceRef {
            s,
            c: Component::new(0, s.len()),
        }
    }
}

/// Per-piece inputs for one category canonicalization pass.
#[derive(Copy, Clone)]
pub(crate) struct CanonInput<'a> {
    pub scheme: PieceRef<'a>,
    pub username: PieceRef<'a>,
    pub password: PieceRef<'a>,
    pub host: PieceRef<'a>,
    pub port: PieceRef<'a>,
    pub path: PieceRef<'a>,
    pub query: PieceRef<'a>,
    pub fragment: PieceRef<'a>,
}

impl<'a> CanonInput<'a> {
    pub(crate) fn from_parsed(spec: &'a str, parsed: &Parsed) -> CanonInput<'a> {
        CanonInput {
            scheme: PieceRef::new(spec, parsed.scheme),
            username: PieceRef::new(spec, parsed.username),
            password: PieceRef::new(spec, parsed.password),
            host: PieceRef::new(spec, parsed.host),
            port: PieceRef::new(spec, parsed.port),
            path: PieceRef::new(spec, parsed.path),
            query: PieceRef::new(spec, parsed.query),
            fragment: PieceRef::new(spec, parsed.fragment),
        }
    }

    fn with_overrides(spec: &'a str, parsed: &Parsed, repl: &Replacements<'a>) -> CanonInput<'a> {
        let pick = |over: Override<'a>, base: Component| match over {
            Override::Keep => PieceRef::new(spec, base),
            Override::Set(s) => PieceRef::whole(s),
            Override::Clear => PieceRef::none(),
        };
        CanonInput {
            scheme: PieceRef::new(spec, parsed.scheme),
            username: pick(repl.username, parsed.username),
            password: pick(repl.password, parsed.password),
            host: pick(repl.host, parsed.host),
            port: pick(repl.port, parsed.port),
            path: pick(repl.path, parsed.path),
            query: pick(repl.query, parsed.query),
            fragment: pick(repl.fragment, parsed.fragment),
        }
    }
}

fn canonical_scheme_text<'a>(out: &'a CanonOutput, scheme: Component) -> &'a str {
    // The scheme canonicalizer only emits ASCII.
    std::str::from_utf8(&out.as_bytes()[scheme.range()]).unwrap_or("")
}

/// Canonicalize a standard (authority + path) URL.
///
/// Structural requirements: an authority is always written, and the host
/// must be present, non-empty, and usable.
pub(crate) fn canonicalize_standard(
    input: &CanonInput<'_>,
    converter: Option<&dyn CharsetConverter>,
    out: &mut CanonOutput,
) -> (Parsed, bool) {
    let mut parsed = Parsed::new();
    let mut success;

    let (scheme, ok) = canonicalize_scheme(input.scheme.s, input.scheme.c, out);
    parsed.scheme = scheme;
    success = ok;

    out.push_str("//");
    let (username, password, ok) = canonicalize_userinfo(
        input.username.s,
        input.username.c,
        input.password.s,
        input.password.c,
        out,
    );
    parsed.username = username;
    parsed.password = password;
    success &= ok;

    let host_info = canonicalize_host(input.host.s, input.host.c, out);
    parsed.host = host_info.out_host;
    if host_info.family == HostFamily::Broken || !parsed.host.is_nonempty() {
        success = false;
    }

    let default = default_port(canonical_scheme_text(out, parsed.scheme));
    let (port, ok) = canonicalize_port(input.port.s, input.port.c, default, out);
    parsed.port = port;
    success &= ok;

    if input.path.c.is_valid() {
        let (path, ok) = canonicalize_path(input.path.s, input.path.c, out);
        parsed.path = path;
        success &= ok;
    } else {
        parsed.path = Component::new(out.len(), 1);
        out.push(b'/');
    }

    parsed.query = canonicalize_query(input.query.s, input.query.c, converter, out);
    parsed.fragment = canonicalize_fragment(input.fragment.s, input.fragment.c, out);
    (parsed, success)
}

/// Canonicalize a `file:` URL: authority always written, drive letters
/// normalized to `/X:`, userinfo and port never emitted.
pub(crate) fn canonicalize_file(
    input: &CanonInput<'_>,
    converter: Option<&dyn CharsetConverter>,
    out: &mut CanonOutput,
) -> (Parsed, bool) {
    let mut parsed = Parsed::new();
    let mut success;

    let (scheme, ok) = canonicalize_scheme(input.scheme.s, input.scheme.c, out);
    parsed.scheme = scheme;
    success = ok;

    out.push_str("//");
    let host_info = canonicalize_host(input.host.s, input.host.c, out);
    parsed.host = host_info.out_host;
    if host_info.family == HostFamily::Broken {
        success = false;
    }

    let (path, ok) = canonicalize_file_path(input.path.s, input.path.c, out);
    parsed.path = path;
    success &= ok;

    parsed.query = canonicalize_query(input.query.s, input.query.c, converter, out);
    parsed.fragment = canonicalize_fragment(input.fragment.s, input.fragment.c, out);
    (parsed, success)
}

/// File paths get drive-letter handling on top of the ordinary rules:
/// `c|` and `c:` become `/C:`, and `..` never climbs above the drive.
fn canonicalize_file_path(spec: &str, path: Component, out: &mut CanonOutput) -> (Component, bool) {
    if !path.is_valid() {
        let begin = out.len();
        out.push(b'/');
        return (Component::new(begin, 1), true);
    }

    let bytes = spec.as_bytes();
    let range = path.range();
    let mut i = range.start;
    while i < range.end && is_url_slash(bytes[i]) {
        i += 1;
    }
    if !(begins_windows_drive_spec(bytes, i) && i + 1 < range.end) {
        return canonicalize_path(spec, path, out);
    }

    let begin = out.len();
    out.push(b'/');
    out.push(bytes[i].to_ascii_uppercase());
    out.push(b':');
    let after_drive = i + 2;
    let mut success = true;
    if after_drive < range.end {
        let path_root = out.len();
        if !is_url_slash(bytes[after_drive]) {
            out.push(b'/');
        }
        success = canonicalize_partial_path(
            spec,
            Component::new(after_drive, range.end - after_drive),
            path_root,
            out,
        );
    }
    (Component::new(begin, out.len() - begin), success)
}

/// Canonicalize a `filesystem:` URL: the inner URL re-canonicalized under
/// its own category, then the outer path/query/fragment. Validity requires
/// a `file:` or standard inner URL carrying a type directory.
pub(crate) fn canonicalize_filesystem(
    spec: &str,
    parsed: &Parsed,
    converter: Option<&dyn CharsetConverter>,
    out: &mut CanonOutput,
) -> (Parsed, bool) {
    let mut new_parsed = Parsed::new();
    let mut success;

    let (scheme, ok) = canonicalize_scheme(spec, parsed.scheme, out);
    new_parsed.scheme = scheme;
    success = ok;

    match parsed.inner.as_deref() {
        Some(inner) => {
            let inner_input = CanonInput::from_parsed(spec, inner);
            let inner_scheme_text = inner.scheme.slice(spec);
            let (inner_parsed, ok) = match categorize_scheme(inner_scheme_text) {
                SchemeCategory::File => canonicalize_file(&inner_input, converter, out),
                SchemeCategory::Standard => canonicalize_standard(&inner_input, converter, out),
                _ => {
                    // The embedded URL must be file or standard.
                    let (p, _) = canonicalize_standard(&inner_input, converter, out);
                    (p, false)
                }
            };
            success &= ok;
            // A filesystem URL without a type directory is unusable.
            if !inner.path.is_nonempty() {
                success = false;
            }
            new_parsed.inner = Some(Box::new(inner_parsed));
        }
        None => success = false,
    }

    if parsed.path.is_valid() {
        let (path, ok) = canonicalize_path(spec, parsed.path, out);
        new_parsed.path = path;
        success &= ok;
    }
    new_parsed.query = canonicalize_query(spec, parsed.query, converter, out);
    new_parsed.fragment = canonicalize_fragment(spec, parsed.fragment, out);
    (new_parsed, success)
}

/// Canonicalize a `mailto:` URL: recipients as an opaque path, optional
/// query; host, port and fragment are ignored entirely.
pub(crate) fn canonicalize_mailto(
    input: &CanonInput<'_>,
    out: &mut CanonOutput,
) -> (Parsed, bool) {
    let mut parsed = Parsed::new();
    let (scheme, mut success) = canonicalize_scheme(input.scheme.s, input.scheme.c, out);
    parsed.scheme = scheme;
    let (path, ok) = canonicalize_opaque_path(input.path.s, input.path.c, out);
    parsed.path = path;
    success &= ok;
    parsed.query = canonicalize_query(input.query.s, input.query.c, None, out);
    (parsed, success)
}

/// Canonicalize an opaque path URL (`javascript:`, `data:`, `about:`).
pub(crate) fn canonicalize_path_url(
    input: &CanonInput<'_>,
    out: &mut CanonOutput,
) -> (Parsed, bool) {
    let mut parsed = Parsed::new();
    let (scheme, mut success) = canonicalize_scheme(input.scheme.s, input.scheme.c, out);
    parsed.scheme = scheme;
    let (path, ok) = canonicalize_opaque_path(input.path.s, input.path.c, out);
    parsed.path = path;
    success &= ok;
    parsed.query = canonicalize_query(input.query.s, input.query.c, None, out);
    parsed.fragment = canonicalize_fragment(input.fragment.s, input.fragment.c, out);
    (parsed, success)
}

/// Tab, CR and LF are stripped from anywhere in the input, the way
/// browsers do before parsing.
pub(crate) fn remove_embedded_whitespace(input: &str) -> Cow<'_, str> {
    if input.bytes().any(is_removable_whitespace) {
        Cow::Owned(
            input
                .chars()
                .filter(|&c| !(c.is_ascii() && is_removable_whitespace(c as u8)))
                .collect(),
        )
    } else {
        Cow::Borrowed(input)
    }
}

/// Parse and canonicalize `input` from scratch.
///
/// Returns the canonical spec, its component index, and overall validity.
/// This never fails: invalid input produces its best-effort canonical form
/// with `false`.
pub fn canonicalize_url(
    input: &str,
    converter: Option<&dyn CharsetConverter>,
) -> (String, Parsed, bool) {
    let cleaned = remove_embedded_whitespace(input);
    let lead_trimmed = trim_url(&cleaned, false);
    if trim_url(lead_trimmed, true).is_empty() {
        return (String::new(), Parsed::new(), false);
    }

    let scheme_text = match extract_scheme(lead_trimmed) {
        Some(c) => c.slice(lead_trimmed),
        None => "",
    };
    // `data:` payloads may end in meaningful whitespace.
    let trim_end = !scheme_text.eq_ignore_ascii_case("data");
    let trimmed = trim_url(lead_trimmed, trim_end);

    let category = match extract_scheme(trimmed) {
        Some(scheme) => categorize_scheme(scheme.slice(trimmed)),
        None => SchemeCategory::Standard,
    };

    let mut out = CanonOutput::with_capacity(trimmed.len() + 8);
    let (parsed, valid) = match category {
        SchemeCategory::Standard => {
            let parsed = parse_standard_url(trimmed);
            canonicalize_standard(&CanonInput::from_parsed(trimmed, &parsed), converter, &mut out)
        }
        SchemeCategory::File => {
            let parsed = parse_file_url(trimmed);
            canonicalize_file(&CanonInput::from_parsed(trimmed, &parsed), converter, &mut out)
        }
        SchemeCategory::FileSystem => {
            let parsed = parse_filesystem_url(trimmed);
            canonicalize_filesystem(trimmed, &parsed, converter, &mut out)
        }
        SchemeCategory::Mailto => {
            let parsed = parse_mailto_url(trimmed);
            canonicalize_mailto(&CanonInput::from_parsed(trimmed, &parsed), &mut out)
        }
        SchemeCategory::Path => {
            let parsed = parse_path_url(trimmed);
            canonicalize_path_url(&CanonInput::from_parsed(trimmed, &parsed), &mut out)
        }
    };
    (out.finish(), parsed, valid)
}

/// Apply component overrides to a canonical URL.
///
/// A scheme override splices the new scheme onto the old text, re-parses
/// the whole thing under the new scheme's category, then applies the
/// remaining overrides to that result. Everything else dispatches straight
/// to the category canonicalizer with per-piece substitute sources.
pub fn replace_components(
    base_spec: &str,
    base_parsed: &Parsed,
    repl: &Replacements<'_>,
    converter: Option<&dyn CharsetConverter>,
) -> (String, Parsed, bool) {
    if let Some(new_scheme) = repl.scheme {
        let rest = if base_parsed.scheme.is_valid() {
            &base_spec[base_parsed.scheme.end() + 1..]
        } else {
            base_spec
        };
        let spliced = format!("{}:{}", new_scheme, rest);
        let (spec, parsed, valid) = canonicalize_url(&spliced, converter);
        let remaining = repl.without_scheme();
        if remaining.is_empty() {
            return (spec, parsed, valid);
        }
        let (spec2, parsed2, valid2) = replace_components(&spec, &parsed, &remaining, converter);
        return (spec2, parsed2, valid && valid2);
    }

    let scheme_text = base_parsed.scheme.slice(base_spec);
    let category = categorize_scheme(scheme_text);
    let mut out = CanonOutput::with_capacity(base_spec.len() + 8);
    let (parsed, valid) = match category {
        SchemeCategory::Standard => {
            let input = CanonInput::with_overrides(base_spec, base_parsed, repl);
            canonicalize_standard(&input, converter, &mut out)
        }
        SchemeCategory::File => {
            let input = CanonInput::with_overrides(base_spec, base_parsed, repl);
            canonicalize_file(&input, converter, &mut out)
        }
        SchemeCategory::FileSystem => {
            // The embedded URL is kept as-is; only the outer components
            // accept overrides. Splicing text and re-canonicalizing keeps
            // every offset in one string.
            let spliced = splice_filesystem(base_spec, base_parsed, repl);
            let (spec, parsed, mut valid) = canonicalize_url(&spliced, converter);
            if repl.host != Override::Keep
                || repl.port != Override::Keep
                || repl.username != Override::Keep
                || repl.password != Override::Keep
            {
                valid = false;
            }
            return (spec, parsed, valid);
        }
        SchemeCategory::Mailto => {
            let input = CanonInput::with_overrides(base_spec, base_parsed, repl);
            canonicalize_mailto(&input, &mut out)
        }
        SchemeCategory::Path => {
            let input = CanonInput::with_overrides(base_spec, base_parsed, repl);
            canonicalize_path_url(&input, &mut out)
        }
    };
    (out.finish(), parsed, valid)
}

/// Rebuild a filesystem URL's raw text with outer path/query/fragment
/// overrides substituted, ready for a fresh canonicalization pass.
fn splice_filesystem(base_spec: &str, base_parsed: &Parsed, repl: &Replacements<'_>) -> String {
    let mut text = String::with_capacity(base_spec.len());
    text.push_str(base_parsed.scheme.slice(base_spec));
    text.push(':');
    if let Some(inner) = base_parsed.inner.as_deref() {
        let inner_end = inner.length();
        text.push_str(&base_spec[inner.scheme.begin..inner_end]);
    }
    match repl.path {
        Override::Keep => text.push_str(base_parsed.path.slice(base_spec)),
        Override::Set(path) => {
            if !path.starts_with('/') {
                text.push('/');
            }
            text.push_str(path);
        }
        Override::Clear => {}
    }
    match repl.query {
        Override::Keep => {
            if base_parsed.query.is_valid() {
                text.push('?');
                text.push_str(base_parsed.query.slice(base_spec));
            }
        }
        Override::Set(query) => {
            text.push('?');
            text.push_str(query);
        }
        Override::Clear => {}
    }
    match repl.fragment {
        Override::Keep => {
            if base_parsed.fragment.is_valid() {
                text.push('#');
                text.push_str(base_parsed.fragment.slice(base_spec));
            }
        }
        Override::Set(fragment) => {
            text.push('#');
            text.push_str(fragment);
        }
        Override::Clear => {}
    }
    text
}
