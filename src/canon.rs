// Copyright 2023 The urlcanon developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-component canonicalizers.
//!
//! Every function appends to the shared output buffer and reports where the
//! canonical component landed plus whether the input was well-formed. None
//! of them ever refuses to produce output: bad input yields an escaped,
//! recognizable rendition and a `false` flag.

use std::fmt::Write;

use crate::chars::{
    append_escaped, decode_escaped, escaped_path_byte_class, fragment_byte_needs_escape,
    is_ascii_alpha, is_scheme_char, is_url_slash, is_userinfo_char, path_byte_class,
    query_byte_needs_escape, PathByte,
};
use crate::output::CanonOutput;
use crate::parsed::Component;

/// Converter for query text in documents whose charset is not UTF-8.
///
/// Only non-ASCII query strings are handed to it; when no converter is
/// supplied the query is encoded as UTF-8. This is the seam to a real
/// transcoding library; the crate ships none.
pub trait CharsetConverter {
    /// Convert `input` to the target charset, appending to `out`.
    fn convert(&self, input: &str, out: &mut Vec<u8>);
}

/// Lowercase the scheme and append `scheme:`.
///
/// Letters, digits, `+`, `-` and `.` are the only bytes a scheme may hold;
/// anything else is escaped and flagged. The returned component excludes
/// the colon.
pub fn canonicalize_scheme(spec: &str, scheme: Component, out: &mut CanonOutput) -> (Component, bool) {
    let begin = out.len();
    let text = scheme.slice(spec);
    if text.is_empty() {
        // Error: a URL without a scheme. Still emit the colon so the rest
        // of the output has its usual shape.
        out.push(b':');
        return (Component::new(begin, 0), false);
    }

    let mut success = true;
    for (i, byte) in text.bytes().enumerate() {
        if i == 0 && !is_ascii_alpha(byte) {
            success = false;
        }
        if is_scheme_char(byte) {
            out.push(byte.to_ascii_lowercase());
        } else {
            append_escaped(byte, out);
            success = false;
        }
    }
    let comp = Component::new(begin, out.len() - begin);
    out.push(b':');
    (comp, success)
}

/// Append `username[:password]@` when there is anything to say.
///
/// An empty username with an empty or absent password vanishes entirely; a
/// present-but-empty password keeps just `name@`. The two components carry
/// their own source strings because replacement can substitute either one
/// independently.
pub fn canonicalize_userinfo(
    username_spec: &str,
    username: Component,
    password_spec: &str,
    password: Component,
    out: &mut CanonOutput,
) -> (Component, Component, bool) {
    if username.is_empty_or_none() && password.is_empty_or_none() {
        return (Component::none(), Component::none(), true);
    }

    let user_begin = out.len();
    append_userinfo_text(username.slice(username_spec), out);
    let out_username = Component::new(user_begin, out.len() - user_begin);

    let out_password = if password.is_nonempty() {
        out.push(b':');
        let pass_begin = out.len();
        append_userinfo_text(password.slice(password_spec), out);
        Component::new(pass_begin, out.len() - pass_begin)
    } else {
        Component::none()
    };

    out.push(b'@');
    (out_username, out_password, true)
}

fn append_userinfo_text(text: &str, out: &mut CanonOutput) {
    for byte in text.bytes() {
        if is_userinfo_char(byte) {
            out.push(byte);
        } else {
            append_escaped(byte, out);
        }
    }
}

/// Append `:port` unless the port is absent, empty, or the scheme default.
///
/// A port that is not a small decimal number is an error; its literal text
/// is still copied so the failure is visible in the output.
pub fn canonicalize_port(
    spec: &str,
    port: Component,
    default_port: Option<u16>,
    out: &mut CanonOutput,
) -> (Component, bool) {
    if port.is_empty_or_none() {
        return (Component::none(), true);
    }
    let text = port.slice(spec);
    match parse_port_number(text) {
        Some(value) if Some(value) == default_port => (Component::none(), true),
        Some(value) => {
            out.push(b':');
            let begin = out.len();
            write!(out, "{}", value).expect("writing to CanonOutput cannot fail");
            (Component::new(begin, out.len() - begin), true)
        }
        None => {
            out.push(b':');
            let begin = out.len();
            out.push_str(text);
            (Component::new(begin, out.len() - begin), false)
        }
    }
}

/// Decimal port text to a number; leading zeros are skipped, anything else
/// non-decimal or above 65535 is rejected.
pub fn parse_port_number(text: &str) -> Option<u16> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = text.trim_start_matches('0');
    if digits.is_empty() {
        return Some(0);
    }
    if digits.len() > 5 {
        return None;
    }
    let value: u32 = digits.parse().ok()?;
    if value > u16::max_value() as u32 {
        None
    } else {
        Some(value as u16)
    }
}

/// Canonicalize a hierarchical path: guaranteed leading `/`, backslashes
/// normalized, `.`/`..` segments resolved, escapes validated byte by byte.
pub fn canonicalize_path(spec: &str, path: Component, out: &mut CanonOutput) -> (Component, bool) {
    if !path.is_valid() {
        return (Component::none(), true);
    }
    let begin = out.len();
    let range = path.range();
    let bytes = spec.as_bytes();

    out.push(b'/');
    let start = if range.len() > 0 && is_url_slash(bytes[range.start]) {
        range.start + 1
    } else {
        range.start
    };
    let success = append_path(bytes, start, range.end, begin, out);
    (Component::new(begin, out.len() - begin), success)
}

/// Continue canonicalizing path text into an output that already ends with
/// a slash at or after `path_root` (used when merging relative references:
/// `..` may consume base segments but never climbs above the path root).
pub fn canonicalize_partial_path(
    spec: &str,
    path: Component,
    path_root: usize,
    out: &mut CanonOutput,
) -> bool {
    let range = path.range();
    append_path(spec.as_bytes(), range.start, range.end, path_root, out)
}

/// How many input bytes spell a dot at `i`: 1 for `.`, 3 for `%2e`.
fn dot_length(spec: &[u8], i: usize, end: usize) -> Option<usize> {
    if i >= end {
        return None;
    }
    if spec[i] == b'.' {
        return Some(1);
    }
    if spec[i] == b'%' && i + 2 < end && spec[i + 1] == b'2' && (spec[i + 2] | 0x20) == b'e' {
        return Some(3);
    }
    None
}

/// Remove the segment ending at the output's trailing slash, stopping at
/// the path root so excess `..` cannot escape the path.
fn back_up_to_previous_slash(path_root: usize, out: &mut CanonOutput) {
    let mut pos = out.len();
    debug_assert!(pos > path_root);
    pos -= 1; // the trailing slash
    while pos > path_root && out.byte_at(pos - 1) != b'/' {
        pos -= 1;
    }
    out.truncate(pos.max(path_root + 1));
}

fn append_path(spec: &[u8], mut i: usize, end: usize, path_root: usize, out: &mut CanonOutput) -> bool {
    let mut success = true;
    while i < end {
        let at_segment_start = out.len() > path_root && out.byte_at(out.len() - 1) == b'/';
        if at_segment_start {
            if let Some(dotlen) = dot_length(spec, i, end) {
                let after_first = i + dotlen;
                if after_first == end || is_url_slash(spec[after_first]) {
                    // "." segment: already covered by the slash in output.
                    i = if after_first == end { after_first } else { after_first + 1 };
                    continue;
                }
                if let Some(dotlen2) = dot_length(spec, after_first, end) {
                    let after_second = after_first + dotlen2;
                    if after_second == end || is_url_slash(spec[after_second]) {
                        back_up_to_previous_slash(path_root, out);
                        i = if after_second == end { after_second } else { after_second + 1 };
                        continue;
                    }
                }
            }
        }

        let byte = spec[i];
        if is_url_slash(byte) {
            out.push(b'/');
            i += 1;
        } else if byte == b'%' {
            match decode_escaped(spec, i) {
                Some((value, next)) => {
                    match escaped_path_byte_class(value) {
                        PathByte::Unescape => out.push(value),
                        PathByte::Invalid => {
                            append_escaped(value, out);
                            success = false;
                        }
                        _ => append_escaped(value, out),
                    }
                    i = next;
                }
                None => {
                    // Stray '%': copied through like IE does, but reported.
                    out.push(b'%');
                    success = false;
                    i += 1;
                }
            }
        } else {
            match path_byte_class(byte) {
                PathByte::Pass => out.push(byte),
                PathByte::Escape => append_escaped(byte, out),
                _ => {
                    append_escaped(byte, out);
                    success = false;
                }
            }
            i += 1;
        }
    }
    success
}

/// Canonicalize an opaque path (`mailto:` recipients, `javascript:` text):
/// printable ASCII passes, controls and non-ASCII are escaped, escape
/// sequences are kept verbatim.
pub fn canonicalize_opaque_path(
    spec: &str,
    path: Component,
    out: &mut CanonOutput,
) -> (Component, bool) {
    if !path.is_valid() {
        return (Component::none(), true);
    }
    let begin = out.len();
    for byte in path.slice(spec).bytes() {
        if (0x20..0x7F).contains(&byte) {
            out.push(byte);
        } else {
            append_escaped(byte, out);
        }
    }
    (Component::new(begin, out.len() - begin), true)
}

/// Append `?query`. ASCII input is copied with a fixed escape set;
/// non-ASCII input goes through the charset converter (UTF-8 when absent)
/// and is then escaped.
pub fn canonicalize_query(
    spec: &str,
    query: Component,
    converter: Option<&dyn CharsetConverter>,
    out: &mut CanonOutput,
) -> Component {
    if !query.is_valid() {
        return Component::none();
    }
    out.push(b'?');
    let begin = out.len();
    let text = query.slice(spec);
    if text.is_ascii() {
        append_query_bytes(text.as_bytes(), out);
    } else {
        match converter {
            Some(converter) => {
                let mut converted = Vec::with_capacity(text.len());
                converter.convert(text, &mut converted);
                append_query_bytes(&converted, out);
            }
            None => append_query_bytes(text.as_bytes(), out),
        }
    }
    Component::new(begin, out.len() - begin)
}

fn append_query_bytes(bytes: &[u8], out: &mut CanonOutput) {
    for &byte in bytes {
        if query_byte_needs_escape(byte) {
            append_escaped(byte, out);
        } else {
            out.push(byte);
        }
    }
}

/// Append `#fragment`. The canonical fragment is UTF-8, not ASCII:
/// printable non-ASCII passes straight through; only controls are escaped.
pub fn canonicalize_fragment(spec: &str, fragment: Component, out: &mut CanonOutput) -> Component {
    if !fragment.is_valid() {
        return Component::none();
    }
    out.push(b'#');
    let begin = out.len();
    for byte in fragment.slice(spec).bytes() {
        if fragment_byte_needs_escape(byte) {
            append_escaped(byte, out);
        } else {
            out.push(byte);
        }
    }
    Component::new(begin, out.len() - begin)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whole(s: &str) -> Component {
        Component::new(0, s.len())
    }

    fn path_canon(input: &str) -> (String, bool) {
        let mut out = CanonOutput::new();
        let (_, ok) = canonicalize_path(input, whole(input), &mut out);
        (out.finish(), ok)
    }

    #[test]
    fn scheme_lowercases_and_flags() {
        let mut out = CanonOutput::new();
        let (comp, ok) = canonicalize_scheme("HtTp", whole("HtTp"), &mut out);
        assert!(ok);
        assert_eq!(out.finish(), "http:");
        assert_eq!(comp.len, 4);

        let mut out = CanonOutput::new();
        let (_, ok) = canonicalize_scheme("ht~p", whole("ht~p"), &mut out);
        assert!(!ok);
        assert_eq!(out.finish(), "ht%7Ep:");
    }

    #[test]
    fn userinfo_omission() {
        let mut out = CanonOutput::new();
        let (u, p, ok) =
            canonicalize_userinfo("", Component::none(), "", Component::none(), &mut out);
        assert!(ok && !u.is_valid() && !p.is_valid());
        assert_eq!(out.finish(), "");

        // Empty password keeps just `name@`.
        let spec = "user:";
        let mut out = CanonOutput::new();
        let (_, p, _) = canonicalize_userinfo(
            spec,
            Component::new(0, 4),
            spec,
            Component::new(5, 0),
            &mut out,
        );
        assert!(!p.is_valid());
        assert_eq!(out.finish(), "user@");
    }

    #[test]
    fn userinfo_escaping() {
        let spec = "a b:p@ss";
        let mut out = CanonOutput::new();
        canonicalize_userinfo(
            spec,
            Component::new(0, 3),
            spec,
            Component::new(4, 4),
            &mut out,
        );
        assert_eq!(out.finish(), "a%20b:p%40ss@");
    }

    #[test]
    fn port_rules() {
        let run = |text: &str, default| {
            let mut out = CanonOutput::new();
            let (_, ok) = canonicalize_port(text, whole(text), default, &mut out);
            (out.finish(), ok)
        };
        assert_eq!(run("80", Some(80)), ("".to_string(), true));
        assert_eq!(run("81", Some(80)), (":81".to_string(), true));
        assert_eq!(run("0081", Some(80)), (":81".to_string(), true));
        assert_eq!(run("65536", None), (":65536".to_string(), false));
        assert_eq!(run("8o8o", None), (":8o8o".to_string(), false));
    }

    #[test]
    fn path_dot_segments() {
        assert_eq!(path_canon("/foo/bar/../ton/../../a"), ("/a".to_string(), true));
        assert_eq!(path_canon("/../../.."), ("/".to_string(), true));
        assert_eq!(path_canon("/a/./b/."), ("/a/b/".to_string(), true));
        assert_eq!(path_canon("/a/%2e%2E/b"), ("/b".to_string(), true));
        assert_eq!(path_canon("/a/.."), ("/".to_string(), true));
    }

    #[test]
    fn path_backslashes_and_leading_slash() {
        assert_eq!(path_canon("\\a\\b"), ("/a/b".to_string(), true));
        assert_eq!(path_canon("no-slash"), ("/no-slash".to_string(), true));
        assert_eq!(path_canon("//keep//doubles"), ("//keep//doubles".to_string(), true));
    }

    #[test]
    fn path_escapes() {
        // Escapes of unreserved bytes are decoded, others normalized.
        assert_eq!(path_canon("/%41%3f"), ("/A%3F".to_string(), true));
        assert_eq!(path_canon("/a b"), ("/a%20b".to_string(), true));
        let (text, ok) = path_canon("/a%zz");
        assert_eq!(text, "/a%zz");
        assert!(!ok);
        let (text, ok) = path_canon("/%00");
        assert_eq!(text, "/%00");
        assert!(!ok);
    }

    #[test]
    fn path_utf8_escaped() {
        assert_eq!(path_canon("/r\u{e9}sum\u{e9}"), ("/r%C3%A9sum%C3%A9".to_string(), true));
    }

    #[test]
    fn query_escape_set() {
        let spec = "a b<c>\"#d";
        let mut out = CanonOutput::new();
        canonicalize_query(spec, whole(spec), None, &mut out);
        assert_eq!(out.finish(), "?a%20b%3Cc%3E%22%23d");
    }

    #[test]
    fn query_utf8_default() {
        let spec = "q=\u{e9}";
        let mut out = CanonOutput::new();
        canonicalize_query(spec, whole(spec), None, &mut out);
        assert_eq!(out.finish(), "?q=%C3%A9");
    }

    #[test]
    fn query_converter_is_consulted() {
        struct Latin1Question;
        impl CharsetConverter for Latin1Question {
            fn convert(&self, input: &str, out: &mut Vec<u8>) {
                for ch in input.chars() {
                    out.push(if (ch as u32) < 0x100 { ch as u8 } else { b'?' });
                }
            }
        }
        let spec = "q=\u{e9}";
        let mut out = CanonOutput::new();
        canonicalize_query(spec, whole(spec), Some(&Latin1Question), &mut out);
        assert_eq!(out.finish(), "?q=%E9");
    }

    #[test]
    fn fragment_keeps_utf8() {
        let spec = "caf\u{e9}\x01";
        let mut out = CanonOutput::new();
        canonicalize_fragment(spec, whole(spec), &mut out);
        assert_eq!(out.finish(), "#caf\u{e9}%01");
    }

    #[test]
    fn opaque_path_passthrough() {
        let spec = "alert('x');\u{7}";
        let mut out = CanonOutput::new();
        let (_, ok) = canonicalize_opaque_path(spec, whole(spec), &mut out);
        assert!(ok);
        assert_eq!(out.finish(), "alert('x');%07");
    }
}
