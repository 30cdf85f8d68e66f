// Copyright 2023 The urlcanon developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Browser-compatible URL parsing and canonicalization.
//!
//! `urlcanon` turns arbitrary URL text into a byte-stable canonical spec
//! plus an index of its components, following the lenient grammar browsers
//! actually implement rather than strict RFC 3986: backslashes count as
//! slashes, IPv4 hosts may be spelled in octal or hex, drive letters make
//! file URLs, `filesystem:` URLs nest another URL, and malformed input
//! degrades instead of failing.
//!
//! Parsing never panics and never refuses to answer. Every [`Url`] carries
//! a canonical spec and a validity flag; invalid URLs keep their
//! best-effort canonical form so callers can show the user what went
//! wrong.
//!
//! ```
//! use urlcanon::Url;
//!
//! let url = Url::parse("HTTP://User@ExAmPle.com:80/a/../b?q#f");
//! assert!(url.is_valid());
//! assert_eq!(url.spec(), "http://User@example.com/b?q#f");
//! assert_eq!(url.host(), "example.com");
//! assert_eq!(url.effective_port(), Some(80));
//! ```
//!
//! Relative references resolve against a parsed base:
//!
//! ```
//! use urlcanon::Url;
//!
//! let base = Url::parse("http://www.google.com/blah/bloo?c#d");
//! let url = base.resolve("../../../hello/./world.html?a#b");
//! assert_eq!(url.spec(), "http://www.google.com/hello/world.html?a#b");
//! ```

use std::cmp::Ordering;
use std::error::Error;
use std::fmt;
use std::hash::{Hash, Hasher};

mod canon;
mod canonicalize;
mod chars;
mod host;
mod ip;
mod output;
mod parsed;
mod parser;
mod registry;
mod relative;
mod replace;

pub use crate::canon::CharsetConverter;
pub use crate::canonicalize::{canonicalize_url, categorize_scheme, SchemeCategory};
pub use crate::host::{CanonHostInfo, HostFamily};
pub use crate::parsed::{Component, Parsed};
pub use crate::parser::default_port;
pub use crate::registry::{
    add_standard_scheme, is_standard, lock_standard_schemes, SchemeRegistry,
};
pub use crate::relative::{classify_relative, resolve_relative, Relativity};
pub use crate::replace::{Override, Replacements};

use crate::canonicalize::replace_components as apply_replacements;
use crate::ip::{parse_ipv4, Ipv4Result};

/// A parsed and canonicalized URL.
///
/// Immutable value type: every operation that would change the URL
/// (resolution, replacement) returns a new one. The canonical spec is
/// byte-stable: re-parsing it yields the identical spec.
#[derive(Clone)]
pub struct Url {
    spec: String,
    parsed: Parsed,
    valid: bool,
    /// The embedded URL of a `filesystem:` spec, one level only.
    inner: Option<Box<Url>>,
}

impl Url {
    /// The invalid empty URL.
    pub fn empty() -> Url {
        Url {
            spec: String::new(),
            parsed: Parsed::new(),
            valid: false,
            inner: None,
        }
    }

    /// Parse and canonicalize `input`. Never fails; check [`is_valid`].
    ///
    /// [`is_valid`]: Url::is_valid
    pub fn parse(input: &str) -> Url {
        Url::options().parse(input)
    }

    /// Parse a raw byte sequence, interpreting it as UTF-8 with invalid
    /// sequences replaced.
    pub fn parse_bytes(input: &[u8]) -> Url {
        Url::parse(&String::from_utf8_lossy(input))
    }

    /// Parse UTF-16 text, with unpaired surrogates replaced. All internal
    /// processing is UTF-8; this is a conversion wrapper.
    pub fn parse_utf16(input: &[u16]) -> Url {
        Url::parse(&String::from_utf16_lossy(input))
    }

    /// Parse with options (a base URL to resolve against, a query charset
    /// converter).
    pub fn options<'a>() -> ParseOptions<'a> {
        ParseOptions {
            base: None,
            converter: None,
        }
    }

    /// Like [`Url::parse`], but maps invalid input to an error that still
    /// carries the degraded URL.
    pub fn try_parse(input: &str) -> Result<Url, InvalidUrl> {
        let url = Url::parse(input);
        if url.valid {
            Ok(url)
        } else {
            Err(InvalidUrl(url))
        }
    }

    fn from_canonical(spec: String, parsed: Parsed, valid: bool) -> Url {
        let inner = parsed.inner.as_deref().map(|inner_parsed| {
            let begin = inner_parsed.scheme.begin;
            let end = inner_parsed.length();
            let inner_spec = spec[begin..end].to_string();
            Box::new(Url {
                spec: inner_spec,
                parsed: inner_parsed.rebase(begin),
                valid,
                inner: None,
            })
        });
        Url {
            spec,
            parsed,
            valid,
            inner,
        }
    }

    /// Whether parsing and canonicalization fully succeeded.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether this is the empty URL.
    pub fn is_empty(&self) -> bool {
        self.spec.is_empty()
    }

    /// The canonical spec. Asking for the spec of an invalid URL is a
    /// caller bug: it asserts in debug builds and returns `""` in release
    /// builds. Use [`possibly_invalid_spec`] when the URL may be invalid.
    ///
    /// [`possibly_invalid_spec`]: Url::possibly_invalid_spec
    pub fn spec(&self) -> &str {
        debug_assert!(
            self.valid || self.spec.is_empty(),
            "requested the spec of an invalid URL; use possibly_invalid_spec()"
        );
        if self.valid {
            &self.spec
        } else {
            ""
        }
    }

    /// The canonical spec whether or not the URL is valid; invalid URLs
    /// keep their best-effort output for display.
    pub fn possibly_invalid_spec(&self) -> &str {
        &self.spec
    }

    /// The component index into [`possibly_invalid_spec`].
    ///
    /// [`possibly_invalid_spec`]: Url::possibly_invalid_spec
    pub fn parsed(&self) -> &Parsed {
        &self.parsed
    }

    fn component(&self, c: Component) -> &str {
        c.slice(&self.spec)
    }

    pub fn scheme(&self) -> &str {
        self.component(self.parsed.scheme)
    }

    pub fn username(&self) -> &str {
        self.component(self.parsed.username)
    }

    pub fn password(&self) -> &str {
        self.component(self.parsed.password)
    }

    /// The canonical host, brackets included for IPv6 literals.
    pub fn host(&self) -> &str {
        self.component(self.parsed.host)
    }

    /// The canonical host with IPv6 brackets removed.
    pub fn host_no_brackets(&self) -> &str {
        let host = self.host();
        host.strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host)
    }

    pub fn path(&self) -> &str {
        self.component(self.parsed.path)
    }

    pub fn query(&self) -> &str {
        self.component(self.parsed.query)
    }

    pub fn fragment(&self) -> &str {
        self.component(self.parsed.fragment)
    }

    pub fn has_scheme(&self) -> bool {
        self.parsed.scheme.is_nonempty()
    }

    pub fn has_username(&self) -> bool {
        self.parsed.username.is_valid()
    }

    pub fn has_password(&self) -> bool {
        self.parsed.password.is_valid()
    }

    pub fn has_host(&self) -> bool {
        self.parsed.host.is_nonempty()
    }

    pub fn has_port(&self) -> bool {
        self.parsed.port.is_valid()
    }

    pub fn has_path(&self) -> bool {
        self.parsed.path.is_valid()
    }

    pub fn has_query(&self) -> bool {
        self.parsed.query.is_valid()
    }

    pub fn has_fragment(&self) -> bool {
        self.parsed.fragment.is_valid()
    }

    /// The port spelled in the URL, if any.
    pub fn port(&self) -> Option<u16> {
        canon::parse_port_number(self.component(self.parsed.port))
    }

    /// The port this URL uses: the explicit port, or the scheme's default.
    pub fn effective_port(&self) -> Option<u16> {
        self.port().or_else(|| default_port(self.scheme()))
    }

    /// The path plus query, as sent in an HTTP request line.
    pub fn path_for_request(&self) -> &str {
        if !self.parsed.path.is_valid() {
            return "/";
        }
        if self.parsed.query.is_valid() {
            &self.spec[self.parsed.path.begin..self.parsed.query.end()]
        } else {
            self.path()
        }
    }

    /// Case-insensitive scheme comparison against a lower-case reference.
    pub fn scheme_is(&self, scheme: &str) -> bool {
        self.scheme().eq_ignore_ascii_case(scheme)
    }

    pub fn scheme_is_http_or_https(&self) -> bool {
        self.scheme_is("http") || self.scheme_is("https")
    }

    pub fn scheme_is_file(&self) -> bool {
        self.scheme_is("file")
    }

    pub fn scheme_is_filesystem(&self) -> bool {
        self.scheme_is("filesystem")
    }

    /// Whether the scheme is registered as standard (authority + path).
    pub fn scheme_is_standard(&self) -> bool {
        registry::is_standard(self.scheme())
    }

    /// Whether the canonical host is an IP literal.
    pub fn host_is_ip_address(&self) -> bool {
        let host = self.host();
        if host.starts_with('[') {
            return true;
        }
        matches!(parse_ipv4(host), Ipv4Result::Ipv4(..))
    }

    /// The embedded URL of a `filesystem:` spec.
    pub fn inner_url(&self) -> Option<&Url> {
        self.inner.as_deref()
    }

    /// Resolve a (possibly relative) reference against this URL.
    ///
    /// Resolving against an invalid URL yields the empty URL.
    pub fn resolve(&self, reference: &str) -> Url {
        self.resolve_with(reference, None)
    }

    fn resolve_with(&self, reference: &str, converter: Option<&dyn CharsetConverter>) -> Url {
        if !self.valid {
            return Url::empty();
        }
        let (spec, parsed, valid) =
            resolve_relative(&self.spec, &self.parsed, self.valid, reference, converter);
        Url::from_canonical(spec, parsed, valid)
    }

    /// Apply component overrides, producing a new canonical URL.
    ///
    /// Replacing on an invalid URL yields the empty URL.
    pub fn replace_components(&self, replacements: Replacements<'_>) -> Url {
        if !self.valid {
            return Url::empty();
        }
        let (spec, parsed, valid) =
            apply_replacements(&self.spec, &self.parsed, &replacements, None);
        Url::from_canonical(spec, parsed, valid)
    }

    /// The origin URL: `scheme://host[:port]/` with userinfo, path, query
    /// and fragment removed. For `filesystem:` URLs this is the inner
    /// URL's origin; for opaque schemes it is the empty URL.
    pub fn origin(&self) -> Url {
        if !self.valid {
            return Url::empty();
        }
        if self.scheme_is_filesystem() {
            return match self.inner_url() {
                Some(inner) => inner.origin(),
                None => Url::empty(),
            };
        }
        if !self.scheme_is_standard() {
            return Url::empty();
        }
        self.replace_components(
            Replacements::new()
                .clear_username()
                .clear_password()
                .set_path("/")
                .clear_query()
                .clear_fragment(),
        )
    }

    /// This URL with the path replaced by `/` and query/fragment dropped.
    pub fn with_empty_path(&self) -> Url {
        if !self.valid || !self.scheme_is_standard() {
            return Url::empty();
        }
        self.replace_components(
            Replacements::new()
                .set_path("/")
                .clear_query()
                .clear_fragment(),
        )
    }

    /// The form of this URL to send as a referrer: http(s) only, with the
    /// fragment and any user identification removed.
    pub fn as_referrer(&self) -> Url {
        if !self.valid || !self.scheme_is_http_or_https() {
            return Url::empty();
        }
        if !self.has_username() && !self.has_password() && !self.has_fragment() {
            return self.clone();
        }
        self.replace_components(
            Replacements::new()
                .clear_username()
                .clear_password()
                .clear_fragment(),
        )
    }

    /// Whether the host is `suffix` or ends with `.suffix`. A single
    /// trailing dot on either side is ignored.
    pub fn domain_is(&self, suffix: &str) -> bool {
        let host = self.host().trim_end_matches('.');
        let suffix = suffix.trim_end_matches('.');
        if host.is_empty() || suffix.is_empty() || host.len() < suffix.len() {
            return false;
        }
        let tail = &host[host.len() - suffix.len()..];
        if !tail.eq_ignore_ascii_case(suffix) {
            return false;
        }
        host.len() == suffix.len()
            || suffix.starts_with('.')
            || host.as_bytes()[host.len() - suffix.len() - 1] == b'.'
    }

    /// Exchange the contents of two URLs.
    pub fn swap(&mut self, other: &mut Url) {
        std::mem::swap(self, other);
    }
}

impl Default for Url {
    fn default() -> Url {
        Url::empty()
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.possibly_invalid_spec())
    }
}

impl fmt::Debug for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            write!(f, "Url({:?})", self.spec)
        } else {
            write!(f, "Url(invalid, {:?})", self.spec)
        }
    }
}

/// URLs compare by canonical spec; an invalid URL never equals a valid one.
impl PartialEq for Url {
    fn eq(&self, other: &Url) -> bool {
        self.valid == other.valid && self.spec == other.spec
    }
}

impl Eq for Url {}

impl PartialOrd for Url {
    fn partial_cmp(&self, other: &Url) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Url {
    fn cmp(&self, other: &Url) -> Ordering {
        self.spec
            .cmp(&other.spec)
            .then(self.valid.cmp(&other.valid))
    }
}

impl Hash for Url {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.valid.hash(state);
        self.spec.hash(state);
    }
}

/// Options for one parse: an optional base URL and an optional charset
/// converter for non-UTF-8 query strings.
///
/// ```
/// use urlcanon::Url;
///
/// let base = Url::parse("http://example.com/a/");
/// let url = Url::options().base_url(&base).parse("b.html");
/// assert_eq!(url.spec(), "http://example.com/a/b.html");
/// ```
#[derive(Copy, Clone)]
pub struct ParseOptions<'a> {
    base: Option<&'a Url>,
    converter: Option<&'a dyn CharsetConverter>,
}

impl<'a> ParseOptions<'a> {
    /// Resolve the input against `base` instead of requiring it to be
    /// absolute.
    pub fn base_url(mut self, base: &'a Url) -> ParseOptions<'a> {
        self.base = Some(base);
        self
    }

    /// Encode non-ASCII query text with `converter` instead of UTF-8.
    pub fn charset_converter(mut self, converter: &'a dyn CharsetConverter) -> ParseOptions<'a> {
        self.converter = Some(converter);
        self
    }

    /// Run the parse.
    pub fn parse(self, input: &str) -> Url {
        match self.base {
            Some(base) => base.resolve_with(input, self.converter),
            None => {
                let (spec, parsed, valid) = canonicalize_url(input, self.converter);
                Url::from_canonical(spec, parsed, valid)
            }
        }
    }
}

/// The error of [`Url::try_parse`]: the input did not canonicalize
/// cleanly. The degraded URL is preserved for display and inspection.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct InvalidUrl(pub Url);

impl fmt::Display for InvalidUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid URL: {:?}", self.0.possibly_invalid_spec())
    }
}

impl Error for InvalidUrl {}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::Url;
    use serde::de::{Error, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt;

    /// Serializes as the canonical spec string.
    impl Serialize for Url {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(self.possibly_invalid_spec())
        }
    }

    /// Deserializes by re-parsing; invalid URLs are rejected.
    impl<'de> Deserialize<'de> for Url {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Url, D::Error> {
            struct UrlVisitor;
            impl<'de> Visitor<'de> for UrlVisitor {
                type Value = Url;

                fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                    formatter.write_str("a string representing a URL")
                }

                fn visit_str<E: Error>(self, s: &str) -> Result<Url, E> {
                    Url::try_parse(s).map_err(|e| Error::custom(e.to_string()))
                }
            }
            deserializer.deserialize_str(UrlVisitor)
        }
    }
}
