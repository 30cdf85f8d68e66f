// Copyright 2023 The urlcanon developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Host canonicalization: names, IDN hand-off, and IP literals.

use std::fmt::Write;

use percent_encoding::percent_decode;

use crate::chars::{append_escaped, is_host_char};
use crate::ip::{parse_ipv4, parse_ipv6, write_ipv6, Ipv4Result};
use crate::output::CanonOutput;
use crate::parsed::Component;

/// What kind of host canonicalization found.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum HostFamily {
    /// A name (or an empty host); not an IP literal.
    Neutral,
    /// Unusable: failed unescaping, IDN conversion, or IP syntax.
    Broken,
    Ipv4,
    Ipv6,
}

/// Classification of a canonicalized host, including the raw address bytes
/// for IP literals.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CanonHostInfo {
    pub family: HostFamily,
    /// How many dot-separated components an IPv4 literal was spelled with.
    pub num_ipv4_components: usize,
    /// Network-order address; the first 4 bytes for IPv4, all 16 for IPv6.
    pub address: [u8; 16],
    /// Where the canonical host landed in the output.
    pub out_host: Component,
}

impl CanonHostInfo {
    fn neutral(out_host: Component) -> CanonHostInfo {
        CanonHostInfo {
            family: HostFamily::Neutral,
            num_ipv4_components: 0,
            address: [0; 16],
            out_host,
        }
    }

    /// 4 for IPv4, 16 for IPv6, 0 otherwise.
    pub fn address_len(&self) -> usize {
        match self.family {
            HostFamily::Ipv4 => 4,
            HostFamily::Ipv6 => 16,
            _ => 0,
        }
    }

    pub fn is_ip_address(&self) -> bool {
        matches!(self.family, HostFamily::Ipv4 | HostFamily::Ipv6)
    }
}

/// Copy `text` as a lowercase ASCII host, escaping anything a host may not
/// contain. Returns false when escaping was needed.
fn append_simple_host(text: &[u8], out: &mut CanonOutput) -> bool {
    let mut success = true;
    for &byte in text {
        if byte.is_ascii_uppercase() {
            out.push(byte.to_ascii_lowercase());
        } else if is_host_char(byte) {
            out.push(byte);
        } else {
            append_escaped(byte, out);
            success = false;
        }
    }
    success
}

/// Canonicalize a host component, appending to `out`.
///
/// Pure-ASCII unescaped input takes a direct lowercasing path; anything
/// else is percent-unescaped and, when still non-ASCII, handed to the IDN
/// transcoder. The result is then checked against the IPv4 and IPv6 literal
/// grammars, whose canonical numeric form replaces the text when they
/// match. Failures still emit a recognizable escaped fallback and classify
/// the host as `Broken`.
pub fn canonicalize_host(spec: &str, host: Component, out: &mut CanonOutput) -> CanonHostInfo {
    if !host.is_valid() {
        return CanonHostInfo::neutral(Component::none());
    }
    let host_begin = out.len();
    let text = host.slice(spec);
    if text.is_empty() {
        return CanonHostInfo::neutral(Component::new(host_begin, 0));
    }

    if text.starts_with('[') {
        return canonicalize_ipv6_literal(text, host_begin, out);
    }

    let bytes = text.as_bytes();
    let has_non_ascii = bytes.iter().any(|&b| b >= 0x80);
    let has_escaped = bytes.contains(&b'%');

    let broken;
    if !has_non_ascii && !has_escaped {
        broken = !append_simple_host(bytes, out);
    } else {
        let unescaped = percent_decode(bytes).decode_utf8_lossy();
        if unescaped.bytes().any(|b| b >= 0x80) {
            match idna::domain_to_ascii(&unescaped) {
                Ok(ascii) => broken = !append_simple_host(ascii.as_bytes(), out),
                Err(_) => {
                    // IDN failure: keep an escaped rendition of what the
                    // author wrote so the URL stays displayable.
                    append_simple_host(bytes, out);
                    broken = true;
                }
            }
        } else {
            broken = !append_simple_host(unescaped.as_bytes(), out);
        }
    }

    let canonical = String::from_utf8_lossy(&out.as_bytes()[host_begin..]).into_owned();
    match parse_ipv4(&canonical) {
        Ipv4Result::Ipv4(addr, num_components) => {
            out.truncate(host_begin);
            write!(out, "{}", addr).expect("writing to CanonOutput cannot fail");
            let mut address = [0; 16];
            address[..4].copy_from_slice(&addr.octets());
            CanonHostInfo {
                family: HostFamily::Ipv4,
                num_ipv4_components: num_components,
                address,
                out_host: Component::new(host_begin, out.len() - host_begin),
            }
        }
        Ipv4Result::Broken => CanonHostInfo {
            family: HostFamily::Broken,
            num_ipv4_components: 0,
            address: [0; 16],
            out_host: Component::new(host_begin, out.len() - host_begin),
        },
        Ipv4Result::Neutral => CanonHostInfo {
            family: if broken {
                HostFamily::Broken
            } else {
                HostFamily::Neutral
            },
            num_ipv4_components: 0,
            address: [0; 16],
            out_host: Component::new(host_begin, out.len() - host_begin),
        },
    }
}

fn canonicalize_ipv6_literal(text: &str, host_begin: usize, out: &mut CanonOutput) -> CanonHostInfo {
    let inside = text
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'));
    if let Some(addr) = inside.and_then(parse_ipv6) {
        out.push(b'[');
        write_ipv6(&addr, out);
        out.push(b']');
        CanonHostInfo {
            family: HostFamily::Ipv6,
            num_ipv4_components: 0,
            address: addr.octets(),
            out_host: Component::new(host_begin, out.len() - host_begin),
        }
    } else {
        append_simple_host(text.as_bytes(), out);
        CanonHostInfo {
            family: HostFamily::Broken,
            num_ipv4_components: 0,
            address: [0; 16],
            out_host: Component::new(host_begin, out.len() - host_begin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(input: &str) -> (String, HostFamily) {
        let mut out = CanonOutput::new();
        let info = canonicalize_host(input, Component::new(0, input.len()), &mut out);
        (out.finish(), info.family)
    }

    #[test]
    fn simple_names_lowercase() {
        assert_eq!(
            canon("WWW.Example.COM"),
            ("www.example.com".to_string(), HostFamily::Neutral)
        );
    }

    #[test]
    fn escaped_hosts_unescape() {
        assert_eq!(
            canon("%77%77%77.example.com"),
            ("www.example.com".to_string(), HostFamily::Neutral)
        );
        // A space cannot live in a host, even written as %20.
        let (text, family) = canon("a%20b");
        assert_eq!(text, "a%20b");
        assert_eq!(family, HostFamily::Broken);
    }

    #[test]
    fn idn_hand_off() {
        let (text, family) = canon("\u{2603}.net");
        assert_eq!(text, "xn--n3h.net");
        assert_eq!(family, HostFamily::Neutral);

        let (text, family) = canon("go\u{0219}u.ro");
        assert_eq!(text, "xn--gou-1qa.ro");
        assert_eq!(family, HostFamily::Neutral);
    }

    #[test]
    fn ipv4_replaces_text() {
        let (text, family) = canon("0xC0.0250.0.1");
        assert_eq!(text, "192.168.0.1");
        assert_eq!(family, HostFamily::Ipv4);

        let (_, family) = canon("192.168.0.257");
        assert_eq!(family, HostFamily::Broken);
    }

    #[test]
    fn ipv6_literals() {
        let (text, family) = canon("[2001:0DB8:0:0:0:0:0:1]");
        assert_eq!(text, "[2001:db8::1]");
        assert_eq!(family, HostFamily::Ipv6);

        let (text, family) = canon("[google.com]");
        assert_eq!(family, HostFamily::Broken);
        assert!(text.contains("google.com"));
    }

    #[test]
    fn contraction_ties_pick_first_run() {
        let (text, _) = canon("[1:0:0:2:0:0:3:0]");
        assert_eq!(text, "[1::2:0:0:3:0]");
        let (text, _) = canon("[1::2:0:0:3:0]");
        assert_eq!(text, "[1::2:0:0:3:0]");
    }

    #[test]
    fn invalid_chars_break_host() {
        let (text, family) = canon("exa mple.com");
        assert_eq!(text, "exa%20mple.com");
        assert_eq!(family, HostFamily::Broken);
    }
}
