// Copyright 2023 The urlcanon developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Recognition of IPv4 and IPv6 literals in canonical host text.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::chars::hex_value;

/// Outcome of trying to read a host as an IPv4 literal.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Ipv4Result {
    /// The host is an IPv4 literal; carries the address and how many
    /// dot-separated components spelled it.
    Ipv4(Ipv4Addr, usize),
    /// Numeric all the way but out of range; the host is not usable.
    Broken,
    /// Not numeric; treat the host as a name.
    Neutral,
}

enum ComponentValue {
    Value(u64),
    NotNumeric,
}

/// Parse one dotted component in its self-selected base: `0x`/`0X` prefix
/// means hex, a leading `0` means octal, anything else decimal. Values are
/// capped well above 32 bits so overflow stays detectable.
fn parse_ipv4_component(text: &str) -> ComponentValue {
    let (digits, radix) = if text.starts_with("0x") || text.starts_with("0X") {
        (&text[2..], 16)
    } else if text.len() >= 2 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };
    // `0x` and `0` alone denote zero.
    if digits.is_empty() {
        return if radix == 10 {
            ComponentValue::NotNumeric
        } else {
            ComponentValue::Value(0)
        };
    }
    let mut value: u64 = 0;
    for byte in digits.bytes() {
        let digit = match hex_value(byte) {
            Some(d) if (d as u32) < radix => d as u64,
            _ => return ComponentValue::NotNumeric,
        };
        value = value * radix as u64 + digit;
        if value > u32::max_value() as u64 {
            // Saturate; the caller reports overflow.
            value = u32::max_value() as u64 + 1;
        }
    }
    ComponentValue::Value(value)
}

/// Try to read `host` as an IPv4 literal.
///
/// Up to four components, one trailing dot tolerated. A component that is
/// not purely numeric in its base makes the whole host a name (`Neutral`);
/// numeric components that overflow their slot make it `Broken`.
pub fn parse_ipv4(host: &str) -> Ipv4Result {
    if host.is_empty() {
        return Ipv4Result::Neutral;
    }
    let mut parts: Vec<&str> = host.split('.').collect();
    if parts.len() > 1 && parts.last() == Some(&"") {
        parts.pop();
    }
    if parts.len() > 4 {
        return Ipv4Result::Neutral;
    }

    let mut values = Vec::with_capacity(parts.len());
    for part in &parts {
        match parse_ipv4_component(part) {
            ComponentValue::NotNumeric => return Ipv4Result::Neutral,
            ComponentValue::Value(v) => values.push(v),
        }
    }

    // All components numeric from here on: any range problem is Broken.
    let num_components = values.len();
    let last = values.pop().expect("split yields at least one part");
    if values.iter().any(|&v| v > 255) {
        return Ipv4Result::Broken;
    }
    // The final component covers the remaining bytes of the address.
    let remaining_bytes = 4 - values.len() as u32;
    if remaining_bytes < 4 && last >> (8 * remaining_bytes) != 0 {
        return Ipv4Result::Broken;
    }
    if last > u32::max_value() as u64 {
        return Ipv4Result::Broken;
    }

    let mut address = last as u32;
    for (i, &v) in values.iter().enumerate() {
        address |= (v as u32) << (8 * (3 - i as u32));
    }
    Ipv4Result::Ipv4(Ipv4Addr::from(address), num_components)
}

/// Parse the inside of an `[...]` IPv6 literal.
///
/// Up to eight hextets, at most one `::` contraction, optional trailing
/// dotted-quad (read with the IPv4 rule, filling the last 32 bits). The
/// pieces must account for exactly 128 bits, with the contraction absorbing
/// a shortfall of at least one hextet. `None` means the literal is broken.
pub fn parse_ipv6(host: &str) -> Option<Ipv6Addr> {
    if host.is_empty() {
        return None;
    }
    let (left, right, has_contraction) = match host.find("::") {
        Some(i) => {
            let right = &host[i + 2..];
            if right.contains("::") {
                return None;
            }
            (&host[..i], right, true)
        }
        None => (host, "", false),
    };

    let (left_groups, left_ipv4) = parse_hextet_run(left, !has_contraction)?;
    let (right_groups, right_ipv4) = parse_hextet_run(right, has_contraction)?;
    if left_ipv4.is_some() && (has_contraction || right_ipv4.is_some()) {
        return None;
    }
    let ipv4 = left_ipv4.or(right_ipv4);

    let bits = 16 * (left_groups.len() + right_groups.len()) + if ipv4.is_some() { 32 } else { 0 };
    if has_contraction {
        // The contraction must absorb at least one zero hextet.
        if bits > 128 - 16 {
            return None;
        }
    } else if bits != 128 {
        return None;
    }

    let mut pieces = [0u16; 8];
    for (i, &g) in left_groups.iter().enumerate() {
        pieces[i] = g;
    }
    let mut tail = Vec::with_capacity(right_groups.len() + 2);
    tail.extend_from_slice(&right_groups);
    if let Some(addr) = ipv4 {
        let o = addr.octets();
        tail.push(u16::from(o[0]) << 8 | u16::from(o[1]));
        tail.push(u16::from(o[2]) << 8 | u16::from(o[3]));
    }
    for (i, &g) in tail.iter().rev().enumerate() {
        pieces[7 - i] = g;
    }
    Some(Ipv6Addr::new(
        pieces[0], pieces[1], pieces[2], pieces[3], pieces[4], pieces[5], pieces[6], pieces[7],
    ))
}

/// Write the canonical text of an IPv6 address: lowercase hex hextets,
/// leading zeros stripped, the longest run of two or more zero hextets
/// contracted to `::` (first run wins ties). Always hextets; the mixed
/// `::ffff:a.b.c.d` notation is never produced.
pub(crate) fn write_ipv6(addr: &Ipv6Addr, out: &mut crate::output::CanonOutput) {
    use std::fmt::Write;

    let segments = addr.segments();
    let (compress_start, compress_end) = longest_zero_run(&segments);
    let mut i: isize = 0;
    while i < 8 {
        if i == compress_start {
            out.push(b':');
            if i == 0 {
                out.push(b':');
            }
            if compress_end < 8 {
                i = compress_end;
            } else {
                break;
            }
        }
        write!(out, "{:x}", segments[i as usize]).expect("writing to CanonOutput cannot fail");
        if i < 7 {
            out.push(b':');
        }
        i += 1;
    }
}

fn longest_zero_run(pieces: &[u16; 8]) -> (isize, isize) {
    let mut longest = -1;
    // Runs of a single zero hextet are left uncontracted.
    let mut longest_length = 1;
    let mut start = -1;
    macro_rules! finish_sequence {
        ($end: expr) => {
            if start >= 0 {
                let length = $end - start;
                if length > longest_length {
                    longest = start;
                    longest_length = length;
                }
            }
        };
    }
    for i in 0..8 {
        if pieces[i as usize] == 0 {
            if start < 0 {
                start = i;
            }
        } else {
            finish_sequence!(i);
            start = -1;
        }
    }
    finish_sequence!(8);
    (longest, longest + longest_length)
}

/// Parse a `:`-separated run of hextets; the final piece may be a dotted
/// quad when `ipv4_allowed_last`.
fn parse_hextet_run(run: &str, ipv4_allowed_last: bool) -> Option<(Vec<u16>, Option<Ipv4Addr>)> {
    let mut groups = Vec::new();
    let mut ipv4 = None;
    if run.is_empty() {
        return Some((groups, ipv4));
    }
    let pieces: Vec<&str> = run.split(':').collect();
    let last = pieces.len() - 1;
    for (i, piece) in pieces.iter().enumerate() {
        if piece.is_empty() {
            return None;
        }
        if piece.contains('.') {
            if i != last || !ipv4_allowed_last {
                return None;
            }
            match parse_ipv4(piece) {
                Ipv4Result::Ipv4(addr, _) => ipv4 = Some(addr),
                _ => return None,
            }
        } else {
            if piece.len() > 4 {
                return None;
            }
            let mut value = 0u16;
            for byte in piece.bytes() {
                value = value * 0x10 + u16::from(hex_value(byte)?);
            }
            groups.push(value);
        }
    }
    Some((groups, ipv4))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(s: &str) -> Ipv4Result {
        parse_ipv4(s)
    }

    #[test]
    fn ipv4_spellings() {
        assert_eq!(
            v4("192.168.0.1"),
            Ipv4Result::Ipv4(Ipv4Addr::new(192, 168, 0, 1), 4)
        );
        assert_eq!(
            v4("0300.0250.00.01"),
            Ipv4Result::Ipv4(Ipv4Addr::new(192, 168, 0, 1), 4)
        );
        assert_eq!(
            v4("0xC0.0Xa8.0x0.0x1"),
            Ipv4Result::Ipv4(Ipv4Addr::new(192, 168, 0, 1), 4)
        );
        assert_eq!(
            v4("192.168.1"),
            Ipv4Result::Ipv4(Ipv4Addr::new(192, 168, 0, 1), 3)
        );
        assert_eq!(
            v4("0x1232131"),
            Ipv4Result::Ipv4(Ipv4Addr::new(1, 35, 33, 49), 1)
        );
        assert_eq!(v4("111"), Ipv4Result::Ipv4(Ipv4Addr::new(0, 0, 0, 111), 1));
    }

    #[test]
    fn ipv4_trailing_dot() {
        assert_eq!(
            v4("1.2.3.4."),
            Ipv4Result::Ipv4(Ipv4Addr::new(1, 2, 3, 4), 4)
        );
        // Two trailing dots leave an empty component: a name, not an IP.
        assert_eq!(v4("1.2.3.4.."), Ipv4Result::Neutral);
    }

    #[test]
    fn ipv4_neutral_vs_broken() {
        assert_eq!(v4("www.example.com"), Ipv4Result::Neutral);
        assert_eq!(v4("1.2.+3.4"), Ipv4Result::Neutral);
        assert_eq!(v4("09.1.1.1"), Ipv4Result::Neutral); // '9' is no octal digit
        assert_eq!(v4("2..2.3"), Ipv4Result::Neutral);
        assert_eq!(v4("1.2.3.4.5"), Ipv4Result::Neutral);

        assert_eq!(v4("192.168.0.257"), Ipv4Result::Broken);
        assert_eq!(v4("256.1.1.1"), Ipv4Result::Broken);
        assert_eq!(v4("42.0x1232131"), Ipv4Result::Broken);
        assert_eq!(v4("4294967296"), Ipv4Result::Broken);
    }

    #[test]
    fn ipv6_basic() {
        assert_eq!(
            parse_ipv6("2001:db8:85a3:8d3:1319:8a2e:370:7344"),
            Some(Ipv6Addr::new(
                0x2001, 0xdb8, 0x85a3, 0x8d3, 0x1319, 0x8a2e, 0x370, 0x7344
            ))
        );
        assert_eq!(parse_ipv6("::"), Some(Ipv6Addr::from(0u128)));
        assert_eq!(
            parse_ipv6("::1"),
            Some(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1))
        );
        assert_eq!(
            parse_ipv6("1::"),
            Some(Ipv6Addr::new(1, 0, 0, 0, 0, 0, 0, 0))
        );
    }

    #[test]
    fn ipv6_embedded_ipv4() {
        assert_eq!(
            parse_ipv6("::ffff:192.168.0.1"),
            Some(Ipv6Addr::new(0, 0, 0, 0, 0, 0xffff, 0xc0a8, 0x1))
        );
        // The embedded quad follows the IPv4 rule, octal and hex included.
        assert_eq!(
            parse_ipv6("::ffff:0xC0.0250.0.1"),
            Some(Ipv6Addr::new(0, 0, 0, 0, 0, 0xffff, 0xc0a8, 0x1))
        );
        assert_eq!(parse_ipv6("1.2.3.4::"), None);
        assert_eq!(parse_ipv6("::1.2.3.300"), None);
    }

    #[test]
    fn ipv6_group_count() {
        // Contraction must absorb at least 16 bits.
        assert_eq!(parse_ipv6("1:2:3:4:5:6:7:8::"), None);
        assert_eq!(parse_ipv6("::1:2:3:4:5:6:7:8"), None);
        // Without contraction the count must be exact.
        assert_eq!(parse_ipv6("1:2:3:4:5:6:7"), None);
        assert_eq!(parse_ipv6("1:2:3:4:5:6:7:8:9"), None);
    }

    #[test]
    fn ipv6_canonical_text() {
        fn text(addr: Ipv6Addr) -> String {
            let mut out = crate::output::CanonOutput::new();
            write_ipv6(&addr, &mut out);
            out.finish()
        }
        // Always hextets, never the mixed ::ffff:a.b.c.d notation.
        assert_eq!(text(parse_ipv6("::ffff:1.2.3.4").unwrap()), "::ffff:102:304");
        // Only the longest run contracts; single zeros stay.
        assert_eq!(text(parse_ipv6("1:0:2:0:0:0:3:0").unwrap()), "1:0:2::3:0");
        // First run wins ties.
        assert_eq!(text(parse_ipv6("0:0:1:1:1:1:0:0").unwrap()), "::1:1:1:1:0:0");
    }

    #[test]
    fn ipv6_malformed() {
        assert_eq!(parse_ipv6(""), None);
        assert_eq!(parse_ipv6(":::"), None);
        assert_eq!(parse_ipv6("1::2::3"), None);
        assert_eq!(parse_ipv6(":1::2"), None);
        assert_eq!(parse_ipv6("12345::"), None);
        assert_eq!(parse_ipv6("g::"), None);
        assert_eq!(parse_ipv6("google.com"), None);
    }
}
