//! Canonical JSON encoding shared by signing, Merkle commitment and block hashing.
//!
//! Keys are sorted at every level, separators carry no whitespace, anything
//! outside printable ASCII is `\u`-escaped and floats use the short
//! positional/scientific notation of the reference signer. Signer and verifier
//! must agree on every byte, so nothing else in the crate serializes records
//! for hashing.

use crate::error::Result;
use serde::Serialize;
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Encode a JSON value canonically.
pub fn encode(value: &Value) -> String {
    let mut out = String::with_capacity(256);
    write_value(&mut out, value);
    out
}

/// Encode any serializable value canonically.
pub fn to_canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(encode(&serde_json::to_value(value)?))
}

/// Lowercase hex SHA-256 digest of `bytes`.
pub fn sha256_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(bytes.as_ref()))
}

/// SHA-256 over the canonical encoding of `value`, hex encoded.
pub fn canonical_hash(value: &Value) -> String {
    sha256_hex(encode(value))
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_number(out: &mut String, n: &Number) {
    if n.is_f64() {
        match n.as_f64() {
            Some(f) => out.push_str(&format_float(f)),
            None => out.push_str("null"),
        }
    } else {
        out.push_str(&n.to_string());
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(ch),
            _ => {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04x}", unit);
                }
            }
        }
    }
    out.push('"');
}

/// Shortest round-trip rendering: positional with a trailing `.0` when the
/// decimal exponent lies in `-4..16`, otherwise `d.ddde±XX`.
fn format_float(value: f64) -> String {
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let scientific = format!("{:e}", value.abs());
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    if (-4..16).contains(&exponent) {
        if exponent >= 0 {
            let point = exponent as usize + 1;
            if digits.len() <= point {
                format!("{sign}{digits}{}.0", "0".repeat(point - digits.len()))
            } else {
                format!("{sign}{}.{}", &digits[..point], &digits[point..])
            }
        } else {
            format!("{sign}0.{}{digits}", "0".repeat((-exponent - 1) as usize))
        }
    } else {
        let mut mantissa = digits[..1].to_string();
        if digits.len() > 1 {
            mantissa.push('.');
            mantissa.push_str(&digits[1..]);
        }
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        format!("{sign}{mantissa}e{exp_sign}{:02}", exponent.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_sorted_and_compact() {
        let value = json!({"b": 1, "a": {"z": true, "m": [3, {"y": null, "x": "s"}]}});
        assert_eq!(
            encode(&value),
            r#"{"a":{"m":[3,{"x":"s","y":null}],"z":true},"b":1}"#
        );
    }

    #[test]
    fn test_integers_and_floats_stay_distinct() {
        let value = json!({"amount": 5.0, "timestamp": 1700000000, "neg": -2});
        assert_eq!(
            encode(&value),
            r#"{"amount":5.0,"neg":-2,"timestamp":1700000000}"#
        );
    }

    #[test]
    fn test_float_rendering() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(12.5), "12.5");
        assert_eq!(format_float(-3.0), "-3.0");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(0.00001), "1e-05");
        assert_eq!(format_float(1e15), "1000000000000000.0");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(1.5e300), "1.5e+300");
        assert_eq!(format_float(123456.789), "123456.789");
    }

    #[test]
    fn test_non_ascii_is_escaped() {
        let value = json!({"metadata": "caf\u{e9} \u{1f4e6}\u{7f}"});
        assert_eq!(
            encode(&value),
            "{\"metadata\":\"caf\\u00e9 \\ud83d\\udce6\\u007f\"}"
        );
    }

    #[test]
    fn test_control_characters_escaped() {
        let value = json!({"m": "line\nbreak \"quoted\"\u{1}"});
        assert_eq!(
            encode(&value),
            r#"{"m":"line\nbreak \"quoted\"\u0001"}"#
        );
    }

    #[test]
    fn test_matches_serde_for_plain_ascii() {
        let value = json!({"a": "plain", "b": [1, 2, 3], "c": {"d": false}});
        assert_eq!(encode(&value), serde_json::to_string(&value).unwrap());
    }

    #[test]
    fn test_structs_encode_through_value() {
        #[derive(Serialize)]
        struct Handoff {
            to: &'static str,
            amount: f64,
        }
        let text = to_canonical_json(&Handoff { to: "b", amount: 2.0 }).unwrap();
        assert_eq!(text, r#"{"amount":2.0,"to":"b"}"#);
    }

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
