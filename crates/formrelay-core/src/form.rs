//! `application/x-www-form-urlencoded` body parsing.
//!
//! Bodies are split into `key=value` segments first and each side is decoded
//! afterwards, so an encoded `%26` or `%3D` inside a value never changes the
//! segment structure.

use crate::{Error, Result, record::Fields};

/// Parse a submitted form body into its fields.
///
/// Fails with [`Error::MalformedBody`] when the body is empty, is not UTF-8,
/// or contains a segment without `=`. A segment is split at its first `=`.
/// When a key repeats, the last occurrence wins.
pub fn parse(body: &[u8]) -> Result<Fields> {
  let body = std::str::from_utf8(body)
    .map_err(|_| Error::MalformedBody("body is not valid UTF-8".to_string()))?;

  if body.is_empty() {
    return Err(Error::MalformedBody("body is empty".to_string()));
  }

  let mut fields = Fields::new();
  for segment in body.split('&') {
    let (key, value) = segment.split_once('=').ok_or_else(|| {
      Error::MalformedBody(format!("segment {segment:?} has no '='"))
    })?;
    fields.insert(decode_component(key), decode_component(value));
  }
  Ok(fields)
}

/// Decode one form component: `+` becomes a space, then `%XX` escapes are
/// resolved.
pub fn decode_component(raw: &str) -> String { decode(raw, true) }

/// Decode `%XX` escapes only. Used for request paths, where `+` is literal.
pub fn percent_decode(raw: &str) -> String { decode(raw, false) }

fn decode(raw: &str, plus_as_space: bool) -> String {
  let bytes = raw.as_bytes();
  let mut out = Vec::with_capacity(bytes.len());
  let mut i = 0;
  while i < bytes.len() {
    match bytes[i] {
      b'+' if plus_as_space => {
        out.push(b' ');
        i += 1;
      }
      b'%' => {
        match (hex_value(bytes.get(i + 1)), hex_value(bytes.get(i + 2))) {
          (Some(hi), Some(lo)) => {
            out.push((hi << 4) | lo);
            i += 3;
          }
          _ => {
            out.push(b'%');
            i += 1;
          }
        }
      }
      b => {
        out.push(b);
        i += 1;
      }
    }
  }
  String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: Option<&u8>) -> Option<u8> {
  byte.and_then(|b| (*b as char).to_digit(16)).map(|d| d as u8)
}
