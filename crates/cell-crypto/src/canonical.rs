//! Canonical signable-object encoding (§4.2/§6).
//!
//! Any object signed is first serialized deterministically: fields in a
//! fixed declared order, integers as base-10 digits, strings unescaped, no
//! trailing whitespace. This module provides the shared ordered key-value
//! writer; each command type that needs a canonical form (spot transaction in
//! `cell-ledger`, commitment and revocation in `cell-commitments` /
//! `cell-core`) builds its byte string with this writer so that two
//! implementations producing the same field values always produce
//! byte-identical messages.

/// Appends one `key=value` pair to `buf`, separated from the previous pair by
/// a single `&`. Caller supplies fields in the exact declared order.
pub struct CanonicalWriter {
    buf: Vec<u8>,
    wrote_any: bool,
}

impl CanonicalWriter {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            wrote_any: false,
        }
    }

    fn separator(&mut self) {
        if self.wrote_any {
            self.buf.push(b'&');
        }
        self.wrote_any = true;
    }

    pub fn field_str(mut self, key: &str, value: &str) -> Self {
        self.separator();
        self.buf.extend_from_slice(key.as_bytes());
        self.buf.push(b'=');
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    pub fn field_i128(self, key: &str, value: i128) -> Self {
        self.field_str(key, &value.to_string())
    }

    pub fn field_u64(self, key: &str, value: u64) -> Self {
        self.field_str(key, &value.to_string())
    }

    pub fn field_i64(self, key: &str, value: i64) -> Self {
        self.field_str(key, &value.to_string())
    }

    pub fn field_opt_i64(self, key: &str, value: Option<i64>) -> Self {
        match value {
            Some(v) => self.field_i64(key, v),
            None => self.field_str(key, ""),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for CanonicalWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits a canonical `key=value&key=value` message back into its ordered
/// fields. The inverse of [`CanonicalWriter`] — callers match against the
/// fixed field order their signable type declares rather than looking keys
/// up by name, since the format carries no self-describing schema.
pub fn parse_canonical_fields(bytes: &[u8]) -> Vec<(String, String)> {
    let text = String::from_utf8_lossy(bytes);
    if text.is_empty() {
        return Vec::new();
    }
    text.split('&')
        .map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next().unwrap_or_default().to_string();
            let value = parts.next().unwrap_or_default().to_string();
            (key, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_order_is_preserved_and_no_trailing_separator() {
        let bytes = CanonicalWriter::new()
            .field_str("payer", "abc")
            .field_str("payee", "def")
            .field_i128("amount", -30)
            .into_bytes();
        assert_eq!(bytes, b"payer=abc&payee=def&amount=-30");
    }

    #[test]
    fn identical_logical_content_yields_identical_bytes() {
        let a = CanonicalWriter::new().field_i64("created_at", 5).field_u64("nonce", 1).into_bytes();
        let b = CanonicalWriter::new().field_i64("created_at", 5).field_u64("nonce", 1).into_bytes();
        assert_eq!(a, b);
    }
}
