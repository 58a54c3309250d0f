use crate::error::{AnchorError, Result};
use tiny_keccak::{Hasher, Keccak};

/// Registry call this core prepares but does not broadcast:
/// `postAnchor(bytes32 root, string uri, uint32 schemaVersion, bytes32 salt)`.
const POST_ANCHOR_SIGNATURE: &str = "postAnchor(bytes32,string,uint32,bytes32)";

fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(input);
    hasher.finalize(&mut output);
    output
}

fn push_u64_word(out: &mut Vec<u8>, value: u64) {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    out.extend_from_slice(&word);
}

/// ABI-encode the `postAnchor` call. Pure function with no side effects, so
/// operators can prepare calldata here and execute it from a multisig or any
/// other signer elsewhere.
pub fn post_anchor_calldata(
    root: &[u8; 32],
    uri: &str,
    schema_version: u32,
    salt: &[u8; 32],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 32 * 6 + uri.len());
    out.extend_from_slice(&keccak256(POST_ANCHOR_SIGNATURE.as_bytes())[..4]);

    // Static head: root | offset-to-uri | schemaVersion | salt.
    out.extend_from_slice(root);
    push_u64_word(&mut out, 4 * 32);
    push_u64_word(&mut out, schema_version as u64);
    out.extend_from_slice(salt);

    // Dynamic tail: uri length + bytes padded to a 32-byte boundary.
    let uri_bytes = uri.as_bytes();
    push_u64_word(&mut out, uri_bytes.len() as u64);
    out.extend_from_slice(uri_bytes);
    let remainder = uri_bytes.len() % 32;
    if remainder != 0 {
        out.extend_from_slice(&vec![0u8; 32 - remainder]);
    }

    out
}

/// Parse a 0x-prefixed 64-char hex string into 32 bytes (anchor roots and
/// salts as persisted on the batch row).
pub fn decode_hex32(value: &str) -> Result<[u8; 32]> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    let bytes =
        hex::decode(stripped).map_err(|e| AnchorError::InvalidHex(format!("{}: {}", value, e)))?;
    bytes
        .try_into()
        .map_err(|_| AnchorError::InvalidHex(format!("expected 32 bytes in {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_is_first_four_bytes_of_signature_hash() {
        let data = post_anchor_calldata(&[0u8; 32], "", 1, &[0u8; 32]);
        let expected = &keccak256(POST_ANCHOR_SIGNATURE.as_bytes())[..4];
        assert_eq!(&data[..4], expected);
    }

    #[test]
    fn test_calldata_layout() {
        let root = [0x11u8; 32];
        let salt = [0x22u8; 32];
        let uri = "http://localhost:8000/anchors/j1.json"; // 37 bytes
        let data = post_anchor_calldata(&root, uri, 7, &salt);

        let body = &data[4..];
        // Head word 0: root.
        assert_eq!(&body[0..32], &root);
        // Head word 1: offset to the string tail (4 words).
        assert_eq!(body[63], 128);
        // Head word 2: schema version.
        assert_eq!(body[95], 7);
        // Head word 3: salt.
        assert_eq!(&body[96..128], &salt);
        // Tail: length word then padded bytes.
        assert_eq!(body[159], 37);
        assert_eq!(&body[160..197], uri.as_bytes());

        // Total body length is word-aligned.
        assert_eq!(body.len() % 32, 0);
        assert_eq!(body.len(), 128 + 32 + 64);
    }

    #[test]
    fn test_empty_uri_has_no_padding() {
        let data = post_anchor_calldata(&[0u8; 32], "", 1, &[0u8; 32]);
        // selector + 4 head words + length word, no data words.
        assert_eq!(data.len(), 4 + 5 * 32);
    }

    #[test]
    fn test_decode_hex32() {
        let hexed = format!("0x{}", hex::encode([0xabu8; 32]));
        assert_eq!(decode_hex32(&hexed).unwrap(), [0xabu8; 32]);
        assert!(decode_hex32("0x1234").is_err());
        assert!(decode_hex32("not-hex").is_err());
    }
}
