//! Repeating-key XOR used by the page image endpoint.
//!
//! Keys arrive as hex strings. Decoding and encoding are the same operation.

/// Parses a hex key two characters at a time.
///
/// A pair that is not valid hex becomes `0`, so that key position leaves the
/// data untouched. A trailing odd character is dropped.
pub fn parse_key(hex_key: &str) -> Vec<u8> {
    hex_key
        .as_bytes()
        .chunks_exact(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .unwrap_or(0)
        })
        .collect()
}

/// XORs `data` with the key parsed from `hex_key`, cycling the key.
///
/// An empty key returns the input unchanged.
pub fn decode(data: &[u8], hex_key: &str) -> Vec<u8> {
    let key = parse_key(hex_key);

    if key.is_empty() {
        return data.to_vec();
    }

    data.iter()
        .zip(key.iter().cycle())
        .map(|(byte, k)| byte ^ k)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("a1b2"), vec![0xa1, 0xb2]);
        assert_eq!(parse_key("A1B2ff"), vec![0xa1, 0xb2, 0xff]);
        assert_eq!(parse_key("a1b"), vec![0xa1]);
        assert_eq!(parse_key("zz01"), vec![0x00, 0x01]);
        assert!(parse_key("").is_empty());
    }

    #[test]
    fn test_decode_repeats_key() {
        let data = [0x00, 0x00, 0x00, 0xff, 0x10];
        assert_eq!(decode(&data, "a1b2"), vec![0xa1, 0xb2, 0xa1, 0x4d, 0xb1]);
    }

    #[test]
    fn test_decode_is_self_inverse() {
        let data: Vec<u8> = (0..=255).collect();

        for key in ["a1b2", "00", "ff", "0123456789abcdef", "deadbeefc0"] {
            let encoded = decode(&data, key);
            assert_eq!(decode(&encoded, key), data, "key {key}");
        }
    }

    #[test]
    fn test_empty_key_is_identity() {
        let data = b"\xff\xd8\xff\xe0plain jpeg".to_vec();
        assert_eq!(decode(&data, ""), data);
        assert_eq!(decode(&data, "f"), data);
    }

    #[test]
    fn test_malformed_pair_leaves_position_untouched() {
        let data = [0x10, 0x10, 0x10, 0x10];
        assert_eq!(decode(&data, "zz01"), vec![0x10, 0x11, 0x10, 0x11]);
    }

    #[test]
    fn test_decode_empty_data() {
        assert!(decode(&[], "a1b2").is_empty());
    }
}
