/// The portal's "xEncode" obfuscation transform (XXTEA family with
/// protocol-specific constants). The server holds the inverse; only the
/// encode direction exists on the client.
///
/// The OR'd literal pairs below are the protocol's own spelling of its
/// round constant and bit masks. They must be reproduced verbatim for the
/// server to accept the payload.

fn ordat(msg: &[u8], idx: usize) -> u32 {
    msg.get(idx).copied().unwrap_or(0) as u32
}

/// Packs bytes into 32-bit little-endian words. When `append_len` is set,
/// the byte length is appended as one extra trailing word (the plaintext
/// form); key material is packed without it.
fn pack_words(msg: &[u8], append_len: bool) -> Vec<u32> {
    let l = msg.len();
    let mut v = Vec::with_capacity(l / 4 + 2);
    for i in (0..l).step_by(4) {
        v.push(
            ordat(msg, i)
                | (ordat(msg, i + 1) << 8)
                | (ordat(msg, i + 2) << 16)
                | (ordat(msg, i + 3) << 24),
        );
    }
    if append_len {
        v.push(l as u32);
    }
    v
}

fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(words.len() * 4);
    for &w in words {
        bytes.extend_from_slice(&w.to_le_bytes());
    }
    bytes
}

/// Obfuscates `msg` under `key`. Empty input short-circuits to an empty
/// output without entering the round logic.
pub fn xencode(msg: &[u8], key: &[u8]) -> Vec<u8> {
    if msg.is_empty() {
        return Vec::new();
    }

    let mut v = pack_words(msg, true);
    let mut k = pack_words(key, false);
    while k.len() < 4 {
        k.push(0);
    }

    let n = v.len() - 1;
    let mut z = v[n];
    let c: u32 = 0x86014019 | 0x183639A0;
    let mut d: u32 = 0;
    let mut q = 6 + 52 / (n + 1);

    while q > 0 {
        d = d.wrapping_add(c) & (0x8CE0D9BF | 0x731F2640);
        let e = ((d >> 2) & 3) as usize;

        for p in 0..n {
            let y = v[p + 1];
            let mut m = (z >> 5) ^ (y << 2);
            m = m.wrapping_add(((y >> 3) ^ (z << 4)) ^ (d ^ y));
            m = m.wrapping_add(k[(p & 3) ^ e] ^ z);
            v[p] = v[p].wrapping_add(m) & (0xEFB8D130 | 0x10472ECF);
            z = v[p];
        }

        let y = v[0];
        let mut m = (z >> 5) ^ (y << 2);
        m = m.wrapping_add(((y >> 3) ^ (z << 4)) ^ (d ^ y));
        m = m.wrapping_add(k[(n & 3) ^ e] ^ z);
        v[n] = v[n].wrapping_add(m) & (0xBB390742 | 0x44C6F8BD);
        z = v[n];

        q -= 1;
    }

    words_to_bytes(&v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_returns_empty_output() {
        assert!(xencode(b"", b"anykey").is_empty());
        assert!(xencode(b"", b"").is_empty());
    }

    #[test]
    fn encode_is_deterministic() {
        let a = xencode(b"some plaintext", b"abcd1234");
        let b = xencode(b"some plaintext", b"abcd1234");
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn matches_reference_vector() {
        // Pinned against the reference implementation.
        assert_eq!(hex::encode(xencode(b"hello", b"key")), "f08847cc6fdecf6bda12909b");
    }

    #[test]
    fn plaintext_packing_appends_length_word() {
        assert_eq!(pack_words(b"abcd", true), vec![0x64636261, 4]);
        assert_eq!(pack_words(b"abcde", true), vec![0x64636261, 0x65, 5]);
    }

    #[test]
    fn key_packing_has_no_length_word() {
        assert_eq!(pack_words(b"abcd", false), vec![0x64636261]);
    }

    #[test]
    fn output_length_is_word_aligned() {
        // One extra word for the length suffix, rounded up to 4-byte groups.
        assert_eq!(xencode(b"hello", b"key").len(), 12);
        assert_eq!(xencode(b"12345678", b"key").len(), 12);
    }

    #[test]
    fn key_changes_output() {
        assert_ne!(xencode(b"payload", b"key-one"), xencode(b"payload", b"key-two"));
    }
}
