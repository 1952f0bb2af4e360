/// Base64 over the portal's own 64-character alphabet. Grouping and `=`
/// padding follow conventional Base64; only the lookup table differs, so
/// the output is unreadable to a standard decoder. The portal never asks
/// the client to decode, so no decode direction is provided.
const ALPHABET: &[u8; 64] = b"LVoJPiCN2R8G90yg+hmFHuacZ1OWMnrsSTXkYpUq/3dlbfKwv6xztjI7DeBE45QA";

const PAD: char = '=';

pub fn encode(input: &[u8]) -> String {
    let mut out = String::with_capacity((input.len() + 2) / 3 * 4);
    let mut chunks = input.chunks_exact(3);

    for chunk in &mut chunks {
        let b10 = (u32::from(chunk[0]) << 16) | (u32::from(chunk[1]) << 8) | u32::from(chunk[2]);
        out.push(ALPHABET[(b10 >> 18) as usize & 0x3F] as char);
        out.push(ALPHABET[(b10 >> 12) as usize & 0x3F] as char);
        out.push(ALPHABET[(b10 >> 6) as usize & 0x3F] as char);
        out.push(ALPHABET[b10 as usize & 0x3F] as char);
    }

    match chunks.remainder() {
        [b0] => {
            let b10 = u32::from(*b0) << 16;
            out.push(ALPHABET[(b10 >> 18) as usize & 0x3F] as char);
            out.push(ALPHABET[(b10 >> 12) as usize & 0x3F] as char);
            out.push(PAD);
            out.push(PAD);
        }
        [b0, b1] => {
            let b10 = (u32::from(*b0) << 16) | (u32::from(*b1) << 8);
            out.push(ALPHABET[(b10 >> 18) as usize & 0x3F] as char);
            out.push(ALPHABET[(b10 >> 12) as usize & 0x3F] as char);
            out.push(ALPHABET[(b10 >> 6) as usize & 0x3F] as char);
            out.push(PAD);
        }
        _ => {}
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_empty_string() {
        assert_eq!(encode(b""), "");
    }

    #[test]
    fn three_zero_bytes_map_to_first_alphabet_char() {
        assert_eq!(encode(&[0, 0, 0]), "LLLL");
    }

    #[test]
    fn one_byte_gets_double_padding() {
        assert_eq!(encode(&[0]), "LL==");
    }

    #[test]
    fn known_vectors() {
        assert_eq!(encode(b"Man"), "FaiK");
        assert_eq!(encode(b"Ma"), "FaP=");
    }

    #[test]
    fn output_is_not_standard_base64() {
        // Same grouping, different alphabet.
        assert_ne!(encode(b"Man"), "TWFu");
    }
}
