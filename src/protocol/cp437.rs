//! # Code Page 437 Encoding
//!
//! Most ESC/POS printers power up with Code Page 437 selected. When the
//! printer is left on that code page, text frames must be sent as single-byte
//! CP437 rather than UTF-8 or accented menu items print as mojibake.
//!
//! ASCII passes through unchanged. Characters without a CP437 glyph are
//! replaced with `?`.

use tracing::warn;

/// Upper half of CP437, indexed by `byte - 0x80`.
const UPPER_HALF: [char; 128] = [
    // 0x80
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    // 0x90
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    // 0xA0
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    // 0xB0
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    // 0xC0
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    // 0xD0
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    // 0xE0
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    // 0xF0
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{00A0}',
];

/// Encode a string as CP437 bytes, substituting `?` for unmapped characters.
pub fn encode(s: &str) -> Vec<u8> {
    s.chars()
        .map(|ch| {
            if ch.is_ascii() {
                ch as u8
            } else if let Some(byte) = lookup(ch) {
                byte
            } else {
                warn!(character = %ch, code_point = ch as u32, "no CP437 glyph, substituting '?'");
                b'?'
            }
        })
        .collect()
}

fn lookup(ch: char) -> Option<u8> {
    UPPER_HALF
        .iter()
        .position(|&c| c == ch)
        .map(|idx| 0x80 + idx as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        assert_eq!(encode("Table: 4"), b"Table: 4");
        assert_eq!(encode(""), b"");
    }

    #[test]
    fn test_menu_accents() {
        // "Café" -> C a f 0x82
        assert_eq!(encode("Café"), vec![0x43, 0x61, 0x66, 0x82]);
        assert_eq!(encode("Jalapeño"), b"Jalape\xA4o".to_vec());
        assert_eq!(encode("Crème brûlée"), b"Cr\x8Ame br\x96l\x82e".to_vec());
    }

    #[test]
    fn test_table_boundaries() {
        assert_eq!(encode("Ç"), vec![0x80]);
        assert_eq!(encode("ƒ"), vec![0x9F]);
        assert_eq!(encode("\u{00A0}"), vec![0xFF]);
    }

    #[test]
    fn test_currency_signs() {
        assert_eq!(encode("£¥¢"), vec![0x9C, 0x9D, 0x9B]);
    }

    #[test]
    fn test_unmapped_becomes_question_mark() {
        assert_eq!(encode("₹"), vec![b'?']);
        assert_eq!(encode("a★b"), vec![b'a', b'?', b'b']);
    }
}
