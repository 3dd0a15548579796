//! 3x5 bitmap digits for jersey numbers.
//!
//! Each glyph is five rows, top to bottom; the low three bits of a row are
//! its columns, left to right.

pub const GLYPH_WIDTH: u32 = 3;
pub const GLYPH_HEIGHT: u32 = 5;

const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111], // 0
    [0b010, 0b110, 0b010, 0b010, 0b111], // 1
    [0b111, 0b001, 0b111, 0b100, 0b111], // 2
    [0b111, 0b001, 0b111, 0b001, 0b111], // 3
    [0b101, 0b101, 0b111, 0b001, 0b001], // 4
    [0b111, 0b100, 0b111, 0b001, 0b111], // 5
    [0b111, 0b100, 0b111, 0b101, 0b111], // 6
    [0b111, 0b001, 0b010, 0b010, 0b010], // 7
    [0b111, 0b101, 0b111, 0b101, 0b111], // 8
    [0b111, 0b101, 0b111, 0b001, 0b111], // 9
];

/// Rows for an ASCII digit, `None` for anything else
pub fn digit(c: char) -> Option<&'static [u8; 5]> {
    c.to_digit(10).map(|d| &DIGITS[d as usize])
}

/// Whether column `col` of row `row` is lit
pub fn lit(rows: &[u8; 5], col: u32, row: u32) -> bool {
    row < GLYPH_HEIGHT && col < GLYPH_WIDTH && rows[row as usize] & (0b100 >> col) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_digits_have_glyphs() {
        assert!(digit('7').is_some());
        assert!(digit('A').is_none());
    }

    #[test]
    fn test_one_has_center_column_stem() {
        let one = digit('1').unwrap();
        for row in 0..GLYPH_HEIGHT {
            assert!(lit(one, 1, row));
        }
        assert!(!lit(one, 2, 0));
    }
}
