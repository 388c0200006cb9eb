/// Groups of characters that look alike in common fonts, even if they
/// belong to different scripts.
const SIMILAR_GLYPHS: &[&[char]] = &[
    &['A', '\u{0410}', '\u{0391}'],
    &['B', '\u{0412}', '\u{0392}'],
    &['C', '\u{0421}'],
    &['E', '\u{0415}', '\u{0395}'],
    &['H', '\u{041D}', '\u{0397}'],
    &['I', '\u{0406}', '\u{0399}'],
    &['J', '\u{0408}'],
    &['K', '\u{041A}', '\u{039A}'],
    &['M', '\u{041C}', '\u{039C}'],
    &['N', '\u{039D}'],
    &['O', '\u{041E}', '\u{039F}'],
    &['P', '\u{0420}', '\u{03A1}'],
    &['S', '\u{0405}'],
    &['T', '\u{0422}', '\u{03A4}'],
    &['X', '\u{0425}', '\u{03A7}'],
    &['Y', '\u{04AE}', '\u{03A5}'],
    &['Z', '\u{0396}'],
    &['a', '\u{0430}'],
    &['c', '\u{0441}'],
    &['e', '\u{0435}'],
    &['i', '\u{0456}'],
    &['j', '\u{0458}'],
    &['o', '\u{043E}', '\u{03BF}'],
    &['p', '\u{0440}'],
    &['s', '\u{0455}'],
    &['x', '\u{0445}'],
    &['y', '\u{0443}'],
];

/// Iterates over every group of similar characters.
pub(crate) fn glyph_groups() -> impl Iterator<Item = &'static [char]> {
    SIMILAR_GLYPHS.iter().copied()
}
