//! Collapses accidental repeats of Thai combining marks.
//!
//! Typing a vowel or tone mark twice in a row produces stacked glyphs that
//! shift the measured width of a run. Only runs of the *same* mark collapse;
//! distinct marks in sequence are left alone.

/// Thai above/below vowels, tone marks and other signs that attach to the
/// preceding consonant.
pub const COMBINING_MARKS: &[char] = &[
    '\u{0E31}', // mai han-akat
    '\u{0E34}', '\u{0E35}', '\u{0E36}', '\u{0E37}', // sara i, ii, ue, uee
    '\u{0E38}', '\u{0E39}', '\u{0E3A}', // sara u, uu, phinthu
    '\u{0E47}', // maitaikhu
    '\u{0E48}', '\u{0E49}', '\u{0E4A}', '\u{0E4B}', // tone marks
    '\u{0E4C}', '\u{0E4D}', '\u{0E4E}', // thanthakhat, nikhahit, yamakkan
];

pub fn is_combining_mark(ch: char) -> bool {
    COMBINING_MARKS.contains(&ch)
}

/// Replaces every run of two or more identical combining marks with a single one.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev = None;
    for ch in text.chars() {
        if prev == Some(ch) && is_combining_mark(ch) {
            continue;
        }
        out.push(ch);
        prev = Some(ch);
    }
    out
}
