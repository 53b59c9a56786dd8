//! IRC case-mapping functions.
//!
//! Channel names compare case-insensitively under the `rfc1459` mapping,
//! where `[]\~` are the uppercase forms of `{}|^`. Channel-keyed state is
//! stored under the folded name so that `NAMES #Rust` and a reply for
//! `#rust` land on the same entry.

#[inline]
fn fold(c: char) -> char {
    match c {
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        'A'..='Z' => c.to_ascii_lowercase(),
        _ => c,
    }
}

/// Convert a string to IRC lowercase using RFC 1459 case mapping.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(fold).collect()
}

/// Compare two strings using IRC case-insensitive comparison.
pub fn irc_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.chars().zip(b.chars()).all(|(ca, cb)| fold(ca) == fold(cb))
}
