//! IRC case-mapping functions.
//!
//! Ident and host masks fold with plain ASCII rules. Nicknames use the
//! `rfc1459` mapping, which additionally treats `[]\~` as the uppercase
//! forms of `{}|^`.

/// Case-folding rule applied before comparing or glob-matching two strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Casemapping {
    /// ASCII letters only. Used for idents, hostnames and IP strings.
    Ascii,
    /// RFC 1459 mapping. Used for nicknames.
    #[default]
    Rfc1459,
}

impl Casemapping {
    /// Fold a single character according to this mapping.
    #[inline]
    pub const fn fold(self, c: char) -> char {
        match self {
            Casemapping::Ascii => c.to_ascii_lowercase(),
            Casemapping::Rfc1459 => irc_lower_char(c),
        }
    }

    /// Compare two strings under this mapping.
    pub fn eq(self, a: &str, b: &str) -> bool {
        a.len() == b.len()
            && a
                .chars()
                .zip(b.chars())
                .all(|(ca, cb)| self.fold(ca) == self.fold(cb))
    }
}

/// Convert a single character to IRC lowercase using RFC 1459 case mapping.
#[inline]
pub const fn irc_lower_char(c: char) -> char {
    match c {
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        'A'..='Z' => (c as u8 + 32) as char,
        _ => c,
    }
}

/// Convert a string to IRC lowercase using RFC 1459 case mapping.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(irc_lower_char).collect()
}

/// Compare two nicknames or channel names case-insensitively (RFC 1459).
pub fn irc_eq(a: &str, b: &str) -> bool {
    Casemapping::Rfc1459.eq(a, b)
}
