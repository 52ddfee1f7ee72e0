//! Character sets used to build candidate passwords.
//!
//! A selector is either one of the named sets (`digits`, `lowercase`,
//! `uppercase`, `letters`, `symbols`, `alphanum`, `all`) or a combination
//! code made only of the flags `d`, `l`, `u` and `s`. Resolved sets are
//! always concatenated in the order digits, lowercase, uppercase, symbols;
//! that order is the enumeration order downstream.

use std::fmt;

use tracing::warn;

const DIGITS: &str = "0123456789";
const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// ASCII punctuation, in code point order.
const SYMBOLS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// A parsed charset selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Digits,
    Lowercase,
    Uppercase,
    Letters,
    Symbols,
    Alphanum,
    All,
    Custom {
        digits: bool,
        lowercase: bool,
        uppercase: bool,
        symbols: bool,
    },
}

impl Charset {
    /// Parses a selector. Unknown selectors fall back to [`Charset::Digits`]
    /// with a warning instead of failing.
    pub fn parse(selector: &str) -> Self {
        match selector {
            "digits" => return Charset::Digits,
            "lowercase" => return Charset::Lowercase,
            "uppercase" => return Charset::Uppercase,
            "letters" => return Charset::Letters,
            "symbols" => return Charset::Symbols,
            "alphanum" => return Charset::Alphanum,
            "all" => return Charset::All,
            _ => {}
        }

        let is_code = !selector.is_empty() && selector.chars().all(|c| "dlus".contains(c));
        if !is_code {
            warn!("Unknown character set '{}', falling back to digits", selector);
            return Charset::Digits;
        }

        Charset::Custom {
            digits: selector.contains('d'),
            lowercase: selector.contains('l'),
            uppercase: selector.contains('u'),
            symbols: selector.contains('s'),
        }
    }

    fn parts(self) -> (bool, bool, bool, bool) {
        match self {
            Charset::Digits => (true, false, false, false),
            Charset::Lowercase => (false, true, false, false),
            Charset::Uppercase => (false, false, true, false),
            Charset::Letters => (false, true, true, false),
            Charset::Symbols => (false, false, false, true),
            Charset::Alphanum => (true, true, true, false),
            Charset::All => (true, true, true, true),
            Charset::Custom {
                digits,
                lowercase,
                uppercase,
                symbols,
            } => (digits, lowercase, uppercase, symbols),
        }
    }

    /// The concrete, ordered alphabet for this selector.
    pub fn alphabet(self) -> Alphabet {
        let (digits, lowercase, uppercase, symbols) = self.parts();
        let mut chars = String::new();
        if digits {
            chars.push_str(DIGITS);
        }
        if lowercase {
            chars.push_str(LOWERCASE);
        }
        if uppercase {
            chars.push_str(UPPERCASE);
        }
        if symbols {
            chars.push_str(SYMBOLS);
        }
        Alphabet::new(chars.chars())
    }

    /// Human-readable description, e.g. `Digits (0-9) - 10 characters`.
    pub fn describe(self) -> String {
        let label = match self {
            Charset::Digits => "Digits (0-9)".to_string(),
            Charset::Lowercase => "Lowercase letters (a-z)".to_string(),
            Charset::Uppercase => "Uppercase letters (A-Z)".to_string(),
            Charset::Letters => "All letters (a-z, A-Z)".to_string(),
            Charset::Symbols => "Symbols/special characters".to_string(),
            Charset::Alphanum => "Alphanumeric (0-9, a-z, A-Z)".to_string(),
            Charset::All => "All characters (0-9, a-z, A-Z, symbols)".to_string(),
            Charset::Custom { .. } => {
                let (digits, lowercase, uppercase, symbols) = self.parts();
                let names: Vec<&str> = [
                    (digits, "digits"),
                    (lowercase, "lowercase"),
                    (uppercase, "uppercase"),
                    (symbols, "symbols"),
                ]
                .iter()
                .filter(|(on, _)| *on)
                .map(|(_, name)| *name)
                .collect();
                format!("Custom set ({})", names.join(" + "))
            }
        };
        format!("{} - {} characters", label, self.alphabet().len())
    }
}

/// Resolves a selector straight to its alphabet.
pub fn resolve(selector: &str) -> Alphabet {
    Charset::parse(selector).alphabet()
}

/// Ordered set of characters candidates are drawn from.
///
/// Duplicates are dropped keeping the first occurrence, so the order stays
/// fixed. An empty alphabet is replaced by the digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    chars: Vec<char>,
}

impl Alphabet {
    /// Keeps the first occurrence of each character; an empty input gives digits.
    pub fn new(chars: impl IntoIterator<Item = char>) -> Self {
        let mut unique: Vec<char> = Vec::new();
        for c in chars {
            if !unique.contains(&c) {
                unique.push(c);
            }
        }

        if unique.is_empty() {
            warn!("Empty alphabet, falling back to digits");
            unique = DIGITS.chars().collect();
        }

        Self { chars: unique }
    }

    /// Characters in enumeration order.
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Number of distinct characters.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Always false for an alphabet built through `new`.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Position of `c` in the enumeration order.
    pub fn index_of(&self, c: char) -> Option<usize> {
        self.chars.iter().position(|&x| x == c)
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Charset::Digits.alphabet()
    }
}

impl From<&str> for Alphabet {
    fn from(chars: &str) -> Self {
        Alphabet::new(chars.chars())
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.chars {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}
