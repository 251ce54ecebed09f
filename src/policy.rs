//! Password strength classification
//!
//! Encrypt submissions are gated on [`Strength::Strong`]; the tiers below
//! exist so the presentation layer can tell "almost there" apart from
//! "missing whole character classes".

/// Minimum length for a strong password.
const MIN_STRONG_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    /// Missing one or more character categories, or empty.
    Weak,
    /// All four character categories present but shorter than 8 characters.
    Medium,
    /// At least 8 characters with upper and lower case letters, a digit
    /// and a symbol.
    Strong,
}

impl Strength {
    /// Classifies a password in a single scan. Pure; no allocation.
    ///
    /// A symbol is any character that is neither alphanumeric nor
    /// whitespace. Characters outside ASCII count toward the category
    /// their unicode class puts them in.
    pub fn classify(password: &str) -> Strength {
        if password.is_empty() {
            return Strength::Weak;
        }

        let mut has_upper = false;
        let mut has_lower = false;
        let mut has_digit = false;
        let mut has_symbol = false;
        let mut chars = 0usize;

        for c in password.chars() {
            chars += 1;
            if c.is_uppercase() {
                has_upper = true;
            } else if c.is_lowercase() {
                has_lower = true;
            } else if c.is_numeric() {
                has_digit = true;
            } else if !c.is_whitespace() {
                has_symbol = true;
            }
        }

        if !(has_upper && has_lower && has_digit && has_symbol) {
            return Strength::Weak;
        }
        if chars < MIN_STRONG_LEN {
            return Strength::Medium;
        }
        Strength::Strong
    }
}
