/// Canonical form of a transcript before matching: lowercase, straight
/// apostrophes, punctuation (other than apostrophes) replaced by spaces,
/// single spaces between words.
pub fn normalize(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '`' | '\u{b4}' => '\'',
            '\'' => '\'',
            c if c.is_ascii_punctuation() => ' ',
            '\u{201c}' | '\u{201d}' | '\u{ab}' | '\u{bb}' | '\u{a1}' | '\u{bf}' | '\u{2026}'
            | '\u{964}' => ' ',
            c => c,
        })
        .collect();
    mapped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whitespace tokens of already-normalized text.
pub fn tokens(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_case() {
        assert_eq!(normalize("  Take-Off, NOW!  "), "take off now");
        assert_eq!(normalize("Don\u{2019}t   go up."), "don't go up");
        assert_eq!(normalize("\u{201c}Land\u{201d}"), "land");
        assert_eq!(normalize(" \t\n"), "");
    }

    #[test]
    fn keeps_non_ascii_letters() {
        assert_eq!(normalize("UPAR jao\u{964}"), "upar jao");
        assert_eq!(tokens("spin left"), vec!["spin", "left"]);
    }
}
