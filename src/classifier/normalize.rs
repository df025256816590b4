/// Folds text into the form the banned-term patterns are written against:
/// lowercase, leetspeak digits and symbols mapped back to letters, and
/// everything that is not alphanumeric removed (`"N 1 c-3"` becomes `"nice"`).
///
/// Substitution runs before stripping so `$` and `@` are mapped rather than
/// dropped. The output contains no substitutable character and no
/// separators, so normalizing twice yields the same string.
pub fn normalize(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(deleet)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

fn deleet(c: char) -> char {
    match c {
        '0' => 'o',
        '1' => 'i',
        '3' => 'e',
        '4' => 'a',
        '5' => 's',
        '7' => 't',
        '8' => 'b',
        '$' => 's',
        '@' => 'a',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn maps_leetspeak() {
        assert_eq!(normalize("h3ll0 w0rld"), "helloworld");
        assert_eq!(normalize("$7@8"), "stab");
        assert_eq!(normalize("4 1 5"), "ais");
    }

    #[test]
    fn strips_punctuation_and_whitespace() {
        assert_eq!(normalize("b.a-d_w(o)r d!"), "badword");
        assert_eq!(normalize("  \t\n"), "");
    }

    #[test]
    fn keeps_digits_without_mapping() {
        assert_eq!(normalize("R2D2 96"), "r2d296");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(s in ".*") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn ascii_normalization_is_idempotent(s in "[ -~]{0,64}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
