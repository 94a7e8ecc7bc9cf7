/// One typeable unit derived from a word in the chapter text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The original word substring, punctuation included.
    pub text: String,
    /// First alphabetic character of `text`, lowercased unless
    /// case-sensitive mode is on.
    pub expected_symbol: char,
    /// Index of the source verse this token came from.
    pub block_index: usize,
    /// 0-based position in the chapter's full token sequence.
    pub sequence_index: usize,
}

/// Splits verse blocks into tokens, one per whitespace-delimited word that
/// contains at least one alphabetic character. Words with no letter at all
/// (a bare em-dash, a verse number) produce no token since there is nothing
/// to match a keypress against.
pub fn tokenize(verses: &[String], case_sensitive: bool) -> Vec<Token> {
    let mut tokens = Vec::new();

    for (block_index, verse) in verses.iter().enumerate() {
        for word in verse.split_whitespace() {
            let Some(first_letter) = word.chars().find(|c| c.is_alphabetic()) else {
                continue;
            };
            let expected_symbol = if case_sensitive {
                first_letter
            } else {
                fold_case(first_letter)
            };
            let sequence_index = tokens.len();
            tokens.push(Token {
                text: word.to_string(),
                expected_symbol,
                block_index,
                sequence_index,
            });
        }
    }

    tokens
}

/// Lowercases a single symbol for case-insensitive comparison.
/// Multi-char lowercase expansions (e.g. 'İ') keep their first char so a
/// symbol always stays a single char.
pub fn fold_case(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verses(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_genesis_one_opening() {
        let tokens = tokenize(
            &verses(&["In the beginning God created the heavens and the earth."]),
            false,
        );

        assert_eq!(tokens.len(), 10);
        assert_eq!(tokens[0].text, "In");
        assert_eq!(tokens[0].expected_symbol, 'i');
        assert_eq!(tokens[0].sequence_index, 0);
        assert_eq!(tokens[9].text, "earth.");
        assert_eq!(tokens[9].expected_symbol, 'e');
    }

    #[test]
    fn test_leading_quote_skipped_for_symbol() {
        let tokens = tokenize(&verses(&["\"Let there be light,\" and there was light."]), false);

        assert_eq!(tokens[0].text, "\"Let");
        assert_eq!(tokens[0].expected_symbol, 'l');
    }

    #[test]
    fn test_case_sensitive_keeps_capital() {
        let tokens = tokenize(&verses(&["In the beginning"]), true);
        assert_eq!(tokens[0].expected_symbol, 'I');
        assert_eq!(tokens[1].expected_symbol, 't');
    }

    #[test]
    fn test_no_letter_words_dropped() {
        let tokens = tokenize(&verses(&["wage — 30 denarii"]), false);

        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["wage", "denarii"]);
    }

    #[test]
    fn test_block_index_tracks_verse() {
        let tokens = tokenize(&verses(&["one two", "three"]), false);

        assert_eq!(tokens[0].block_index, 0);
        assert_eq!(tokens[1].block_index, 0);
        assert_eq!(tokens[2].block_index, 1);
        assert_eq!(tokens[2].text, "three");
    }

    #[test]
    fn test_sequence_indices_contiguous() {
        let tokens = tokenize(
            &verses(&["And God said,", "", "  \"Let   there be   light\"  "]),
            false,
        );

        for (i, token) in tokens.iter().enumerate() {
            assert_eq!(token.sequence_index, i);
        }
    }

    #[test]
    fn test_empty_and_whitespace_blocks_yield_nothing() {
        assert!(tokenize(&verses(&[]), false).is_empty());
        assert!(tokenize(&verses(&["", "   ", "\t\n"]), false).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let input = verses(&["Jesus wept.", "\"Take away the stone,\" he said."]);
        assert_eq!(tokenize(&input, false), tokenize(&input, false));
    }

    #[test]
    fn test_unicode_letters_accepted() {
        let tokens = tokenize(&verses(&["Ésaïe était prophète"]), false);
        assert_eq!(tokens[0].expected_symbol, 'é');
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_punctuation_retained_in_text() {
        let tokens = tokenize(&verses(&["earth. (selah)"]), false);
        assert_eq!(tokens[0].text, "earth.");
        assert_eq!(tokens[1].text, "(selah)");
        assert_eq!(tokens[1].expected_symbol, 's');
    }
}
