//! Splitting of command lines into words.

use std::mem;

/// Raised when a quoted word never sees its closing quote.
#[derive(Debug, PartialEq, Eq)]
pub struct UnfinishedQuote;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexerState {
    Skipping,
    ReadingWord,
    ReadingQuoted(char),
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexerState,
    buffer: String,
    words: Vec<String>,
}

impl LexingFSM {
    fn new(input: &str) -> LexingFSM {
        LexingFSM {
            input: input.chars().collect(),
            pos: 0,
            state: LexerState::Skipping,
            buffer: String::new(),
            words: Vec::new(),
        }
    }

    /// Runs the machine over the whole input and yields the words.
    fn tokenize(mut self) -> Result<Vec<String>, UnfinishedQuote> {
        while let Some(symbol) = self.current() {
            match self.state {
                LexerState::Skipping => self.handle_skipping(symbol),
                LexerState::ReadingWord => self.handle_word(symbol),
                LexerState::ReadingQuoted(quote) => self.handle_quoted(symbol, quote),
            }
            self.pos += 1;
        }
        match self.state {
            LexerState::ReadingQuoted(_) => Err(UnfinishedQuote),
            LexerState::ReadingWord => {
                self.words.push(mem::take(&mut self.buffer));
                Ok(self.words)
            }
            LexerState::Skipping => Ok(self.words),
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn handle_skipping(&mut self, symbol: char) {
        if symbol == '\'' || symbol == '"' {
            self.state = LexerState::ReadingQuoted(symbol);
        } else if !symbol.is_whitespace() {
            self.buffer.push(symbol);
            self.state = LexerState::ReadingWord;
        }
    }

    fn handle_word(&mut self, symbol: char) {
        if symbol.is_whitespace() {
            self.words.push(mem::take(&mut self.buffer));
            self.state = LexerState::Skipping;
        } else if symbol == '\'' || symbol == '"' {
            self.state = LexerState::ReadingQuoted(symbol);
        } else {
            self.buffer.push(symbol);
        }
    }

    fn handle_quoted(&mut self, symbol: char, quote: char) {
        if symbol == quote {
            self.state = LexerState::ReadingWord;
        } else {
            self.buffer.push(symbol);
        }
    }
}

/// Splits `line` into words.
///
/// Unquoted runs split on whitespace. A single- or double-quoted span keeps
/// its spaces, glues onto adjacent text and may produce an empty word.
/// Returns an error if the line ends inside an open quote.
pub fn split_words(line: &str) -> Result<Vec<String>, UnfinishedQuote> {
    LexingFSM::new(line).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &str) -> Vec<String> {
        split_words(line).unwrap()
    }

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(words("show User 1234"), ["show", "User", "1234"]);
        assert_eq!(words("  all   State  "), ["all", "State"]);
        assert!(words("").is_empty());
    }

    #[test]
    fn quotes_keep_spaces() {
        assert_eq!(
            words("update Place 1 name \"My little house\""),
            ["update", "Place", "1", "name", "My little house"]
        );
        assert_eq!(words("create 'two words'"), ["create", "two words"]);
    }

    #[test]
    fn quoted_spans_glue_onto_neighbours() {
        assert_eq!(words("ab'cd'ef"), ["abcdef"]);
        assert_eq!(words("'a'\"b\""), ["ab"]);
    }

    #[test]
    fn empty_quotes_make_an_empty_word() {
        assert_eq!(words("update User 1 name \"\""), ["update", "User", "1", "name", ""]);
    }

    #[test]
    fn the_other_quote_is_plain_text() {
        assert_eq!(words("\"it's\""), ["it's"]);
    }

    #[test]
    fn unclosed_quote_is_an_error() {
        assert_eq!(split_words("show User \"124"), Err(UnfinishedQuote));
    }
}
