//! Tokenizer for the score language.
//!
//! Four token kinds: identifiers (including the `#`/`+`/`-`/`$` punctuation
//! some identifiers embed, e.g. note names like `C#4`), number-with-unit
//! literals, quoted strings with a small escape table, and single-character
//! symbols. Comments (`//` to end of line, non-nesting `/* */`) are trivia.

use crate::error::LexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Symbol,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    pub column: u32,
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '#' | '+' | '-' | '$')
}

fn is_symbol(ch: char) -> bool {
    matches!(ch, '{' | '}' | '[' | ']' | '(' | ')' | ':' | ',' | '.' | '|' | '=')
}

struct Lexer<'a> {
    chars: Vec<char>,
    index: usize,
    line: u32,
    column: u32,
    _source: &'a str,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            _source: source,
        }
    }

    fn at_end(&self) -> bool {
        self.index >= self.chars.len()
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_at(&self, lookahead: usize) -> char {
        self.chars.get(self.index + lookahead).copied().unwrap_or('\0')
    }

    fn advance(&mut self) {
        if self.at_end() {
            return;
        }
        if self.chars[self.index] == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.index += 1;
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            if self.at_end() {
                return Ok(());
            }
            if self.peek().is_whitespace() {
                self.advance();
                continue;
            }
            if self.peek() == '/' && self.peek_at(1) == '/' {
                while !self.at_end() && self.peek() != '\n' {
                    self.advance();
                }
                continue;
            }
            if self.peek() == '/' && self.peek_at(1) == '*' {
                self.advance();
                self.advance();
                while !self.at_end() && !(self.peek() == '*' && self.peek_at(1) == '/') {
                    self.advance();
                }
                if self.at_end() {
                    return Err(LexError::new(self.line, self.column, "unterminated block comment"));
                }
                self.advance();
                self.advance();
                continue;
            }
            return Ok(());
        }
    }

    fn might_be_number(&self) -> bool {
        if self.peek().is_ascii_digit() {
            return true;
        }
        matches!(self.peek(), '+' | '-') && self.peek_at(1).is_ascii_digit()
    }

    fn read_identifier(&mut self) -> String {
        let mut out = String::new();
        out.push(self.peek());
        self.advance();
        while !self.at_end() && is_identifier_part(self.peek()) {
            out.push(self.peek());
            self.advance();
        }
        out
    }

    fn read_number_with_unit(&mut self) -> String {
        let mut out = String::new();
        if matches!(self.peek(), '+' | '-') {
            out.push(self.peek());
            self.advance();
        }
        while !self.at_end() && self.peek().is_ascii_digit() {
            out.push(self.peek());
            self.advance();
        }
        if !self.at_end() && self.peek() == '.' {
            out.push(self.peek());
            self.advance();
            while !self.at_end() && self.peek().is_ascii_digit() {
                out.push(self.peek());
                self.advance();
            }
        }
        if !self.at_end() && matches!(self.peek(), 'e' | 'E') {
            out.push(self.peek());
            self.advance();
            if matches!(self.peek(), '+' | '-') {
                out.push(self.peek());
                self.advance();
            }
            while !self.at_end() && self.peek().is_ascii_digit() {
                out.push(self.peek());
                self.advance();
            }
        }
        while !self.at_end() && self.peek().is_ascii_alphabetic() {
            out.push(self.peek());
            self.advance();
        }
        out
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        self.advance();
        let mut out = String::new();
        while !self.at_end() && self.peek() != quote {
            if self.peek() == '\\' {
                self.advance();
                if self.at_end() {
                    return Err(LexError::new(self.line, self.column, "unterminated string escape"));
                }
                let esc = self.peek();
                out.push(match esc {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '\\' => '\\',
                    '"' => '"',
                    '\'' => '\'',
                    other => other,
                });
                self.advance();
                continue;
            }
            out.push(self.peek());
            self.advance();
        }
        if self.at_end() {
            return Err(LexError::new(self.line, self.column, "unterminated string literal"));
        }
        self.advance();
        Ok(out)
    }

    fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut out = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.at_end() {
                break;
            }
            let line = self.line;
            let column = self.column;
            let ch = self.peek();
            if ch == '"' || ch == '\'' {
                let text = self.read_string(ch)?;
                out.push(Token {
                    kind: TokenKind::String,
                    text,
                    line,
                    column,
                });
                continue;
            }
            if is_identifier_start(ch) {
                let text = self.read_identifier();
                out.push(Token {
                    kind: TokenKind::Identifier,
                    text,
                    line,
                    column,
                });
                continue;
            }
            if self.might_be_number() {
                let text = self.read_number_with_unit();
                out.push(Token {
                    kind: TokenKind::Number,
                    text,
                    line,
                    column,
                });
                continue;
            }
            if is_symbol(ch) {
                self.advance();
                out.push(Token {
                    kind: TokenKind::Symbol,
                    text: ch.to_string(),
                    line,
                    column,
                });
                continue;
            }
            return Err(LexError::new(line, column, format!("unexpected character: '{ch}'")));
        }
        out.push(Token {
            kind: TokenKind::End,
            text: String::new(),
            line: self.line,
            column: self.column,
        });
        Ok(out)
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}

/// Splits a lexed number token's text into `(value, unit)`, e.g. `"2.5s"` ->
/// `(2.5, "s")`, `"440Hz"` -> `(440.0, "Hz")`, `"4"` -> `(4.0, "")`.
pub fn split_number_unit(text: &str) -> Option<(f64, String)> {
    let split_at = text
        .char_indices()
        .find(|(_, c)| c.is_ascii_alphabetic())
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let (number_part, unit_part) = text.split_at(split_at);
    number_part.parse::<f64>().ok().map(|v| (v, unit_part.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_identifiers_numbers_strings_symbols() {
        let tokens = tokenize(r#"patch kick { at: 2.5s, name: "hi" }"#).unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Symbol,
                TokenKind::Identifier,
                TokenKind::Symbol,
                TokenKind::Number,
                TokenKind::Symbol,
                TokenKind::Identifier,
                TokenKind::Symbol,
                TokenKind::String,
                TokenKind::Symbol,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn line_and_comments_are_tracked() {
        let tokens = tokenize("a // comment\nb").unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn block_comments_do_not_nest() {
        let err = tokenize("/* outer /* inner */ still in comment */ x").unwrap_err();
        // the first `*/` closes the comment; the trailing `*/` becomes stray
        // text that the lexer tries (and fails) to tokenize as a symbol run.
        assert!(err.message.contains("unexpected"));
    }

    #[test]
    fn unterminated_string_errors() {
        let err = tokenize(r#""no closing quote"#).unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn split_number_unit_separates_value_and_unit() {
        assert_eq!(split_number_unit("2.5s"), Some((2.5, "s".to_string())));
        assert_eq!(split_number_unit("440Hz"), Some((440.0, "Hz".to_string())));
        assert_eq!(split_number_unit("4"), Some((4.0, "".to_string())));
    }

    #[test]
    fn string_escapes_are_interpreted() {
        let tokens = tokenize(r#""a\nb""#).unwrap();
        assert_eq!(tokens[0].text, "a\nb");
    }

    #[test]
    fn identifier_part_allows_note_name_punctuation() {
        let tokens = tokenize("C#4").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text, "C#4");
    }
}
