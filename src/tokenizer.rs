//! arffdata - ARFF lexer
//!
//! Splits an ARFF byte stream into [`Token`]s. The rules follow the classic
//! stream-tokenizer setup ARFF files have always been read with:
//!
//! - bytes up to `' '` and the comma are separators
//! - `%` starts a comment that runs to the end of the line
//! - `'` and `"` delimit quoted words; quoting ends at the matching quote or
//!   at the end of the line
//! - `{` and `}` stand alone
//! - line ends are tokens of their own
//!
//! Input is decoded as Latin-1, one byte per character.

use std::io::BufRead;

use crate::attribute::MISSING_TOKEN;
use crate::error::{ArffError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Bare or quoted word, quotes stripped and escapes resolved.
    Word(String),
    /// A bare `?`.
    Missing,
    /// `{` or `}`.
    Punct(char),
    Eol,
    Eof,
}

impl Token {
    /// Text used when the token shows up in an error message.
    pub fn describe(&self) -> String {
        match self {
            Token::Word(w) => w.clone(),
            Token::Missing => MISSING_TOKEN.to_string(),
            Token::Punct(c) => c.to_string(),
            Token::Eol => "end of line".to_string(),
            Token::Eof => "end of file".to_string(),
        }
    }
}

pub struct Tokenizer<R: BufRead> {
    reader: R,
    /// 1-based number of the line being read.
    line: usize,
    pushed: Option<Token>,
}

impl<R: BufRead> Tokenizer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 1,
            pushed: None,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Hand `token` back; the next call to [`Tokenizer::next_token`] returns it.
    pub fn push_back(&mut self, token: Token) {
        self.pushed = Some(token);
    }

    pub fn next_token(&mut self) -> Result<Token> {
        if let Some(token) = self.pushed.take() {
            return Ok(token);
        }
        loop {
            let Some(byte) = self.peek()? else {
                return Ok(Token::Eof);
            };
            match byte {
                b'\n' | b'\r' => {
                    self.eat_line_end()?;
                    return Ok(Token::Eol);
                }
                b'%' => self.skip_comment()?,
                b'\'' | b'"' => {
                    self.bump();
                    return Ok(Token::Word(self.quoted(byte)?));
                }
                b'{' | b'}' => {
                    self.bump();
                    return Ok(Token::Punct(byte as char));
                }
                b if is_separator(b) => self.bump(),
                _ => {
                    let word = self.word()?;
                    return Ok(if word == MISSING_TOKEN {
                        Token::Missing
                    } else {
                        Token::Word(word)
                    });
                }
            }
        }
    }

    /// Next token that is not a line end.
    pub fn first_token(&mut self) -> Result<Token> {
        loop {
            match self.next_token()? {
                Token::Eol => continue,
                token => return Ok(token),
            }
        }
    }

    /// Next token, which must not end the line or the file.
    pub fn next_required(&mut self) -> Result<Token> {
        match self.next_token()? {
            // The counter has already moved past the line that ended.
            Token::Eol => Err(ArffError::PrematureEol {
                line: self.line - 1,
            }),
            Token::Eof => Err(ArffError::PrematureEof { line: self.line }),
            token => Ok(token),
        }
    }

    /// Drop everything up to and including the next line end.
    pub fn skip_rest_of_line(&mut self) -> Result<()> {
        match self.pushed.take() {
            Some(Token::Eol) => return Ok(()),
            Some(Token::Eof) => {
                self.pushed = Some(Token::Eof);
                return Ok(());
            }
            _ => {}
        }
        while let Some(byte) = self.peek()? {
            if byte == b'\n' || byte == b'\r' {
                return self.eat_line_end();
            }
            self.bump();
        }
        Ok(())
    }

    /// Skip `count` raw lines without tokenizing them.
    pub fn skip_lines(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            if self.peek()?.is_none() {
                break;
            }
            self.skip_rest_of_line()?;
        }
        Ok(())
    }

    // ─── Byte level ────────────────────────────────────────────────────────

    fn peek(&mut self) -> Result<Option<u8>> {
        let buf = self.reader.fill_buf()?;
        Ok(buf.first().copied())
    }

    fn bump(&mut self) {
        self.reader.consume(1);
    }

    /// Consume `\n`, `\r` or `\r\n` as one line end.
    fn eat_line_end(&mut self) -> Result<()> {
        if self.peek()? == Some(b'\r') {
            self.bump();
            if self.peek()? == Some(b'\n') {
                self.bump();
            }
        } else {
            self.bump();
        }
        self.line += 1;
        Ok(())
    }

    /// Comment body; the line end is left for the caller.
    fn skip_comment(&mut self) -> Result<()> {
        while let Some(byte) = self.peek()? {
            if byte == b'\n' || byte == b'\r' {
                break;
            }
            self.bump();
        }
        Ok(())
    }

    fn quoted(&mut self, quote: u8) -> Result<String> {
        let mut text = String::new();
        while let Some(byte) = self.peek()? {
            match byte {
                b'\n' | b'\r' => break,
                b if b == quote => {
                    self.bump();
                    break;
                }
                b'\\' => {
                    self.bump();
                    match self.peek()? {
                        Some(b'\n') | Some(b'\r') | None => break,
                        Some(escaped) => {
                            self.bump();
                            text.push(match escaped {
                                b'n' => '\n',
                                b't' => '\t',
                                b'r' => '\r',
                                other => other as char,
                            });
                        }
                    }
                }
                b => {
                    self.bump();
                    text.push(b as char);
                }
            }
        }
        Ok(text)
    }

    fn word(&mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(byte) = self.peek()? {
            if is_separator(byte) || matches!(byte, b'%' | b'\'' | b'"' | b'{' | b'}') {
                break;
            }
            self.bump();
            text.push(byte as char);
        }
        Ok(text)
    }
}

fn is_separator(byte: u8) -> bool {
    byte <= b' ' || byte == b','
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tokens(input: &str) -> Vec<Token> {
        let mut lexer = Tokenizer::new(Cursor::new(input.as_bytes().to_vec()));
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            let done = token == Token::Eof;
            out.push(token);
            if done {
                return out;
            }
        }
    }

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn test_data_line() {
        assert_eq!(
            tokens("1.5, ?, 'a b',\"c\"\n"),
            vec![
                word("1.5"),
                Token::Missing,
                word("a b"),
                word("c"),
                Token::Eol,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_quoted_question_mark_is_a_word() {
        assert_eq!(tokens("'?'"), vec![word("?"), Token::Eof]);
    }

    #[test]
    fn test_enumeration() {
        assert_eq!(
            tokens("@ATTRIBUTE y {a,'b c'}"),
            vec![
                word("@ATTRIBUTE"),
                word("y"),
                Token::Punct('{'),
                word("a"),
                word("b c"),
                Token::Punct('}'),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_comments_and_line_ends() {
        assert_eq!(
            tokens("a % trailing\r\n% whole line\rb"),
            vec![word("a"), Token::Eol, Token::Eol, word("b"), Token::Eof]
        );
    }

    #[test]
    fn test_escapes() {
        assert_eq!(
            tokens(r"'it\'s' 'C:\\x' 'two\nlines'"),
            vec![word("it's"), word("C:\\x"), word("two\nlines"), Token::Eof]
        );
    }

    #[test]
    fn test_unterminated_quote_stops_at_line_end() {
        assert_eq!(
            tokens("'open\nnext"),
            vec![word("open"), Token::Eol, word("next"), Token::Eof]
        );
    }

    #[test]
    fn test_latin1_bytes() {
        let mut lexer = Tokenizer::new(Cursor::new(vec![b'c', 0xE9, b'\n']));
        assert_eq!(lexer.next_token().unwrap(), word("c\u{e9}"));
    }

    #[test]
    fn test_line_tracking_and_skips() -> Result<()> {
        let mut lexer = Tokenizer::new(Cursor::new(b"one two\n\n\nthree\nfour\r\nfive".to_vec()));
        assert_eq!(lexer.first_token()?, word("one"));
        lexer.skip_rest_of_line()?;
        assert_eq!(lexer.line(), 2);
        assert_eq!(lexer.first_token()?, word("three"));
        assert_eq!(lexer.line(), 4);
        lexer.skip_rest_of_line()?;
        lexer.skip_lines(1)?;
        assert_eq!(lexer.line(), 6);
        assert_eq!(lexer.next_token()?, word("five"));
        Ok(())
    }

    #[test]
    fn test_next_required() {
        let mut lexer = Tokenizer::new(Cursor::new(b"a\n".to_vec()));
        assert!(lexer.next_required().is_ok());
        assert!(matches!(
            lexer.next_required(),
            Err(ArffError::PrematureEol { .. })
        ));
        assert!(matches!(
            lexer.next_required(),
            Err(ArffError::PrematureEof { .. })
        ));
    }

    #[test]
    fn test_push_back() -> Result<()> {
        let mut lexer = Tokenizer::new(Cursor::new(b"a b".to_vec()));
        let first = lexer.next_token()?;
        lexer.push_back(first.clone());
        assert_eq!(lexer.next_token()?, first);
        assert_eq!(lexer.next_token()?, word("b"));
        Ok(())
    }
}
