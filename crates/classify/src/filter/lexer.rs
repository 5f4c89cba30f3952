//! Display filter tokenizer

use super::FilterError;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// Field names and bare values (`ip.src`, `10.0.0.1`, `0x18`)
    Word(String),
    /// Quoted value
    Quoted(String),
    Cmp(CmpOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

/// A token with its byte offset in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub pos: usize,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ':' | '/')
}

fn keyword(word: &str) -> Option<Token> {
    match word.to_ascii_lowercase().as_str() {
        "and" => Some(Token::And),
        "or" => Some(Token::Or),
        "not" => Some(Token::Not),
        "eq" => Some(Token::Cmp(CmpOp::Eq)),
        "ne" => Some(Token::Cmp(CmpOp::Ne)),
        "gt" => Some(Token::Cmp(CmpOp::Gt)),
        "lt" => Some(Token::Cmp(CmpOp::Lt)),
        "ge" => Some(Token::Cmp(CmpOp::Ge)),
        "le" => Some(Token::Cmp(CmpOp::Le)),
        "contains" => Some(Token::Cmp(CmpOp::Contains)),
        _ => None,
    }
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, FilterError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let token = match c {
            '(' => {
                chars.next();
                Token::LParen
            }
            ')' => {
                chars.next();
                Token::RParen
            }
            '=' | '!' | '<' | '>' | '&' | '|' => {
                chars.next();
                let next = chars.peek().map(|&(_, n)| n);
                let (token, double) = match (c, next) {
                    ('=', Some('=')) => (Token::Cmp(CmpOp::Eq), true),
                    ('!', Some('=')) => (Token::Cmp(CmpOp::Ne), true),
                    ('<', Some('=')) => (Token::Cmp(CmpOp::Le), true),
                    ('>', Some('=')) => (Token::Cmp(CmpOp::Ge), true),
                    ('&', Some('&')) => (Token::And, true),
                    ('|', Some('|')) => (Token::Or, true),
                    ('!', _) => (Token::Not, false),
                    ('<', _) => (Token::Cmp(CmpOp::Lt), false),
                    ('>', _) => (Token::Cmp(CmpOp::Gt), false),
                    _ => return Err(FilterError::InvalidCharacter { pos, ch: c }),
                };
                if double {
                    chars.next();
                }
                token
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, ch)) = chars.next() {
                    match ch {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            if let Some((_, escaped)) = chars.next() {
                                value.push(escaped);
                            }
                        }
                        other => value.push(other),
                    }
                }
                if !closed {
                    return Err(FilterError::UnterminatedString { pos });
                }
                Token::Quoted(value)
            }
            c if is_word_char(c) => {
                let mut word = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if !is_word_char(ch) {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                keyword(&word).unwrap_or(Token::Word(word))
            }
            other => return Err(FilterError::InvalidCharacter { pos, ch: other }),
        };

        tokens.push(Spanned { token, pos });
    }

    Ok(tokens)
}
