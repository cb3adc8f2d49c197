use crate::SyntaxError;
use text_size::{TextRange, TextSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident,
    PackageKw,
    ClassKw,
    FunKw,
    ValKw,
    VarKw,
    Colon,
    Comma,
    Dot,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Error,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) range: TextRange,
}

impl Token {
    pub(crate) fn text<'t>(&self, text: &'t str) -> &'t str {
        &text[self.range]
    }
}

fn keyword(ident: &str) -> Option<TokenKind> {
    let kw = match ident {
        "package" => TokenKind::PackageKw,
        "class" => TokenKind::ClassKw,
        "fun" => TokenKind::FunKw,
        "val" => TokenKind::ValKw,
        "var" => TokenKind::VarKw,
        _ => return None,
    };
    Some(kw)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Splits `text` into tokens, skipping whitespace and `//` comments.
pub(crate) fn tokenize(text: &str) -> (Vec<Token>, Vec<SyntaxError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    let mut chars = text.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '/' && text[start..].starts_with("//") {
            while let Some(&(_, c)) = chars.peek() {
                if c == '\n' {
                    break;
                }
                chars.next();
            }
            continue;
        }

        let kind = match c {
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            c if is_ident_start(c) => {
                chars.next();
                let mut end = start + c.len_utf8();
                while let Some(&(i, c)) = chars.peek() {
                    if !is_ident_continue(c) {
                        break;
                    }
                    chars.next();
                    end = i + c.len_utf8();
                }
                let ident = &text[start..end];
                let kind = keyword(ident).unwrap_or(TokenKind::Ident);
                tokens.push(Token {
                    kind,
                    range: range_of(start, end),
                });
                continue;
            }
            _ => {
                chars.next();
                let range = range_of(start, start + c.len_utf8());
                errors.push(SyntaxError::new(format!("unexpected character `{c}`"), range));
                tokens.push(Token {
                    kind: TokenKind::Error,
                    range,
                });
                continue;
            }
        };
        chars.next();
        tokens.push(Token {
            kind,
            range: range_of(start, start + c.len_utf8()),
        });
    }

    (tokens, errors)
}

fn range_of(start: usize, end: usize) -> TextRange {
    TextRange::new(TextSize::new(start as u32), TextSize::new(end as u32))
}
