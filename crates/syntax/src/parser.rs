use crate::SyntaxError;
use crate::ast::{ClassDef, FunDef, Item, PackageDecl, Param, PropertyDef, SourceFile, TypeRef};
use crate::lexer::{Token, TokenKind, tokenize};
use text_size::{TextRange, TextSize};

pub(crate) fn parse_text(text: &str) -> (SourceFile, Vec<SyntaxError>) {
    let (tokens, mut errors) = tokenize(text);
    let mut parser = Parser {
        text,
        tokens: &tokens,
        pos: 0,
        errors: Vec::new(),
    };
    let file = parser.source_file();
    errors.extend(parser.errors);
    (file, errors)
}

struct Parser<'t> {
    text: &'t str,
    tokens: &'t [Token],
    pos: usize,
    errors: Vec<SyntaxError>,
}

impl Parser<'_> {
    fn source_file(&mut self) -> SourceFile {
        let package = if self.at(TokenKind::PackageKw) {
            self.package_decl()
        } else {
            None
        };
        let mut items = Vec::new();
        while let Some(token) = self.current() {
            if let Some(item) = self.item(token) {
                items.push(item);
            }
        }
        SourceFile { package, items }
    }

    fn package_decl(&mut self) -> Option<PackageDecl> {
        let kw = self.bump();
        let mut segments = Vec::new();
        let first = self.expect(TokenKind::Ident, "package name")?;
        segments.push(first.text(self.text).to_string());
        let mut end = first.range.end();
        while self.at(TokenKind::Dot) {
            self.bump();
            let segment = self.expect(TokenKind::Ident, "package segment")?;
            end = segment.range.end();
            segments.push(segment.text(self.text).to_string());
        }
        Some(PackageDecl {
            segments,
            range: TextRange::new(kw.range.start(), end),
        })
    }

    fn item(&mut self, token: Token) -> Option<Item> {
        match token.kind {
            TokenKind::ClassKw => self.class_def().map(Item::Class),
            TokenKind::FunKw => self.fun_def().map(Item::Function),
            TokenKind::ValKw | TokenKind::VarKw => self.property_def().map(Item::Property),
            _ => {
                self.error_and_bump("expected `class`, `fun`, `val` or `var`");
                None
            }
        }
    }

    fn class_def(&mut self) -> Option<ClassDef> {
        let kw = self.bump();
        let name = self.expect(TokenKind::Ident, "class name")?;
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut members = Vec::new();
        loop {
            match self.current() {
                None => {
                    self.error_at_eof("expected `}` to close class body");
                    let end = members.last().map(Item::range).map_or(name.range.end(), |r| r.end());
                    return Some(self.finish_class(kw, name, members, end));
                }
                Some(token) if token.kind == TokenKind::RBrace => {
                    self.bump();
                    return Some(self.finish_class(kw, name, members, token.range.end()));
                }
                Some(token) => {
                    if let Some(member) = self.item(token) {
                        members.push(member);
                    }
                }
            }
        }
    }

    fn finish_class(&mut self, kw: Token, name: Token, members: Vec<Item>, end: TextSize) -> ClassDef {
        ClassDef {
            name: name.text(self.text).to_string(),
            name_range: name.range,
            members,
            range: TextRange::new(kw.range.start(), end),
        }
    }

    fn fun_def(&mut self) -> Option<FunDef> {
        let kw = self.bump();
        let name = self.expect(TokenKind::Ident, "function name")?;
        self.expect(TokenKind::LParen, "`(`")?;
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                params.push(self.param()?);
                if !self.at(TokenKind::Comma) {
                    break;
                }
                self.bump();
            }
        }
        let rparen = self.expect(TokenKind::RParen, "`)`")?;
        let mut end = rparen.range.end();
        let mut ret_type = None;
        if self.at(TokenKind::Colon) {
            self.bump();
            let ty = self.type_ref()?;
            end = ty.range.end();
            ret_type = Some(ty);
        }
        Some(FunDef {
            name: name.text(self.text).to_string(),
            name_range: name.range,
            params,
            ret_type,
            range: TextRange::new(kw.range.start(), end),
        })
    }

    fn param(&mut self) -> Option<Param> {
        let name = self.expect(TokenKind::Ident, "parameter name")?;
        self.expect(TokenKind::Colon, "`:`")?;
        let ty = self.type_ref()?;
        Some(Param {
            name: name.text(self.text).to_string(),
            range: TextRange::new(name.range.start(), ty.range.end()),
            ty,
        })
    }

    fn property_def(&mut self) -> Option<PropertyDef> {
        let kw = self.bump();
        let mutable = kw.kind == TokenKind::VarKw;
        let name = self.expect(TokenKind::Ident, "property name")?;
        let mut end = name.range.end();
        let mut ty = None;
        if self.at(TokenKind::Colon) {
            self.bump();
            let type_ref = self.type_ref()?;
            end = type_ref.range.end();
            ty = Some(type_ref);
        }
        Some(PropertyDef {
            name: name.text(self.text).to_string(),
            name_range: name.range,
            mutable,
            ty,
            range: TextRange::new(kw.range.start(), end),
        })
    }

    fn type_ref(&mut self) -> Option<TypeRef> {
        let first = self.expect(TokenKind::Ident, "type name")?;
        let mut segments = vec![first.text(self.text).to_string()];
        let mut end = first.range.end();
        while self.at(TokenKind::Dot) {
            self.bump();
            let segment = self.expect(TokenKind::Ident, "type segment")?;
            end = segment.range.end();
            segments.push(segment.text(self.text).to_string());
        }
        Some(TypeRef {
            segments,
            range: TextRange::new(first.range.start(), end),
        })
    }

    fn current(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current().is_some_and(|it| it.kind == kind)
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos];
        self.pos += 1;
        token
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Option<Token> {
        match self.current() {
            Some(token) if token.kind == kind => Some(self.bump()),
            Some(token) => {
                self.errors
                    .push(SyntaxError::new(format!("expected {what}"), token.range));
                None
            }
            None => {
                self.error_at_eof(&format!("expected {what}"));
                None
            }
        }
    }

    fn error_and_bump(&mut self, message: &str) {
        let token = self.bump();
        self.errors.push(SyntaxError::new(message, token.range));
    }

    fn error_at_eof(&mut self, message: &str) {
        let offset = TextSize::of(self.text);
        self.errors.push(SyntaxError::new_at_offset(message, offset));
    }
}
