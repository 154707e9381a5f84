//! Reads generated artifacts back into table form.
//!
//! This is not a C parser. It recognizes exactly the shapes the emitter
//! writes: the table typedef in the header, and the function-pointer and
//! name arrays in the definitions file. Everything else is skipped.

use std::collections::BTreeMap;

use logos::{FilterResult, Lexer, Logos};

use crate::catalog::{Coordinate, COORDINATE_COUNT};
use crate::error::{DispatchError, DispatchResult};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"#[^\n]*")]
enum Token {
    #[token("/*", skip_block_comment)]
    BlockComment,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,

    #[regex(r"[0-9][0-9A-Za-z_]*")]
    Number,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("*")]
    Star,

    #[token(",")]
    Comma,

    #[token(";")]
    Semi,

    #[token("=")]
    Eq,

    #[regex(r"[&|!<>+\-.%/^~?:']")]
    Other,
}

/// Skips to the end of a `/* ... */` comment.
fn skip_block_comment(lex: &mut Lexer<Token>) -> FilterResult<(), ()> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            FilterResult::Skip
        }
        None => FilterResult::Error(()),
    }
}

/// The table typedef recovered from the declarations header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableShape {
    pub name: String,
    /// Dimension symbols, outermost first.
    pub dimensions: Vec<String>,
}

/// A four-dimensional array recovered from the definitions file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadTable {
    pub name: String,
    pub dimensions: Vec<String>,
    /// Populated cells; `NULL` and `""` cells are omitted.
    pub cells: BTreeMap<Coordinate, String>,
}

/// Every table found in a definitions file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Definitions {
    pub function_tables: Vec<ReadTable>,
    pub name_tables: Vec<ReadTable>,
}

impl Definitions {
    pub fn function_table(&self, name: &str) -> Option<&ReadTable> {
        self.function_tables.iter().find(|table| table.name == name)
    }

    pub fn name_table(&self, name: &str) -> Option<&ReadTable> {
        self.name_tables.iter().find(|table| table.name == name)
    }
}

/// Reads the typedef from a declarations header.
pub fn read_declarations(source: &str) -> DispatchResult<TableShape> {
    let mut cursor = Cursor::new(source)?;

    while !cursor.at_end() {
        if cursor.is_keyword("typedef") {
            cursor.bump();
            cursor.expect_keyword("void")?;
            cursor.expect(Token::LParen)?;
            cursor.expect(Token::Star)?;
            let name = cursor.expect(Token::Ident)?.to_string();
            let dimensions = cursor.dimensions()?;
            cursor.expect(Token::RParen)?;
            cursor.expect(Token::Semi)?;
            return Ok(TableShape { name, dimensions });
        }
        cursor.bump();
    }

    Err(DispatchError::Artifact("no table typedef found".to_string()))
}

/// Reads every function table and name table from a definitions file.
pub fn read_definitions(source: &str) -> DispatchResult<Definitions> {
    let mut cursor = Cursor::new(source)?;
    let mut definitions = Definitions::default();

    while !cursor.at_end() {
        // void (*name[..][..][..][..])(Context *) = { ... };
        if cursor.is_keyword("void") && cursor.peek_kind(1) == Some(Token::LParen) {
            cursor.bump();
            cursor.expect(Token::LParen)?;
            cursor.expect(Token::Star)?;
            let name = cursor.expect(Token::Ident)?.to_string();
            let dimensions = cursor.dimensions()?;
            cursor.expect(Token::RParen)?;
            cursor.expect(Token::LParen)?;
            cursor.expect(Token::Ident)?;
            cursor.expect(Token::Star)?;
            cursor.expect(Token::RParen)?;
            cursor.expect(Token::Eq)?;
            let raw = cursor.initializer(Token::Ident)?;
            let cells = place_cells(&name, raw, |cell| (cell != "NULL").then_some(cell))?;
            definitions.function_tables.push(ReadTable {
                name,
                dimensions,
                cells,
            });
            continue;
        }

        // char *name[..][..][..][..] = { ... };
        if cursor.is_keyword("char")
            && cursor.peek_kind(1) == Some(Token::Star)
            && cursor.peek_kind(3) == Some(Token::LBracket)
        {
            cursor.bump();
            cursor.expect(Token::Star)?;
            let name = cursor.expect(Token::Ident)?.to_string();
            let dimensions = cursor.dimensions()?;
            cursor.expect(Token::Eq)?;
            let raw = cursor.initializer(Token::Str)?;
            let cells = place_cells(&name, raw, |cell| {
                let inner = &cell[1..cell.len() - 1];
                (!inner.is_empty()).then_some(inner)
            })?;
            definitions.name_tables.push(ReadTable {
                name,
                dimensions,
                cells,
            });
            continue;
        }

        cursor.bump();
    }

    Ok(definitions)
}

/// Maps flattened initializer cells back onto coordinates.
fn place_cells<'s>(
    table: &str,
    raw: Vec<&'s str>,
    value: impl Fn(&'s str) -> Option<&'s str>,
) -> DispatchResult<BTreeMap<Coordinate, String>> {
    if raw.len() != COORDINATE_COUNT {
        return Err(DispatchError::Artifact(format!(
            "table {} has {} cells, expected {}",
            table,
            raw.len(),
            COORDINATE_COUNT
        )));
    }

    let mut cells = BTreeMap::new();
    for (index, cell) in raw.into_iter().enumerate() {
        if let (Some(coord), Some(name)) = (Coordinate::from_flat_index(index), value(cell)) {
            cells.insert(coord, name.to_string());
        }
    }
    Ok(cells)
}

struct Cursor<'s> {
    tokens: Vec<(Token, &'s str)>,
    pos: usize,
}

impl<'s> Cursor<'s> {
    fn new(source: &'s str) -> DispatchResult<Self> {
        let mut lexer = Token::lexer(source);
        let mut tokens = Vec::new();
        while let Some(token) = lexer.next() {
            match token {
                Ok(token) => tokens.push((token, lexer.slice())),
                Err(()) => {
                    return Err(DispatchError::Artifact(format!(
                        "unexpected input {:?} at byte {}",
                        lexer.slice(),
                        lexer.span().start
                    )))
                }
            }
        }
        Ok(Self { tokens, pos: 0 })
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn peek_kind(&self, ahead: usize) -> Option<Token> {
        self.tokens.get(self.pos + ahead).map(|(kind, _)| *kind)
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.tokens.get(self.pos), Some((Token::Ident, text)) if *text == word)
    }

    fn expect(&mut self, kind: Token) -> DispatchResult<&'s str> {
        match self.tokens.get(self.pos) {
            Some((found, text)) if *found == kind => {
                self.pos += 1;
                Ok(*text)
            }
            Some((found, text)) => Err(DispatchError::Artifact(format!(
                "expected {:?}, found {:?} `{}`",
                kind, found, text
            ))),
            None => Err(DispatchError::Artifact(format!(
                "expected {:?}, found end of input",
                kind
            ))),
        }
    }

    fn expect_keyword(&mut self, word: &str) -> DispatchResult<()> {
        if self.is_keyword(word) {
            self.bump();
            Ok(())
        } else {
            Err(DispatchError::Artifact(format!("expected `{}`", word)))
        }
    }

    /// `[A][B][C][D]`
    fn dimensions(&mut self) -> DispatchResult<Vec<String>> {
        let mut dimensions = Vec::new();
        while self.peek_kind(0) == Some(Token::LBracket) {
            self.bump();
            dimensions.push(self.expect(Token::Ident)?.to_string());
            self.expect(Token::RBracket)?;
        }
        if dimensions.len() != 4 {
            return Err(DispatchError::Artifact(format!(
                "expected 4 dimensions, found {}",
                dimensions.len()
            )));
        }
        Ok(dimensions)
    }

    /// A brace initializer followed by `;`, returning its leaf cells.
    fn initializer(&mut self, cell: Token) -> DispatchResult<Vec<&'s str>> {
        self.expect(Token::LBrace)?;
        let mut depth = 1usize;
        let mut cells = Vec::new();

        while depth > 0 {
            let Some((kind, text)) = self.tokens.get(self.pos).copied() else {
                return Err(DispatchError::Artifact("unterminated initializer".to_string()));
            };
            self.pos += 1;
            match kind {
                Token::LBrace => depth += 1,
                Token::RBrace => depth -= 1,
                Token::Comma => {}
                k if k == cell => cells.push(text),
                other => {
                    return Err(DispatchError::Artifact(format!(
                        "unexpected {:?} `{}` in initializer",
                        other, text
                    )))
                }
            }
        }

        self.expect(Token::Semi)?;
        Ok(cells)
    }
}
