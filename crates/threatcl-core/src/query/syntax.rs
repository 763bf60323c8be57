//! GraphQL subset: tokenizer, AST, and recursive-descent parser.
//!
//! Only executable query documents are accepted. Fragments, mutations,
//! subscriptions and directives are rejected at parse time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Line/column of a token, both 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A syntax error with the position it was detected at
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    pub pos: Pos,
}

impl SyntaxError {
    fn new(message: impl Into<String>, pos: Pos) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }
}

type ParseResult<T> = std::result::Result<T, SyntaxError>;

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: Option<String>,
    pub variables: Vec<VariableDefinition>,
    pub selection: Vec<Field>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    pub name: String,
    pub ty: TypeRef,
    pub default: Option<Value>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: Vec<(String, Value)>,
    pub selection: Option<Vec<Field>>,
    pub pos: Pos,
}

impl Field {
    /// Key this field is written under in the response
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Variable(String),
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Enum(String),
    List(Vec<Value>),
    Object(Vec<(String, Value)>),
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Punct(char),
    Spread,
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Punct(c) => write!(f, "\"{c}\""),
            Self::Spread => write!(f, "\"...\""),
            Self::Name(name) => write!(f, "Name \"{name}\""),
            Self::Int(v) => write!(f, "Int \"{v}\""),
            Self::Float(v) => write!(f, "Float \"{v}\""),
            Self::Str(s) => write!(f, "String {s:?}"),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    pos: Pos,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn pos(&self) -> Pos {
        Pos {
            line: self.line,
            column: self.column,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn tokenize(mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            let pos = self.pos();
            match c {
                // Commas and the BOM are insignificant
                ' ' | '\t' | '\n' | '\r' | ',' | '\u{feff}' => {
                    self.bump();
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '{' | '}' | '(' | ')' | '[' | ']' | ':' | '!' | '$' | '=' | '@' | '|' | '&' => {
                    self.bump();
                    tokens.push(Token {
                        kind: TokenKind::Punct(c),
                        pos,
                    });
                }
                '.' => {
                    for _ in 0..3 {
                        if self.bump() != Some('.') {
                            return Err(SyntaxError::new("Unexpected \".\"", pos));
                        }
                    }
                    tokens.push(Token {
                        kind: TokenKind::Spread,
                        pos,
                    });
                }
                '"' => {
                    let s = self.string(pos)?;
                    tokens.push(Token {
                        kind: TokenKind::Str(s),
                        pos,
                    });
                }
                '-' | '0'..='9' => {
                    let kind = self.number(pos)?;
                    tokens.push(Token { kind, pos });
                }
                c if c == '_' || c.is_ascii_alphabetic() => {
                    let mut name = String::new();
                    while let Some(c) = self.peek() {
                        if c == '_' || c.is_ascii_alphanumeric() {
                            name.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    tokens.push(Token {
                        kind: TokenKind::Name(name),
                        pos,
                    });
                }
                other => {
                    return Err(SyntaxError::new(
                        format!("Unexpected character {other:?}"),
                        pos,
                    ));
                }
            }
        }

        Ok(tokens)
    }

    fn string(&mut self, start: Pos) -> ParseResult<String> {
        self.bump();
        if self.peek() == Some('"') {
            self.bump();
            if self.peek() == Some('"') {
                self.bump();
                return self.block_string(start);
            }
            return Ok(String::new());
        }

        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(SyntaxError::new("Unterminated string", start)),
                Some('"') => return Ok(out),
                Some('\\') => {
                    let escape_pos = self.pos();
                    match self.bump() {
                        Some('"') => out.push('"'),
                        Some('\\') => out.push('\\'),
                        Some('/') => out.push('/'),
                        Some('b') => out.push('\u{8}'),
                        Some('f') => out.push('\u{c}'),
                        Some('n') => out.push('\n'),
                        Some('r') => out.push('\r'),
                        Some('t') => out.push('\t'),
                        Some('u') => {
                            let mut hex = String::new();
                            for _ in 0..4 {
                                match self.bump() {
                                    Some(h) if h.is_ascii_hexdigit() => hex.push(h),
                                    _ => {
                                        return Err(SyntaxError::new(
                                            "Invalid Unicode escape sequence",
                                            escape_pos,
                                        ))
                                    }
                                }
                            }
                            let ch = u32::from_str_radix(&hex, 16)
                                .ok()
                                .and_then(char::from_u32)
                                .ok_or_else(|| {
                                    SyntaxError::new("Invalid Unicode escape sequence", escape_pos)
                                })?;
                            out.push(ch);
                        }
                        _ => {
                            return Err(SyntaxError::new(
                                "Invalid character escape sequence",
                                escape_pos,
                            ))
                        }
                    }
                }
                Some(c) => out.push(c),
            }
        }
    }

    /// `"""..."""`; common indentation is stripped like GraphQL block strings
    fn block_string(&mut self, start: Pos) -> ParseResult<String> {
        let mut raw = String::new();
        let mut quotes = 0;
        loop {
            match self.bump() {
                None => return Err(SyntaxError::new("Unterminated string", start)),
                Some('"') => {
                    quotes += 1;
                    if quotes == 3 {
                        // \""" is an escaped triple quote
                        if raw.ends_with('\\') {
                            raw.pop();
                            raw.push_str("\"\"\"");
                            quotes = 0;
                        } else {
                            return Ok(dedent_block(&raw));
                        }
                    }
                }
                Some(c) => {
                    for _ in 0..quotes {
                        raw.push('"');
                    }
                    quotes = 0;
                    raw.push(c);
                }
            }
        }
    }

    fn number(&mut self, start: Pos) -> ParseResult<TokenKind> {
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.bump();
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => text.push(c),
                '.' | 'e' | 'E' => {
                    is_float = true;
                    text.push(c);
                }
                '+' | '-' if text.ends_with(['e', 'E']) => text.push(c),
                _ => break,
            }
            self.bump();
        }
        if let Some(c) = self.peek() {
            if c == '_' || c.is_ascii_alphabetic() {
                return Err(SyntaxError::new(
                    format!("Invalid number, unexpected character {c:?}"),
                    start,
                ));
            }
        }

        let invalid = || SyntaxError::new(format!("Invalid number {text:?}"), start);
        if is_float {
            text.parse::<f64>().map(TokenKind::Float).map_err(|_| invalid())
        } else {
            text.parse::<i64>().map(TokenKind::Int).map_err(|_| invalid())
        }
    }
}

fn dedent_block(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let indent = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(i, l)| if i == 0 { *l } else { l.get(indent..).unwrap_or("") })
        .collect();
    while out.first().is_some_and(|l| l.trim().is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }
    out.join("\n")
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Deepest nesting of selection sets, list/object literals and list types
pub const MAX_DEPTH: usize = 64;

/// Parse a query document
pub fn parse(input: &str) -> ParseResult<Document> {
    let tokens = Lexer::new(input).tokenize()?;
    let end = tokens.last().map(|t| t.pos).unwrap_or(Pos { line: 1, column: 1 });
    let mut parser = Parser {
        tokens,
        index: 0,
        end,
        depth: 0,
    };
    parser.document()
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
    end: Pos,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn peek_pos(&self) -> Pos {
        self.peek().map(|t| t.pos).unwrap_or(self.end)
    }

    fn next(&mut self) -> ParseResult<Token> {
        let token = self
            .tokens
            .get(self.index)
            .cloned()
            .ok_or_else(|| SyntaxError::new("Unexpected <EOF>", self.end))?;
        self.index += 1;
        Ok(token)
    }

    fn peek_is(&self, c: char) -> bool {
        matches!(self.peek(), Some(Token { kind: TokenKind::Punct(p), .. }) if *p == c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek_is(c) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> ParseResult<Pos> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Punct(p) if p == c => Ok(token.pos),
            other => Err(SyntaxError::new(
                format!("Expected \"{c}\", found {other}"),
                token.pos,
            )),
        }
    }

    fn name(&mut self) -> ParseResult<(String, Pos)> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Name(name) => Ok((name, token.pos)),
            other => Err(SyntaxError::new(
                format!("Expected Name, found {other}"),
                token.pos,
            )),
        }
    }

    fn descend(&mut self, pos: Pos) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(SyntaxError::new("Query nested too deeply", pos));
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    fn reject_directives(&self) -> ParseResult<()> {
        if self.peek_is('@') {
            return Err(SyntaxError::new(
                "Directives are not supported",
                self.peek_pos(),
            ));
        }
        Ok(())
    }

    fn document(&mut self) -> ParseResult<Document> {
        let mut operations = Vec::new();
        while let Some(token) = self.peek() {
            let pos = token.pos;
            match token.kind.clone() {
                TokenKind::Punct('{') => {
                    let selection = self.selection_set()?;
                    operations.push(Operation {
                        name: None,
                        variables: Vec::new(),
                        selection,
                        pos,
                    });
                }
                TokenKind::Name(keyword) => match keyword.as_str() {
                    "query" => {
                        self.index += 1;
                        operations.push(self.operation(pos)?);
                    }
                    "mutation" | "subscription" => {
                        return Err(SyntaxError::new(
                            format!("{keyword} operations are not supported"),
                            pos,
                        ))
                    }
                    "fragment" => {
                        return Err(SyntaxError::new("Fragments are not supported", pos))
                    }
                    other => {
                        return Err(SyntaxError::new(
                            format!("Unexpected Name \"{other}\""),
                            pos,
                        ))
                    }
                },
                other => {
                    return Err(SyntaxError::new(format!("Unexpected {other}"), pos));
                }
            }
        }

        if operations.is_empty() {
            return Err(SyntaxError::new("Unexpected <EOF>", self.end));
        }
        Ok(Document { operations })
    }

    fn operation(&mut self, pos: Pos) -> ParseResult<Operation> {
        let name = match self.peek() {
            Some(Token {
                kind: TokenKind::Name(_),
                ..
            }) => Some(self.name()?.0),
            _ => None,
        };

        let mut variables = Vec::new();
        if self.eat('(') {
            while !self.eat(')') {
                variables.push(self.variable_definition()?);
            }
        }
        self.reject_directives()?;
        let selection = self.selection_set()?;

        Ok(Operation {
            name,
            variables,
            selection,
            pos,
        })
    }

    fn variable_definition(&mut self) -> ParseResult<VariableDefinition> {
        let pos = self.expect('$')?;
        let (name, _) = self.name()?;
        self.expect(':')?;
        let ty = self.type_ref()?;
        let default = if self.eat('=') {
            Some(self.value(true)?)
        } else {
            None
        };
        self.reject_directives()?;
        Ok(VariableDefinition {
            name,
            ty,
            default,
            pos,
        })
    }

    fn type_ref(&mut self) -> ParseResult<TypeRef> {
        let pos = self.peek_pos();
        let inner = if self.eat('[') {
            self.descend(pos)?;
            let inner = self.type_ref()?;
            self.expect(']')?;
            self.ascend();
            TypeRef::List(Box::new(inner))
        } else {
            TypeRef::Named(self.name()?.0)
        };
        if self.eat('!') {
            Ok(TypeRef::NonNull(Box::new(inner)))
        } else {
            Ok(inner)
        }
    }

    fn selection_set(&mut self) -> ParseResult<Vec<Field>> {
        let open = self.expect('{')?;
        self.descend(open)?;
        let mut fields = Vec::new();
        while !self.eat('}') {
            match self.peek() {
                None => return Err(SyntaxError::new("Unexpected <EOF>", self.end)),
                Some(Token {
                    kind: TokenKind::Spread,
                    pos,
                }) => {
                    return Err(SyntaxError::new("Fragments are not supported", *pos));
                }
                _ => fields.push(self.field()?),
            }
        }
        if fields.is_empty() {
            return Err(SyntaxError::new("Selection set must not be empty", open));
        }
        self.ascend();
        Ok(fields)
    }

    fn field(&mut self) -> ParseResult<Field> {
        let (first, pos) = self.name()?;
        let (alias, name) = if self.eat(':') {
            (Some(first), self.name()?.0)
        } else {
            (None, first)
        };

        let mut arguments = Vec::new();
        if self.eat('(') {
            while !self.eat(')') {
                let (arg, arg_pos) = self.name()?;
                self.expect(':')?;
                let value = self.value(false)?;
                if arguments.iter().any(|(existing, _)| *existing == arg) {
                    return Err(SyntaxError::new(
                        format!("There can be only one argument named \"{arg}\""),
                        arg_pos,
                    ));
                }
                arguments.push((arg, value));
            }
        }
        self.reject_directives()?;

        let selection = if self.peek_is('{') {
            Some(self.selection_set()?)
        } else {
            None
        };

        Ok(Field {
            alias,
            name,
            arguments,
            selection,
            pos,
        })
    }

    fn value(&mut self, constant: bool) -> ParseResult<Value> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Punct('$') if !constant => Ok(Value::Variable(self.name()?.0)),
            TokenKind::Punct('$') => Err(SyntaxError::new(
                "Variables are not allowed in default values",
                token.pos,
            )),
            TokenKind::Int(v) => Ok(Value::Int(v)),
            TokenKind::Float(v) => Ok(Value::Float(v)),
            TokenKind::Str(s) => Ok(Value::String(s)),
            TokenKind::Name(name) => Ok(match name.as_str() {
                "true" => Value::Boolean(true),
                "false" => Value::Boolean(false),
                "null" => Value::Null,
                _ => Value::Enum(name),
            }),
            TokenKind::Punct('[') => {
                self.descend(token.pos)?;
                let mut items = Vec::new();
                while !self.eat(']') {
                    items.push(self.value(constant)?);
                }
                self.ascend();
                Ok(Value::List(items))
            }
            TokenKind::Punct('{') => {
                self.descend(token.pos)?;
                let mut entries = Vec::new();
                while !self.eat('}') {
                    let (key, _) = self.name()?;
                    self.expect(':')?;
                    entries.push((key, self.value(constant)?));
                }
                self.ascend();
                Ok(Value::Object(entries))
            }
            other => Err(SyntaxError::new(format!("Unexpected {other}"), token.pos)),
        }
    }
}
