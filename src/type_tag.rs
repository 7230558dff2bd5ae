//! Parser for textual Move types such as `0x2::coin::Coin<0x2::iota::IOTA>`.
//!
//! Supports the primitives (`bool`, `u8`..`u256`, `address`, `signer`),
//! `vector<T>` and struct types with arbitrarily nested type arguments.

use crate::bcs::MAX_CONTAINER_DEPTH;
use crate::error::BuilderError;
use crate::types::{Address, StructTag, TypeTag};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Name(String),
    ColonColon,
    Lt,
    Gt,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, BuilderError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '<' => tokens.push(Token::Lt),
            '>' => tokens.push(Token::Gt),
            ',' => tokens.push(Token::Comma),
            ':' => match chars.next() {
                Some((_, ':')) => tokens.push(Token::ColonColon),
                _ => {
                    return Err(BuilderError::InvalidTypeTag(format!(
                        "{input}: stray ':' at {i}"
                    )))
                }
            },
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut name = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(name));
            }
            other => {
                return Err(BuilderError::InvalidTypeTag(format!(
                    "{input}: unexpected character {other:?} at {i}"
                )))
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self, BuilderError> {
        Ok(Self {
            input,
            tokens: tokenize(input)?,
            pos: 0,
            depth: 0,
        })
    }

    fn error(&self, msg: &str) -> BuilderError {
        BuilderError::InvalidTypeTag(format!("{}: {msg}", self.input))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: Token) -> Result<(), BuilderError> {
        match self.next() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(self.error(&format!("expected {expected:?}, found {tok:?}"))),
            None => Err(self.error(&format!("expected {expected:?}, found end of input"))),
        }
    }

    fn name(&mut self) -> Result<String, BuilderError> {
        match self.next() {
            Some(Token::Name(name)) => Ok(name),
            Some(tok) => Err(self.error(&format!("expected a name, found {tok:?}"))),
            None => Err(self.error("expected a name, found end of input")),
        }
    }

    fn finish(&self) -> Result<(), BuilderError> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(self.error(&format!("unexpected trailing {tok:?}"))),
        }
    }

    fn type_tag(&mut self) -> Result<TypeTag, BuilderError> {
        self.depth += 1;
        if self.depth > MAX_CONTAINER_DEPTH {
            return Err(self.error(&format!("nested deeper than {MAX_CONTAINER_DEPTH}")));
        }
        let tag = self.type_tag_inner()?;
        self.depth -= 1;
        Ok(tag)
    }

    fn type_tag_inner(&mut self) -> Result<TypeTag, BuilderError> {
        let head = self.name()?;
        let tag = match head.as_str() {
            "bool" => TypeTag::Bool,
            "u8" => TypeTag::U8,
            "u16" => TypeTag::U16,
            "u32" => TypeTag::U32,
            "u64" => TypeTag::U64,
            "u128" => TypeTag::U128,
            "u256" => TypeTag::U256,
            "address" => TypeTag::Address,
            "signer" => TypeTag::Signer,
            "vector" => {
                self.expect(Token::Lt)?;
                let inner = self.type_tag()?;
                self.expect(Token::Gt)?;
                TypeTag::Vector(Box::new(inner))
            }
            _ => TypeTag::Struct(Box::new(self.struct_tag(&head)?)),
        };
        Ok(tag)
    }

    fn struct_tag(&mut self, address: &str) -> Result<StructTag, BuilderError> {
        let address = parse_address_literal(address).map_err(|_| self.error("invalid address"))?;
        self.expect(Token::ColonColon)?;
        let module = identifier(self.name()?)?;
        self.expect(Token::ColonColon)?;
        let name = identifier(self.name()?)?;

        let mut type_params = Vec::new();
        if self.peek() == Some(&Token::Lt) {
            self.next();
            loop {
                type_params.push(self.type_tag()?);
                match self.next() {
                    Some(Token::Comma) => continue,
                    Some(Token::Gt) => break,
                    _ => return Err(self.error("unterminated type argument list")),
                }
            }
        }

        Ok(StructTag {
            address,
            module,
            name,
            type_params,
        })
    }
}

/// Addresses in type strings must carry the `0x` prefix.
fn parse_address_literal(s: &str) -> Result<Address, BuilderError> {
    if !s.starts_with("0x") && !s.starts_with("0X") {
        return Err(BuilderError::InvalidAddress(s.to_string()));
    }
    s.parse()
}

/// Move identifiers: `[A-Za-z][A-Za-z0-9_]*` or `_` followed by at least
/// one `[A-Za-z0-9_]`.
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        Some('_') => {
            let rest = chars.as_str();
            !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

pub(crate) fn identifier(s: String) -> Result<String, BuilderError> {
    if is_valid_identifier(&s) {
        Ok(s)
    } else {
        Err(BuilderError::InvalidIdentifier(s))
    }
}

/// Parse a textual Move type.
pub fn parse_type_tag(s: &str) -> Result<TypeTag, BuilderError> {
    let mut parser = Parser::new(s)?;
    let tag = parser.type_tag()?;
    parser.finish()?;
    Ok(tag)
}

/// Parse a struct type, rejecting primitives and vectors.
pub fn parse_struct_tag(s: &str) -> Result<StructTag, BuilderError> {
    match parse_type_tag(s)? {
        TypeTag::Struct(tag) => Ok(*tag),
        other => Err(BuilderError::InvalidTypeTag(format!(
            "{s}: expected a struct type, found {other}"
        ))),
    }
}

/// Split `package::module::function` into its parts.
pub fn parse_move_call_target(target: &str) -> Result<(Address, String, String), BuilderError> {
    let parts: Vec<&str> = target.trim().split("::").collect();
    let [package, module, function] = parts.as_slice() else {
        return Err(BuilderError::InvalidTarget(target.to_string()));
    };
    let package = package
        .parse()
        .map_err(|_| BuilderError::InvalidTarget(target.to_string()))?;
    Ok((
        package,
        identifier((*module).to_string())?,
        identifier((*function).to_string())?,
    ))
}
