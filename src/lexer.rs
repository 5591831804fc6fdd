//! PDF lexer (tokenizer).
//!
//! This module provides low-level tokenization of PDF byte streams.
//! It recognizes all PDF token types including numbers, strings, names,
//! keywords, and delimiters.
//!
//! # PDF Syntax Overview
//!
//! PDF uses a PostScript-like syntax with the following token types:
//! - Numbers: integers (42, -123) and reals (3.14, -2.5)
//! - Strings: literal ((Hello)) and hexadecimal (<48656C6C6F>)
//! - Names: identifiers starting with / (/Type, /Pages)
//! - Keywords: true, false, null, obj, endobj, stream, endstream, R
//! - Delimiters: `[`, `]`, `<<`, `>>`
//!
//! Whitespace (space, \t, \r, \n, \0, \f) and comments (% to EOL) are skipped.
//!
//! # Tolerance
//!
//! A run of regular characters that starts like a number but does not parse
//! as one (`--5`, `1.2.3`) becomes `Integer(0)`. Unterminated literal and hex
//! strings take the rest of the input as their body unless strict mode is
//! requested, in which case they fail with [`Error::MalformedToken`].
//!
//! [`Tokenizer`] wraps the nom parsers in a lazy, restartable iterator over a
//! byte buffer.

use crate::error::{Error, Result};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, map, opt, value},
    multi::many0,
    sequence::preceded,
    IResult,
};

/// Token types recognized by the PDF lexer.
///
/// Tokens are the atomic units of PDF syntax. The parser combines tokens
/// into higher-level objects (dictionaries, arrays, etc.).
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number (e.g., 42, -123)
    Integer(i64),

    /// Real (floating-point) number (e.g., 3.14, -2.5, .5)
    Real(f64),

    /// Literal string bytes (content of "(Hello)"), escapes not yet decoded
    LiteralString(&'a [u8]),

    /// Hexadecimal string digits (content of "<48656C6C6F>")
    HexString(&'a [u8]),

    /// Name (e.g., "Type" from "/Type"), `#XX` escapes decoded
    Name(String),

    /// Boolean true keyword
    True,

    /// Boolean false keyword
    False,

    /// Null keyword
    Null,

    /// Array start delimiter [
    ArrayStart,

    /// Array end delimiter ]
    ArrayEnd,

    /// Dictionary start delimiter <<
    DictStart,

    /// Dictionary end delimiter >>
    DictEnd,

    /// Indirect object start keyword "obj"
    ObjStart,

    /// Indirect object end keyword "endobj"
    ObjEnd,

    /// Stream start keyword "stream"
    StreamStart,

    /// Stream end keyword "endstream"
    StreamEnd,

    /// Reference keyword "R" (used in "10 0 R")
    R,

    /// Any other bare word (xref, trailer, startxref, content operators, braces)
    Keyword(&'a [u8]),
}

/// PDF whitespace: space, tab, CR, LF, NUL, form feed (ISO 32000-1, Table 1).
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

/// PDF delimiter characters (ISO 32000-1, Table 2).
pub fn is_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

/// Regular characters: neither whitespace nor delimiters.
pub fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

fn whitespace(input: &[u8]) -> IResult<&[u8], ()> {
    value((), take_while1(is_whitespace))(input)
}

/// Comments start with % and continue until CR or LF.
fn comment(input: &[u8]) -> IResult<&[u8], ()> {
    value((), preceded(char('%'), take_till(|c| c == b'\r' || c == b'\n')))(input)
}

/// Skip all whitespace and comments.
pub fn skip_ws(input: &[u8]) -> IResult<&[u8], ()> {
    value((), many0(alt((whitespace, comment))))(input)
}

/// Parse an integer or real number.
///
/// PDF numbers can be:
/// - Integers: 42, -123, +17
/// - Reals: 3.14, -2.5, .5, 0., -.002
fn parse_number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (input, sign) = opt(one_of("+-"))(input)?;
    let (input, int_part) = opt(digit1)(input)?;
    let (input, frac_part) = opt(preceded(char('.'), opt(digit1)))(input)?;

    // A lone sign, "." or "-." carries no digits
    if int_part.is_none() && !matches!(frac_part, Some(Some(_))) {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit)));
    }

    let negative = sign == Some('-');
    let int_str = int_part.map(ascii_str).unwrap_or("0");

    if let Some(frac) = frac_part {
        let frac_str = frac.map(ascii_str).unwrap_or("0");
        let num: f64 = format!("{}.{}", int_str, frac_str).parse().unwrap_or(0.0);
        Ok((input, Token::Real(if negative { -num } else { num })))
    } else {
        match int_str.parse::<i64>() {
            Ok(n) => Ok((input, Token::Integer(if negative { -n } else { n }))),
            Err(_) => {
                // Out of i64 range: keep the magnitude as a real
                let num: f64 = int_str.parse().unwrap_or(0.0);
                Ok((input, Token::Real(if negative { -num } else { num })))
            },
        }
    }
}

fn ascii_str(bytes: &[u8]) -> &str {
    std::str::from_utf8(bytes).unwrap_or("0")
}

/// Parse a run of regular characters: a number or a keyword.
///
/// Runs that look numeric but fail to parse are read as `Integer(0)`.
fn parse_regular(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, run) = take_while1(is_regular)(input)?;

    if matches!(run[0], b'0'..=b'9' | b'+' | b'-' | b'.') {
        return match all_consuming(parse_number)(run) {
            Ok((_, tok)) => Ok((rest, tok)),
            Err(_) => {
                log::debug!(
                    "Malformed number {:?}, reading as 0",
                    String::from_utf8_lossy(run)
                );
                Ok((rest, Token::Integer(0)))
            },
        };
    }

    let tok = match run {
        b"true" => Token::True,
        b"false" => Token::False,
        b"null" => Token::Null,
        b"obj" => Token::ObjStart,
        b"endobj" => Token::ObjEnd,
        b"stream" => Token::StreamStart,
        b"endstream" => Token::StreamEnd,
        b"R" => Token::R,
        other => Token::Keyword(other),
    };
    Ok((rest, tok))
}

/// Find the end of a literal string body, tracking nesting and escapes.
///
/// Returns the index of the closing parenthesis, if any.
fn literal_string_end(body: &[u8]) -> Option<usize> {
    let mut depth = 1;
    let mut pos = 0;

    while pos < body.len() {
        match body[pos] {
            b'\\' => {
                // Skip the escaped byte; octal digits are consumed as ordinary bytes
                pos += 2;
                continue;
            },
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos);
                }
            },
            _ => {},
        }
        pos += 1;
    }

    None
}

/// Parse a literal string enclosed in parentheses.
///
/// Literal strings can contain balanced nested parentheses and escape
/// sequences. Escapes are left in place and decoded by the parser.
fn parse_literal_string(input: &[u8], strict: bool) -> IResult<&[u8], Token<'_>> {
    let (body, _) = char('(')(input)?;

    match literal_string_end(body) {
        Some(end) => Ok((&body[end + 1..], Token::LiteralString(&body[..end]))),
        None if strict => {
            Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Char)))
        },
        None => {
            log::warn!("Unterminated literal string, taking {} remaining bytes", body.len());
            Ok((&body[body.len()..], Token::LiteralString(body)))
        },
    }
}

/// Parse a hexadecimal string enclosed in angle brackets.
///
/// Whitespace inside is ignored by the decoder; an odd digit count is padded with 0.
fn parse_hex_string(input: &[u8], strict: bool) -> IResult<&[u8], Token<'_>> {
    if input.starts_with(b"<<") {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }

    let (body, _) = char('<')(input)?;
    let (rest, digits) = take_while(|c: u8| c.is_ascii_hexdigit() || is_whitespace(c))(body)?;

    match rest.first() {
        Some(b'>') => Ok((&rest[1..], Token::HexString(digits))),
        Some(_) => Err(nom::Err::Error(nom::error::Error::new(rest, nom::error::ErrorKind::HexDigit))),
        None if strict => {
            Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Char)))
        },
        None => {
            log::warn!("Unterminated hex string, taking {} remaining bytes", digits.len());
            Ok((rest, Token::HexString(digits)))
        },
    }
}

/// Decode #XX escape sequences in PDF names.
///
/// PDF Spec: ISO 32000-1:2008, Section 7.3.5 - Name Objects
///
/// Decoded bytes that form valid UTF-8 are kept as such; anything else is
/// mapped byte-for-char (Latin-1).
///
/// # Examples
///
/// ```
/// # use pdf_press::lexer::decode_name_escapes;
/// assert_eq!(decode_name_escapes(b"A#20B#23C"), "A B#C");
/// assert_eq!(decode_name_escapes(b"Type"), "Type");
/// assert_eq!(decode_name_escapes(b"A#"), "A#"); // Invalid sequence preserved
/// ```
pub fn decode_name_escapes(raw: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            let (hi, lo) = (raw[i + 1], raw[i + 2]);
            if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() {
                bytes.push(hex_value(hi) << 4 | hex_value(lo));
                i += 3;
                continue;
            }
        }
        bytes.push(raw[i]);
        i += 1;
    }

    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => e.into_bytes().into_iter().map(char::from).collect(),
    }
}

fn hex_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

/// Parse a name starting with /.
///
/// Examples: /Type, /FontName, /A;Name_With-Various***Characters, /A#20B (A B)
fn parse_name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    preceded(char('/'), map(take_while(is_regular), |raw: &[u8]| Token::Name(decode_name_escapes(raw))))(
        input,
    )
}

fn parse_delimiter(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    alt((
        value(Token::DictStart, tag(b"<<")),
        value(Token::DictEnd, tag(b">>")),
        value(Token::ArrayStart, tag(b"[")),
        value(Token::ArrayEnd, tag(b"]")),
        map(alt((tag(b"{"), tag(b"}"))), Token::Keyword),
    ))(input)
}

fn token_with(input: &[u8], strict: bool) -> IResult<&[u8], Token<'_>> {
    let (input, _) = skip_ws(input)?;

    match input.first() {
        Some(b'(') => parse_literal_string(input, strict),
        Some(b'<') if !input.starts_with(b"<<") => parse_hex_string(input, strict),
        Some(b'/') => parse_name(input),
        _ => alt((parse_delimiter, parse_regular))(input),
    }
}

/// Parse a single PDF token, recovering from unterminated strings.
///
/// Skips whitespace and comments first.
///
/// # Errors
///
/// Returns `Err` if the input is exhausted or starts with a stray `)` or `>`.
pub fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    token_with(input, false)
}

/// Parse a single PDF token; unterminated strings are `nom::Err::Failure`.
pub fn token_strict(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    token_with(input, true)
}

/// Parse a single token with the given strictness.
pub fn token_opts(input: &[u8], strict: bool) -> IResult<&[u8], Token<'_>> {
    token_with(input, strict)
}

/// Lazy, restartable token iterator over a byte buffer.
///
/// The cursor can be queried with [`Tokenizer::position`] and moved with
/// [`Tokenizer::seek`], so a caller can rewind and re-read from any offset.
///
/// ```
/// use pdf_press::lexer::{Token, Tokenizer};
///
/// let mut tokens = Tokenizer::new(b"<< /Count 3 >>");
/// assert_eq!(tokens.next().unwrap().unwrap(), Token::DictStart);
/// let mark = tokens.position();
/// assert_eq!(tokens.next().unwrap().unwrap(), Token::Name("Count".into()));
/// tokens.seek(mark);
/// assert_eq!(tokens.next().unwrap().unwrap(), Token::Name("Count".into()));
/// ```
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    data: &'a [u8],
    pos: usize,
    strict: bool,
}

impl<'a> Tokenizer<'a> {
    /// Create a lenient tokenizer positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            strict: false,
        }
    }

    /// Enable or disable strict mode.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the cursor to `pos` (clamped to the buffer length).
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Read the next token.
    ///
    /// Returns `None` at end of input. In lenient mode an unrecognised byte is
    /// skipped; in strict mode it ends iteration with `MalformedToken`.
    pub fn next_token(&mut self) -> Option<Result<Token<'a>>> {
        loop {
            let input = self.remaining();
            let after_ws = match skip_ws(input) {
                Ok((rest, _)) => rest,
                Err(_) => input,
            };
            if after_ws.is_empty() {
                self.pos = self.data.len();
                return None;
            }
            let start = self.data.len() - after_ws.len();

            match token_with(after_ws, self.strict) {
                Ok((rest, tok)) => {
                    self.pos = self.data.len() - rest.len();
                    return Some(Ok(tok));
                },
                Err(nom::Err::Failure(_)) => {
                    self.pos = self.data.len();
                    return Some(Err(Error::MalformedToken {
                        offset: start,
                        reason: "unterminated string".to_string(),
                    }));
                },
                Err(_) if self.strict => {
                    self.pos = self.data.len();
                    return Some(Err(Error::MalformedToken {
                        offset: start,
                        reason: format!("unexpected byte 0x{:02x}", after_ws[0]),
                    }));
                },
                Err(_) => {
                    log::debug!("Skipping stray byte 0x{:02x} at {}", after_ws[0], start);
                    self.pos = start + 1;
                },
            }
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}
