//! PDF object parser.
//!
//! This module provides parsing of PDF objects by combining tokens from the lexer
//! into complete objects (arrays, dictionaries, indirect references, streams).
//!
//! # Architecture
//!
//! The parser uses a recursive descent approach:
//! 1. Read token from lexer
//! 2. Based on token type, decide how to parse
//! 3. For composite types (arrays, dicts), recursively parse contents
//!
//! # Error Handling
//!
//! The object parsers return `IResult` from nom. In lenient mode unclosed
//! containers end at EOF, stray keywords inside containers are skipped, and
//! a stream without `endstream` runs to `endobj` or the end of input. In
//! strict mode those conditions fail, and [`to_error`] maps the failure to
//! a byte offset.

use crate::error::Error;
use crate::lexer::{token_opts, Token};
use crate::object::{Dict, Object, ObjectRef};
use crate::parser_config::ParserOptions;
use nom::error::ErrorKind;
use nom::IResult;

/// Decode escape sequences in PDF literal strings.
///
/// PDF literal strings (enclosed in parentheses) support escape sequences
/// per ISO 32000-1:2008, Section 7.3.4.2:
///
/// - `\n`, `\r`, `\t`, `\b`, `\f` → control characters
/// - `\(`, `\)`, `\\` → the literal character
/// - `\ddd` → Character with octal code (1-3 digits)
/// - `\<newline>` → Line continuation (ignored)
///
/// An end-of-line inside the string (CR, LF or CRLF) reads as a single LF.
///
/// # Examples
///
/// ```
/// # use pdf_press::parser::decode_literal_string_escapes;
/// let decoded = decode_literal_string_escapes(b"Section \\247 71.01");
/// assert_eq!(decoded, b"Section \xa7 71.01");
/// ```
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        match raw[i] {
            b'\\' if i + 1 < raw.len() => {
                let next = raw[i + 1];
                i += 2;
                match next {
                    b'n' => result.push(b'\n'),
                    b'r' => result.push(b'\r'),
                    b't' => result.push(b'\t'),
                    b'b' => result.push(0x08),
                    b'f' => result.push(0x0C),
                    b'(' | b')' | b'\\' => result.push(next),
                    b'\n' => {},
                    b'\r' => {
                        if raw.get(i) == Some(&b'\n') {
                            i += 1;
                        }
                    },
                    b'0'..=b'7' => {
                        let mut value = (next - b'0') as u32;
                        let mut digits = 1;
                        while digits < 3 {
                            match raw.get(i) {
                                Some(&d @ b'0'..=b'7') => {
                                    value = value * 8 + (d - b'0') as u32;
                                    i += 1;
                                    digits += 1;
                                },
                                _ => break,
                            }
                        }
                        result.push((value & 0xFF) as u8);
                    },
                    // Unknown escape: the backslash is dropped
                    other => result.push(other),
                }
            },
            b'\\' => i += 1,
            b'\r' => {
                result.push(b'\n');
                i += 1;
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            c => {
                result.push(c);
                i += 1;
            },
        }
    }

    result
}

/// Parse a PDF object from input bytes in lenient mode.
///
/// Handles all PDF object types:
/// - Primitives: null, boolean, integer, real, string, name
/// - Composites: array, dictionary, stream
/// - References: indirect object references (10 0 R)
///
/// # Example
///
/// ```
/// use pdf_press::parser::parse_object;
///
/// let (_, obj) = parse_object(b"[ 1 2 /Name ]").unwrap();
/// assert_eq!(obj.as_array().map(|a| a.len()), Some(3));
/// ```
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    parse_object_with(input, &ParserOptions::default())
}

/// Parse a PDF object with explicit parser options.
pub fn parse_object_with<'a>(input: &'a [u8], options: &ParserOptions) -> IResult<&'a [u8], Object> {
    parse_value(input, options, 0)
}

fn parse_value<'a>(input: &'a [u8], options: &ParserOptions, depth: usize) -> IResult<&'a [u8], Object> {
    let (input, tok) = token_opts(input, options.strict)?;

    match tok {
        Token::Null => Ok((input, Object::Null)),
        Token::True => Ok((input, Object::Boolean(true))),
        Token::False => Ok((input, Object::Boolean(false))),

        Token::Integer(i) => {
            // "obj gen R" is a reference; anything else leaves the integer alone
            if let Ok((input2, Token::Integer(gen))) = token_opts(input, false) {
                if let Ok((input3, Token::R)) = token_opts(input2, false) {
                    if (0..=u32::MAX as i64).contains(&i) && (0..=u16::MAX as i64).contains(&gen) {
                        return Ok((input3, Object::Reference(ObjectRef::new(i as u32, gen as u16))));
                    }
                    log::debug!("Out-of-range reference {} {} R read as null", i, gen);
                    return Ok((input3, Object::Null));
                }
            }
            Ok((input, Object::Integer(i)))
        },

        Token::Real(r) => Ok((input, Object::Real(r))),
        Token::LiteralString(bytes) => Ok((input, Object::String(decode_literal_string_escapes(bytes)))),
        Token::HexString(hex) => Ok((input, Object::String(decode_hex(hex)))),
        Token::Name(name) => Ok((input, Object::Name(name))),
        Token::ArrayStart => parse_array(input, options, depth + 1),

        Token::DictStart => {
            let (remaining, dict) = parse_dictionary(input, options, depth + 1)?;

            if let Ok((stream_input, Token::StreamStart)) = token_opts(remaining, false) {
                let (final_input, data) = parse_stream_data(stream_input, &dict, options)?;
                return Ok((final_input, Object::stream(dict, data)));
            }

            Ok((remaining, Object::Dictionary(dict)))
        },

        _ => Err(nom::Err::Error(nom::error::Error::new(input, ErrorKind::Tag))),
    }
}

fn nesting_check<'a>(input: &'a [u8], options: &ParserOptions, depth: usize) -> IResult<&'a [u8], ()> {
    if depth > options.max_nesting {
        return Err(nom::Err::Failure(nom::error::Error::new(input, ErrorKind::TooLarge)));
    }
    Ok((input, ()))
}

/// Parse a PDF array body after `[`.
fn parse_array<'a>(input: &'a [u8], options: &ParserOptions, depth: usize) -> IResult<&'a [u8], Object> {
    nesting_check(input, options, depth)?;
    let mut objects = Vec::new();
    let mut remaining = input;

    loop {
        match token_opts(remaining, options.strict) {
            Ok((inp, Token::ArrayEnd)) => return Ok((inp, Object::Array(objects))),
            Ok((inp, Token::Keyword(word))) if !options.strict => {
                log::debug!("Skipping keyword {:?} inside array", String::from_utf8_lossy(word));
                remaining = inp;
            },
            Ok(_) => {
                let (inp, obj) = parse_value(remaining, options, depth)?;
                objects.push(obj);
                remaining = inp;
            },
            Err(nom::Err::Error(_)) if !options.strict && at_eof(remaining) => {
                log::debug!("Unclosed array at EOF, keeping {} elements", objects.len());
                return Ok((&remaining[remaining.len()..], Object::Array(objects)));
            },
            Err(e) => return Err(e),
        }
    }
}

/// Parse a PDF dictionary body after `<<`.
///
/// Keys must be names. In lenient mode a key without a value is dropped and
/// non-name tokens in key position are skipped.
fn parse_dictionary<'a>(input: &'a [u8], options: &ParserOptions, depth: usize) -> IResult<&'a [u8], Dict> {
    nesting_check(input, options, depth)?;
    let mut dict = Dict::new();
    let mut remaining = input;

    loop {
        match token_opts(remaining, options.strict) {
            Ok((inp, Token::DictEnd)) => return Ok((inp, dict)),
            Ok((inp, Token::Name(key))) => {
                if let Ok((_, Token::DictEnd)) = token_opts(inp, false) {
                    if options.strict {
                        return Err(nom::Err::Error(nom::error::Error::new(inp, ErrorKind::Tag)));
                    }
                    log::debug!("Dictionary key /{} has no value, dropping it", key);
                    remaining = inp;
                    continue;
                }
                match parse_value(inp, options, depth) {
                    Ok((inp, value)) => {
                        dict.insert(key, value);
                        remaining = inp;
                    },
                    Err(nom::Err::Error(_)) if !options.strict && at_eof(inp) => {
                        return Ok((&inp[inp.len()..], dict));
                    },
                    Err(nom::Err::Error(_)) if !options.strict => {
                        // Unparseable value: skip one token and carry on
                        let (inp, _) = token_opts(inp, false)?;
                        remaining = inp;
                    },
                    Err(e) => return Err(e),
                }
            },
            Ok((inp, other)) if !options.strict => {
                log::debug!("Skipping non-name dictionary key {:?}", other);
                remaining = inp;
            },
            Ok(_) => return Err(nom::Err::Error(nom::error::Error::new(remaining, ErrorKind::Tag))),
            Err(nom::Err::Error(_)) if !options.strict && at_eof(remaining) => {
                log::debug!("Unclosed dictionary at EOF");
                return Ok((&remaining[remaining.len()..], dict));
            },
            Err(e) => return Err(e),
        }
    }
}

/// True when only whitespace and comments remain.
fn at_eof(input: &[u8]) -> bool {
    crate::lexer::skip_ws(input)
        .map(|(rest, _)| rest.is_empty())
        .unwrap_or(false)
}

/// Parse stream data after the `stream` keyword.
///
/// PDF Spec: ISO 32000-1:2008, Section 7.3.8.1 - Stream Objects
///
/// `/Length` is trusted when it is a direct integer and lands on `endstream`.
/// Otherwise the data runs to the next `endstream` keyword (minus the EOL
/// before it). Indirect lengths are reconciled by the document after loading.
fn parse_stream_data<'a>(input: &'a [u8], dict: &Dict, options: &ParserOptions) -> IResult<&'a [u8], Vec<u8>> {
    // The keyword must be followed by CRLF or LF; a lone CR is tolerated
    let input = if input.starts_with(b"\r\n") {
        &input[2..]
    } else if input.starts_with(b"\n") || input.starts_with(b"\r") {
        &input[1..]
    } else {
        log::debug!("No EOL after stream keyword");
        input
    };

    let direct_length = dict
        .get("Length")
        .and_then(Object::as_integer)
        .filter(|&n| n >= 0)
        .map(|n| n as usize);

    if let Some(length) = direct_length {
        if length <= input.len() {
            let after = &input[length..];
            let trimmed = crate::lexer::skip_ws(after).map(|(r, _)| r).unwrap_or(after);
            if let Some(rest) = trimmed.strip_prefix(b"endstream") {
                return Ok((rest, input[..length].to_vec()));
            }
        }
        log::warn!("Stream /Length {} does not reach endstream, scanning instead", length);
    }

    if let Some(pos) = find_keyword(input, b"endstream") {
        let data = trim_trailing_eol(&input[..pos]);
        return Ok((&input[pos + b"endstream".len()..], data.to_vec()));
    }

    if options.strict {
        return Err(nom::Err::Failure(nom::error::Error::new(input, ErrorKind::Eof)));
    }

    if let Some(pos) = find_keyword(input, b"endobj") {
        log::warn!("Stream without endstream, ending at endobj");
        return Ok((&input[pos..], trim_trailing_eol(&input[..pos]).to_vec()));
    }

    log::warn!("Unterminated stream, taking {} remaining bytes", input.len());
    Ok((&input[input.len()..], input.to_vec()))
}

fn trim_trailing_eol(data: &[u8]) -> &[u8] {
    if let Some(d) = data.strip_suffix(b"\r\n") {
        d
    } else if let Some(d) = data.strip_suffix(b"\n").or_else(|| data.strip_suffix(b"\r")) {
        d
    } else {
        data
    }
}

/// Find the position of a keyword in input.
pub(crate) fn find_keyword(input: &[u8], keyword: &[u8]) -> Option<usize> {
    input.windows(keyword.len()).position(|window| window == keyword)
}

/// Parse `N G obj ... endobj` at the start of `input`.
///
/// Returns the object's reference, its value, and the input after it. A
/// missing `endobj` is tolerated in lenient mode; an empty body reads as null.
pub fn parse_indirect_object<'a>(
    input: &'a [u8],
    options: &ParserOptions,
) -> IResult<&'a [u8], (ObjectRef, Object)> {
    let bad = |at: &'a [u8]| nom::Err::Error(nom::error::Error::new(at, ErrorKind::Verify));

    let (input, id) = match token_opts(input, false)? {
        (rest, Token::Integer(n)) if n >= 0 => (rest, n as u32),
        _ => return Err(bad(input)),
    };
    let (input, gen) = match token_opts(input, false)? {
        (rest, Token::Integer(n)) if (0..=u16::MAX as i64).contains(&n) => (rest, n as u16),
        _ => return Err(bad(input)),
    };
    let input = match token_opts(input, false)? {
        (rest, Token::ObjStart) => rest,
        _ => return Err(bad(input)),
    };

    let obj_ref = ObjectRef::new(id, gen);

    if let Ok((rest, Token::ObjEnd)) = token_opts(input, false) {
        return Ok((rest, (obj_ref, Object::Null)));
    }

    let (input, value) = parse_value(input, options, 0)?;

    match token_opts(input, false) {
        Ok((rest, Token::ObjEnd)) => Ok((rest, (obj_ref, value))),
        _ if options.strict => Err(bad(input)),
        _ => {
            log::debug!("Object {} has no endobj", obj_ref);
            Ok((input, (obj_ref, value)))
        },
    }
}

/// Map a nom failure to an engine error with an absolute byte offset.
///
/// `original` is the slice parsing started from and `base_offset` its
/// position in the file.
pub fn to_error(original: &[u8], base_offset: usize, err: nom::Err<nom::error::Error<&[u8]>>, max_nesting: usize) -> Error {
    match err {
        nom::Err::Failure(e) if e.code == ErrorKind::TooLarge => {
            Error::RecursionLimitExceeded(max_nesting as u32)
        },
        nom::Err::Failure(e) => Error::MalformedToken {
            offset: base_offset + original.len().saturating_sub(e.input.len()),
            reason: match e.code {
                ErrorKind::Eof => "unterminated stream".to_string(),
                _ => "unterminated string".to_string(),
            },
        },
        nom::Err::Error(e) => Error::ParseError {
            offset: base_offset + original.len().saturating_sub(e.input.len()),
            reason: format!("unexpected input ({:?})", e.code),
        },
        nom::Err::Incomplete(_) => Error::ParseError {
            offset: base_offset + original.len(),
            reason: "incomplete input".to_string(),
        },
    }
}

/// Decode a hex string to bytes.
///
/// Whitespace is ignored. If there's an odd number of hex digits, the last
/// digit is padded with 0. Non-hex bytes are skipped.
///
/// # Example
///
/// ```
/// use pdf_press::parser::decode_hex;
///
/// assert_eq!(decode_hex(b"48656C6C6F"), b"Hello");
/// assert_eq!(decode_hex(b"7"), b"\x70");
/// ```
pub fn decode_hex(hex_bytes: &[u8]) -> Vec<u8> {
    let nibbles: Vec<u8> = hex_bytes
        .iter()
        .filter_map(|&c| (c as char).to_digit(16).map(|d| d as u8))
        .collect();

    nibbles
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}
