//! Parser for Redis `MONITOR` output
//!
//! A monitor line looks like
//!
//! ```text
//! 1700000000.123456 [0 127.0.0.1:52044] "SET" "user:42:profile" "{...}"
//! ```
//!
//! Only the timestamp, the command and the first argument are used. Arguments
//! are quoted and escaped the way Redis prints them (`\"`, `\\`, `\n`, `\xNN`
//! and friends), so a key may contain spaces or quotes. The byte length of the
//! whole line stands in for the payload size.

use crate::classify::classify;
use keylens_core::{Error, OperationClass, OperationRecord, Result};

/// Parse one monitor line
///
/// Returns `Ok(None)` for commands that are not tracked; those lines never need
/// a key, so a bare `"PING"` is not an error.
pub fn parse_line(line: &str) -> Result<Option<OperationRecord>> {
    let (timestamp, rest) = line
        .trim_start()
        .split_once(char::is_whitespace)
        .ok_or_else(|| Error::parse(line, "missing command"))?;

    let arguments = rest
        .trim_start()
        .strip_prefix('[')
        .and_then(|client| client.split_once(']'))
        .map(|(_, arguments)| arguments)
        .ok_or_else(|| Error::parse(line, "missing client address"))?;

    let arguments = tokenize(arguments).map_err(|message| Error::parse(line, message))?;
    let mut arguments = arguments.into_iter();

    let mnemonic = arguments
        .next()
        .ok_or_else(|| Error::parse(line, "missing command"))?;

    if classify(&mnemonic) == OperationClass::Ignore {
        return Ok(None);
    }

    let key = arguments
        .next()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Error::parse(line, format!("{mnemonic} without a key")))?;

    let observed_at = timestamp
        .parse::<f64>()
        .ok()
        .filter(|t| t.is_finite() && *t >= 0.0)
        .ok_or_else(|| Error::parse(line, "missing or invalid timestamp"))?;

    Ok(Some(OperationRecord::new(
        mnemonic,
        key,
        line.len() as u64,
        observed_at,
    )))
}

/// Split the argument part of a monitor line into unescaped arguments
fn tokenize(input: &str) -> std::result::Result<Vec<String>, String> {
    let mut arguments = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c != '"' {
            // Bare word; Redis always quotes, but older captures may not
            let mut end = input.len();
            while let Some(&(i, c)) = chars.peek() {
                if c.is_whitespace() {
                    end = i;
                    break;
                }
                chars.next();
            }
            arguments.push(input[start..end].to_string());
            continue;
        }

        chars.next();
        let mut bytes = Vec::new();
        let mut closed = false;
        while let Some((_, c)) = chars.next() {
            match c {
                '"' => {
                    closed = true;
                    break;
                }
                '\\' => {
                    let (_, escaped) = chars
                        .next()
                        .ok_or_else(|| "dangling escape in argument".to_string())?;
                    match escaped {
                        'n' => bytes.push(b'\n'),
                        'r' => bytes.push(b'\r'),
                        't' => bytes.push(b'\t'),
                        'a' => bytes.push(0x07),
                        'b' => bytes.push(0x08),
                        'x' => {
                            let hex: String = chars.by_ref().take(2).map(|(_, h)| h).collect();
                            if hex.len() != 2 || !hex.chars().all(|h| h.is_ascii_hexdigit()) {
                                return Err(format!("invalid escape \\x{hex}"));
                            }
                            let byte = u8::from_str_radix(&hex, 16)
                                .map_err(|_| format!("invalid escape \\x{hex}"))?;
                            bytes.push(byte);
                        }
                        other => push_char(&mut bytes, other),
                    }
                }
                other => push_char(&mut bytes, other),
            }
        }
        if !closed {
            return Err("unterminated quoted argument".to_string());
        }

        let argument = String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
        arguments.push(argument);
    }

    Ok(arguments)
}

fn push_char(bytes: &mut Vec<u8>, c: char) {
    let mut buf = [0; 4];
    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}
