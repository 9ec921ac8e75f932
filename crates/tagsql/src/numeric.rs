//! Postgres binary NUMERIC format, converted to and from decimal text.
//!
//! The wire value is a header of four 16-bit words (digit count, weight of
//! the first digit, sign, display scale) followed by base-10000 digits.

use bytes::{BufMut, BytesMut};
use std::error::Error;
use std::fmt::Write;

type BoxError = Box<dyn Error + Sync + Send>;

const POSITIVE: u16 = 0x0000;
const NEGATIVE: u16 = 0x4000;
const NAN: u16 = 0xC000;
const POS_INFINITY: u16 = 0xD000;
const NEG_INFINITY: u16 = 0xF000;

/// Encode a plain decimal literal such as `-12.50` or `NaN`.
pub(crate) fn encode(text: &str, out: &mut BytesMut) -> Result<(), BoxError> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("nan") {
        put_header(out, 0, 0, NAN, 0);
        return Ok(());
    }

    let (sign, body) = match text.strip_prefix('-') {
        Some(rest) => (NEGATIVE, rest),
        None => (POSITIVE, text.strip_prefix('+').unwrap_or(text)),
    };
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
    let well_formed = !(int_part.is_empty() && frac_part.is_empty())
        && int_part
            .bytes()
            .chain(frac_part.bytes())
            .all(|b| b.is_ascii_digit());
    if !well_formed {
        return Err(format!("invalid numeric literal `{text}`").into());
    }
    let dscale = u16::try_from(frac_part.len())?;

    // Align both halves on 4-digit group boundaries around the decimal point.
    let int_part = int_part.trim_start_matches('0');
    let mut padded = "0".repeat((4 - int_part.len() % 4) % 4);
    padded.push_str(int_part);
    let int_groups = padded.len() / 4;
    padded.push_str(frac_part);
    padded.push_str(&"0".repeat((4 - frac_part.len() % 4) % 4));

    let mut groups: Vec<i16> = padded
        .as_bytes()
        .chunks(4)
        .map(|chunk| {
            chunk
                .iter()
                .fold(0_i16, |acc, &b| acc * 10 + i16::from(b - b'0'))
        })
        .collect();

    let leading = groups.iter().take_while(|g| **g == 0).count();
    groups.drain(..leading);
    while groups.last() == Some(&0) {
        groups.pop();
    }

    let (sign, weight) = if groups.is_empty() {
        (POSITIVE, 0)
    } else {
        let weight = i64::try_from(int_groups)? - 1 - i64::try_from(leading)?;
        (sign, i16::try_from(weight)?)
    };

    put_header(out, i16::try_from(groups.len())?, weight, sign, dscale);
    for group in groups {
        out.put_i16(group);
    }
    Ok(())
}

/// Decode a wire value to decimal text, keeping its display scale.
pub(crate) fn decode(raw: &[u8]) -> Result<String, BoxError> {
    let mut buf = raw;
    let ndigits = read_u16(&mut buf)? as i16;
    let weight = i32::from(read_u16(&mut buf)? as i16);
    let sign = read_u16(&mut buf)?;
    let dscale = read_u16(&mut buf)?;

    match sign {
        NAN => return Ok("NaN".to_string()),
        POS_INFINITY => return Ok("Infinity".to_string()),
        NEG_INFINITY => return Ok("-Infinity".to_string()),
        POSITIVE | NEGATIVE => {}
        other => return Err(format!("invalid numeric sign 0x{other:04x}").into()),
    }

    let ndigits = usize::try_from(ndigits).map_err(|_| "negative numeric digit count")?;
    let digits = (0..ndigits)
        .map(|_| read_u16(&mut buf).map(|d| d as i16))
        .collect::<Result<Vec<_>, _>>()?;
    let digit = |pos: i32| -> i16 {
        usize::try_from(pos)
            .ok()
            .and_then(|pos| digits.get(pos))
            .copied()
            .unwrap_or(0)
    };

    let mut text = String::new();
    if sign == NEGATIVE {
        text.push('-');
    }
    if weight < 0 {
        text.push('0');
    } else {
        for pos in 0..=weight {
            if pos == 0 {
                write!(text, "{}", digit(pos))?;
            } else {
                write!(text, "{:04}", digit(pos))?;
            }
        }
    }

    if dscale > 0 {
        let groups = (i32::from(dscale) + 3) / 4;
        let mut frac = String::new();
        for k in 0..groups {
            write!(frac, "{:04}", digit(weight + 1 + k))?;
        }
        frac.truncate(usize::from(dscale));
        text.push('.');
        text.push_str(&frac);
    }

    Ok(text)
}

fn put_header(out: &mut BytesMut, ndigits: i16, weight: i16, sign: u16, dscale: u16) {
    out.put_i16(ndigits);
    out.put_i16(weight);
    out.put_u16(sign);
    out.put_u16(dscale);
}

fn read_u16(buf: &mut &[u8]) -> Result<u16, BoxError> {
    let (head, rest) = buf
        .split_first_chunk::<2>()
        .ok_or("truncated numeric value")?;
    *buf = rest;
    Ok(u16::from_be_bytes(*head))
}
