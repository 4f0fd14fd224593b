use super::{read_prefix, Module, NumTail, StrTail};
use crate::coerce::format_number;
use crate::curry::{builtin, Bound, Builtin};
use crate::error::{Error, Result};
use crate::value::{read_all, Value};

const NUM_BUILTINS: &[Builtin] = &[
    builtin("abs", "Num -> Num", 1, "absolute value of a number", abs),
    builtin("add", "Num -> Num -> Num", 2, "add two numbers", add),
    builtin("sub", "Num -> Num -> Num", 2, "subtract the second number from the first", sub),
    builtin("mul", "Num -> Num -> Num", 2, "multiply two numbers", mul),
    builtin("div", "Num -> Num -> Num", 2, "divide the first number by the second", div),
    builtin(
        "tonum",
        "Str* -> Num",
        1,
        "convert a string into a number; reads the leading decimal number, 0 if there is none",
        tonum,
    ),
    builtin("tostr", "Num -> Str", 1, "convert a number into a string", tostr),
    builtin("bin", "Num -> Str", 1, "integer part of a number written in base 2", bin),
    builtin("oct", "Num -> Str", 1, "integer part of a number written in base 8", oct),
    builtin("hex", "Num -> Str", 1, "integer part of a number written in base 16", hex),
    builtin("unbin", "Str -> Num", 1, "read a number written in base 2", unbin),
    builtin("unoct", "Str -> Num", 1, "read a number written in base 8", unoct),
    builtin("unhex", "Str -> Num", 1, "read a number written in base 16", unhex),
    builtin("chr", "Num -> Str", 1, "the character at the given code point", chr),
    builtin("ord", "Str -> Num", 1, "code point of the first character, 0 for an empty string", ord),
];

pub(super) const MODULE: Module = Module {
    name: "num",
    doc: "Arithmetic and conversions between numbers and their textual forms.",
    builtins: NUM_BUILTINS,
};

fn unary(bound: &mut Bound, op: fn(f64) -> f64) -> Result<f64> {
    Ok(op(bound.num(0)?.value()?))
}

fn binary(bound: &mut Bound, op: fn(f64, f64) -> f64) -> Result<f64> {
    let a = bound.num(0)?.value()?;
    let b = bound.num(1)?.value()?;
    Ok(op(a, b))
}

fn abs(bound: Bound) -> Result<Value> {
    NumTail::value(bound, |b| unary(b, f64::abs))
}

fn add(bound: Bound) -> Result<Value> {
    NumTail::value(bound, |b| binary(b, |x, y| x + y))
}

fn sub(bound: Bound) -> Result<Value> {
    NumTail::value(bound, |b| binary(b, |x, y| x - y))
}

fn mul(bound: Bound) -> Result<Value> {
    NumTail::value(bound, |b| binary(b, |x, y| x * y))
}

fn div(bound: Bound) -> Result<Value> {
    NumTail::value(bound, |b| binary(b, |x, y| x / y))
}

fn is_number_byte(byte: u8) -> bool {
    byte.is_ascii_digit() || matches!(byte, b'-' | b'+' | b'.')
}

/// Leading `[+-]digits[.digits]` after optional whitespace; 0 when absent.
pub(crate) fn parse_decimal(bytes: &[u8]) -> f64 {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let rest = &bytes[start..];

    let mut end = 0;
    if matches!(rest.first(), Some(b'-' | b'+')) {
        end += 1;
    }
    let digits_from = end;
    while rest.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut has_digits = digits_from < end;
    if rest.get(end) == Some(&b'.') {
        let fraction_from = end + 1;
        let mut fraction_end = fraction_from;
        while rest.get(fraction_end).is_some_and(u8::is_ascii_digit) {
            fraction_end += 1;
        }
        if fraction_from < fraction_end || has_digits {
            has_digits |= fraction_from < fraction_end;
            end = fraction_end;
        }
    }
    if !has_digits {
        return 0.0;
    }

    std::str::from_utf8(&rest[..end])
        .ok()
        .and_then(|text| text.trim_end_matches('.').parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn tonum(bound: Bound) -> Result<Value> {
    NumTail::value(bound, |b| {
        // stop pulling as soon as something that is not part of a number shows up
        let bytes = read_prefix(b.str(0)?, |so_far| {
            so_far
                .iter()
                .skip_while(|byte| byte.is_ascii_whitespace())
                .all(|&byte| is_number_byte(byte))
        })?;
        Ok(parse_decimal(&bytes))
    })
}

fn tostr(bound: Bound) -> Result<Value> {
    StrTail::value(bound, |b| Ok(format_number(b.num(0)?.value()?).into_bytes()))
}

fn in_base(n: f64, radix: u32) -> String {
    let int = n.trunc();
    let (sign, mut magnitude) = if int < 0.0 { ("-", -int) } else { ("", int) };
    if magnitude < 1.0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    let base = f64::from(radix);
    while 1.0 <= magnitude {
        let digit = (magnitude % base) as u32;
        digits.push(char::from_digit(digit, radix).unwrap_or('?'));
        magnitude = (magnitude / base).trunc();
    }
    digits.reverse();
    format!("{sign}{}", digits.into_iter().collect::<String>())
}

fn bin(bound: Bound) -> Result<Value> {
    StrTail::value(bound, |b| Ok(in_base(b.num(0)?.value()?, 2).into_bytes()))
}

fn oct(bound: Bound) -> Result<Value> {
    StrTail::value(bound, |b| Ok(in_base(b.num(0)?.value()?, 8).into_bytes()))
}

fn hex(bound: Bound) -> Result<Value> {
    StrTail::value(bound, |b| Ok(in_base(b.num(0)?.value()?, 16).into_bytes()))
}

fn from_base(bytes: &[u8], radix: u32) -> f64 {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };
    let base = f64::from(radix);
    let n = digits
        .chars()
        .map_while(|c| c.to_digit(radix))
        .fold(0.0, |n, digit| n * base + f64::from(digit));
    sign * n
}

fn unbin(bound: Bound) -> Result<Value> {
    NumTail::value(bound, |b| Ok(from_base(&read_all(b.str(0)?)?, 2)))
}

fn unoct(bound: Bound) -> Result<Value> {
    NumTail::value(bound, |b| Ok(from_base(&read_all(b.str(0)?)?, 8)))
}

fn unhex(bound: Bound) -> Result<Value> {
    NumTail::value(bound, |b| Ok(from_base(&read_all(b.str(0)?)?, 16)))
}

fn chr(bound: Bound) -> Result<Value> {
    StrTail::value(bound, |b| {
        let n = b.num(0)?.value()?;
        let c = char::from_u32(n as u32)
            .filter(|_| 0.0 <= n)
            .ok_or_else(|| Error::runtime(format!("{n} is not a valid code point")))?;
        Ok(c.to_string().into_bytes())
    })
}

fn ord(bound: Bound) -> Result<Value> {
    NumTail::value(bound, |b| {
        // a code point is at most 4 bytes
        let bytes = read_prefix(b.str(0)?, |so_far| so_far.len() < 4)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(text.chars().next().map(|c| f64::from(u32::from(c))).unwrap_or(0.0))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimals_read_leading_number() {
        assert_eq!(parse_decimal(b"42"), 42.0);
        assert_eq!(parse_decimal(b"  -1\n"), -1.0);
        assert_eq!(parse_decimal(b"0.3abc"), 0.3);
        assert_eq!(parse_decimal(b"garbage"), 0.0);
        assert_eq!(parse_decimal(b"-"), 0.0);
        assert_eq!(parse_decimal(b"7."), 7.0);
        assert!(parse_decimal(b"-0").is_sign_negative());
    }

    #[test]
    fn bases_round_integer_part() {
        assert_eq!(in_base(42.0, 2), "101010");
        assert_eq!(in_base(42.9, 16), "2a");
        assert_eq!(in_base(0.0, 8), "0");
        assert_eq!(in_base(-8.0, 8), "-10");
        assert_eq!(from_base(b"2a", 16), 42.0);
        assert_eq!(from_base(b"garbage", 8), 0.0);
    }
}
