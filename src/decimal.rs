//! Parsing of decimal and big-integer text for tagged CBOR output.
//!

use crate::serializer::SerializeErrorKind;
use nom::character::complete::{char, digit0, digit1, one_of};
use nom::combinator::{all_consuming, opt};
use nom::sequence::{pair, preceded, tuple};
use nom::IResult;
use num_bigint::{BigInt, Sign};

/// The mantissa of a decimal fraction.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Mantissa {
    Small(i64),
    /// Too large for an `i64`; encoded as a nested bignum.
    Big(BigInt),
}

/// A decimal literal split into `mantissa * 10^scale`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Decimal {
    pub scale: i64,
    pub mantissa: Mantissa,
}

type SignChar = Option<char>;

// sign, integer digits, fraction digits, exponent
type DecimalParts<'a> = (SignChar, &'a str, Option<&'a str>, Option<(SignChar, &'a str)>);

fn decimal_parts(input: &str) -> IResult<&str, DecimalParts<'_>> {
    all_consuming(tuple((
        opt(one_of("+-")),
        digit1,
        opt(preceded(char('.'), digit0)),
        opt(preceded(one_of("eE"), pair(opt(one_of("+-")), digit1))),
    )))(input)
}

fn integer_parts(input: &str) -> IResult<&str, (SignChar, &str)> {
    all_consuming(pair(opt(one_of("+-")), digit1))(input)
}

fn invalid(input: &str) -> SerializeErrorKind {
    SerializeErrorKind::InvalidDecimal(input.to_string())
}

/// Parse a decimal literal such as `273.15` or `-1.5e-3`.
///
/// The scale is the exponent minus the number of fraction digits.
pub(crate) fn parse_decimal(input: &str) -> Result<Decimal, SerializeErrorKind> {
    let (_, (sign, integer, fraction, exponent)) =
        decimal_parts(input).map_err(|_| invalid(input))?;
    let fraction = fraction.unwrap_or("");

    let exponent: i64 = match exponent {
        None => 0,
        Some((esign, digits)) => {
            let e: i64 = digits.parse().map_err(|_| invalid(input))?;
            if esign == Some('-') {
                -e
            } else {
                e
            }
        }
    };
    let frac_len = i64::try_from(fraction.len()).map_err(|_| invalid(input))?;
    let scale = exponent.checked_sub(frac_len).ok_or_else(|| invalid(input))?;

    let mut digits = String::with_capacity(1 + integer.len() + fraction.len());
    if sign == Some('-') {
        digits.push('-');
    }
    digits.push_str(integer);
    digits.push_str(fraction);

    let mantissa = match digits.parse::<i64>() {
        Ok(m) => Mantissa::Small(m),
        Err(_) => Mantissa::Big(digits.parse::<BigInt>().map_err(|_| invalid(input))?),
    };
    Ok(Decimal { scale, mantissa })
}

/// Parse a decimal digit string, with optional sign, into a big integer.
pub(crate) fn parse_bignum(input: &str) -> Result<BigInt, SerializeErrorKind> {
    integer_parts(input).map_err(|_| invalid(input))?;
    input.parse::<BigInt>().map_err(|_| invalid(input))
}

/// Split a big integer into its CBOR tag form.
///
/// Returns `true` for negative numbers (tag 3), along with the big-endian
/// bytes of the payload. Negative numbers carry `-1 - n`; zero has an empty
/// payload.
pub(crate) fn bignum_payload(n: &BigInt) -> (bool, Vec<u8>) {
    let negative = n.sign() == Sign::Minus;
    let payload = if negative { -n - 1u32 } else { n.clone() };
    if payload.sign() == Sign::NoSign {
        (negative, Vec::new())
    } else {
        (negative, payload.magnitude().to_bytes_be())
    }
}
