//! printf-style patterns for the `format` modifier.
//!
//! Supports `%[flags][width][.precision]conversion` where flags are
//! `- 0 + ,` and space, and conversions are `s S b d x X f e % n`. Every
//! conversion formats the same single value. A `%` that does not start a
//! valid conversion is copied to the output unchanged, as is one whose width
//! or precision exceeds [`MAX_FIELD`].

use httprpc_beans::{Number, Scalar};

use crate::locale::{group_digits, LocaleData};

/// Largest accepted width or precision.
const MAX_FIELD: usize = 4096;

#[derive(Debug, Default)]
struct Spec {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    group: bool,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: char,
}

/// Formats `value` according to `pattern` using the separators of `data`.
pub fn sprintf(pattern: &str, value: &Scalar, data: &LocaleData) -> String {
    let mut out = String::with_capacity(pattern.len() + 16);
    let mut rest = pattern;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        match parse_spec(tail) {
            Some((spec, consumed)) => {
                render(&spec, value, data, &mut out);
                rest = &tail[consumed..];
            }
            None => {
                out.push('%');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

fn parse_spec(s: &str) -> Option<(Spec, usize)> {
    let mut spec = Spec::default();
    let mut chars = s.char_indices().peekable();

    while let Some(&(_, c)) = chars.peek() {
        match c {
            '-' => spec.left = true,
            '0' => spec.zero = true,
            '+' => spec.plus = true,
            ' ' => spec.space = true,
            ',' => spec.group = true,
            _ => break,
        }
        chars.next();
    }

    spec.width = digits(&mut chars);

    if let Some(&(_, '.')) = chars.peek() {
        chars.next();
        spec.precision = Some(digits(&mut chars).unwrap_or(0));
    }

    let too_wide = |field: Option<usize>| field.is_some_and(|n| n > MAX_FIELD);
    if too_wide(spec.width) || too_wide(spec.precision) {
        return None;
    }

    let (index, conversion) = chars.next()?;
    if !"sSbdxXfe%n".contains(conversion) {
        return None;
    }
    spec.conversion = conversion;
    Some((spec, index + conversion.len_utf8()))
}

fn digits(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|&(_, c)| c.to_digit(10)) {
        value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(d as usize));
        chars.next();
    }
    value
}

/// A formatted conversion, split so zero padding can go after the sign.
struct Piece {
    sign: &'static str,
    body: String,
    numeric: bool,
}

impl Piece {
    fn text(body: String) -> Self {
        Piece {
            sign: "",
            body,
            numeric: false,
        }
    }

    fn number(spec: &Spec, negative: bool, body: String) -> Self {
        let sign = if negative {
            "-"
        } else if spec.plus {
            "+"
        } else if spec.space {
            " "
        } else {
            ""
        };
        Piece {
            sign,
            body,
            numeric: true,
        }
    }
}

fn render(spec: &Spec, value: &Scalar, data: &LocaleData, out: &mut String) {
    let piece = match spec.conversion {
        'n' => {
            out.push('\n');
            return;
        }
        '%' => Piece::text("%".to_string()),
        's' => Piece::text(truncate(value.to_string(), spec.precision)),
        'S' => Piece::text(truncate(value.to_string(), spec.precision).to_uppercase()),
        'b' => {
            let flag = match value {
                Scalar::Bool(b) => *b,
                _ => true,
            };
            Piece::text(truncate(flag.to_string(), spec.precision))
        }
        'd' => match integer(value) {
            Some(n) => {
                let magnitude = n.unsigned_abs().to_string();
                let magnitude = if spec.group {
                    group_digits(&magnitude, data.grouping_separator)
                } else {
                    magnitude
                };
                Piece::number(spec, n < 0, magnitude)
            }
            None => Piece::text(value.to_string()),
        },
        'x' | 'X' => match integer(value) {
            Some(n) => {
                let hex = if n < 0 {
                    format!("{:x}", n as i64 as u64)
                } else {
                    format!("{:x}", n)
                };
                let hex = if spec.conversion == 'X' {
                    hex.to_uppercase()
                } else {
                    hex
                };
                Piece::number(spec, false, hex)
            }
            None => Piece::text(value.to_string()),
        },
        'f' => match float(value) {
            Some(x) if x.is_finite() => Piece::number(
                spec,
                x < 0.0,
                data.format_decimal(x.abs(), spec.precision.unwrap_or(6), spec.group),
            ),
            Some(x) => Piece::text(non_finite(x)),
            None => Piece::text(value.to_string()),
        },
        'e' => match float(value) {
            Some(x) if x.is_finite() => Piece::number(
                spec,
                x < 0.0,
                scientific(x.abs(), spec.precision.unwrap_or(6), data.decimal_separator),
            ),
            Some(x) => Piece::text(non_finite(x)),
            None => Piece::text(value.to_string()),
        },
        _ => Piece::text(value.to_string()),
    };

    pad(spec, piece, out);
}

fn pad(spec: &Spec, piece: Piece, out: &mut String) {
    let len = piece.sign.chars().count() + piece.body.chars().count();
    let fill = spec.width.unwrap_or(0).saturating_sub(len);

    if spec.left {
        out.push_str(piece.sign);
        out.push_str(&piece.body);
        out.extend(std::iter::repeat(' ').take(fill));
    } else if spec.zero && piece.numeric {
        out.push_str(piece.sign);
        out.extend(std::iter::repeat('0').take(fill));
        out.push_str(&piece.body);
    } else {
        out.extend(std::iter::repeat(' ').take(fill));
        out.push_str(piece.sign);
        out.push_str(&piece.body);
    }
}

fn truncate(s: String, precision: Option<usize>) -> String {
    match precision {
        Some(max) if s.chars().count() > max => s.chars().take(max).collect(),
        _ => s,
    }
}

fn integer(value: &Scalar) -> Option<i128> {
    match value {
        Scalar::Number(Number::I64(n)) => Some(i128::from(*n)),
        Scalar::Number(Number::U64(n)) => Some(i128::from(*n)),
        Scalar::Number(Number::F64(n)) if n.is_finite() && n.fract() == 0.0 => Some(*n as i128),
        Scalar::Timestamp(t) => Some(i128::from(t.as_millis())),
        _ => None,
    }
}

fn float(value: &Scalar) -> Option<f64> {
    match value {
        Scalar::Number(n) => Some(n.to_f64()),
        Scalar::Timestamp(t) => Some(t.as_millis() as f64),
        _ => None,
    }
}

fn non_finite(x: f64) -> String {
    if x.is_nan() {
        "NaN".to_string()
    } else if x > 0.0 {
        "Infinity".to_string()
    } else {
        "-Infinity".to_string()
    }
}

/// `d.ddddde+XX` with at least two exponent digits.
fn scientific(magnitude: f64, precision: usize, decimal_separator: char) -> String {
    let raw = format!("{:.*e}", precision, magnitude);
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let mantissa = mantissa.replace('.', &decimal_separator.to_string());
    format!(
        "{}e{}{:02}",
        mantissa,
        if exponent < 0 { '-' } else { '+' },
        exponent.abs()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;

    fn en(pattern: &str, value: impl Into<Scalar>) -> String {
        sprintf(pattern, &value.into(), Locale::default().data())
    }

    #[test]
    fn oversized_fields_are_copied_literally() {
        assert_eq!(en("%99999999999999999999999d", 5), "%99999999999999999999999d");
        assert_eq!(en("[%.5000f]", 1.5), "[%.5000f]");
        assert_eq!(en("%4096d", 5).len(), MAX_FIELD);
    }

    #[test]
    fn strings_with_width_and_precision() {
        assert_eq!(en("%s!", "hi"), "hi!");
        assert_eq!(en("[%5s|%-5s]", "ab"), "[   ab|ab   ]");
        assert_eq!(en("%.2s", "abcdef"), "ab");
        assert_eq!(en("%S", "abc"), "ABC");
    }

    #[test]
    fn integers_with_flags() {
        assert_eq!(en("%d", 42), "42");
        assert_eq!(en("%05d", 42), "00042");
        assert_eq!(en("%06d", -42), "-00042");
        assert_eq!(en("%+d", 42), "+42");
        assert_eq!(en("% d", 42), " 42");
        assert_eq!(en("%,d", 1234567), "1,234,567");
        assert_eq!(en("%-4d|", 7), "7   |");
    }

    #[test]
    fn hexadecimal() {
        assert_eq!(en("%x", 255), "ff");
        assert_eq!(en("%X", 255), "FF");
        assert_eq!(en("%x", -1), "ffffffffffffffff");
        assert_eq!(en("%04x", 10), "000a");
    }

    #[test]
    fn floats_use_locale_separators() {
        assert_eq!(en("%.2f", 3.14159), "3.14");
        assert_eq!(en("%f", 1.5), "1.500000");
        assert_eq!(en("%,.2f", 1234.5), "1,234.50");
        assert_eq!(en("%.1f", -0.04), "-0.0");
        let de = Locale::parse("de-DE");
        assert_eq!(sprintf("%,.2f", &Scalar::from(1234.5), de.data()), "1.234,50");
    }

    #[test]
    fn scientific_notation() {
        assert_eq!(en("%e", 1234.5), "1.234500e+03");
        assert_eq!(en("%.2e", 0.000123), "1.23e-04");
    }

    #[test]
    fn literal_percent_and_invalid_conversions() {
        assert_eq!(en("100%%", 1), "100%");
        assert_eq!(en("50%", 1), "50%");
        assert_eq!(en("%q", 1), "%q");
        assert_eq!(en("a%nb", 1), "a\nb");
    }

    #[test]
    fn booleans_and_mismatched_types() {
        assert_eq!(en("%b", false), "false");
        assert_eq!(en("%b", "x"), "true");
        assert_eq!(en("%d", "text"), "text");
    }
}
