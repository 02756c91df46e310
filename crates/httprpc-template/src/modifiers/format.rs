//! The `format` modifier.
//!
//! | Argument | Input | Output (en-US) |
//! |----------|-------|----------------|
//! | `currency` | number | `$1,234.50` |
//! | `percent` | number | `25%` |
//! | `shortDate` .. `fullDate` | epoch millis or timestamp | `1/5/20` .. `Sunday, January 5, 2020` |
//! | `shortTime` .. `fullTime` | epoch millis or timestamp | `3:04 PM` .. `3:04:05 PM +00:00` |
//! | `shortDateTime` .. `fullDateTime` | epoch millis or timestamp | date and time joined |
//! | `isoDate`, `isoTime`, `isoDateTime` | epoch millis or timestamp | `2020-01-05Z`, `15:04:05Z`, `2020-01-05T15:04:05Z` |
//! | anything else | any scalar | printf-style pattern |
//!
//! Inputs the selected conversion cannot use pass through unchanged.

use chrono::{DateTime, FixedOffset};
use httprpc_beans::{Scalar, Timestamp};

use super::printf::sprintf;
use super::ModifierContext;
use crate::locale::Style;

#[derive(Clone, Copy)]
enum Temporal {
    Date,
    Time,
    DateTime,
}

/// Applies the `format` modifier to `value`.
pub fn format_value(value: Scalar, argument: Option<&str>, context: &ModifierContext<'_>) -> Scalar {
    let Some(argument) = argument else {
        return value;
    };

    let formatted = match argument {
        "currency" => currency(&value, context),
        "percent" => percent(&value, context),
        "shortDate" => localized(&value, Temporal::Date, Style::Short, context),
        "mediumDate" => localized(&value, Temporal::Date, Style::Medium, context),
        "longDate" => localized(&value, Temporal::Date, Style::Long, context),
        "fullDate" => localized(&value, Temporal::Date, Style::Full, context),
        "shortTime" => localized(&value, Temporal::Time, Style::Short, context),
        "mediumTime" => localized(&value, Temporal::Time, Style::Medium, context),
        "longTime" => localized(&value, Temporal::Time, Style::Long, context),
        "fullTime" => localized(&value, Temporal::Time, Style::Full, context),
        "shortDateTime" => localized(&value, Temporal::DateTime, Style::Short, context),
        "mediumDateTime" => localized(&value, Temporal::DateTime, Style::Medium, context),
        "longDateTime" => localized(&value, Temporal::DateTime, Style::Long, context),
        "fullDateTime" => localized(&value, Temporal::DateTime, Style::Full, context),
        "isoDate" => iso(&value, Temporal::Date, context),
        "isoTime" => iso(&value, Temporal::Time, context),
        "isoDateTime" => iso(&value, Temporal::DateTime, context),
        pattern => Some(sprintf(pattern, &value, context.locale.data())),
    };

    match formatted {
        Some(text) => Scalar::String(text),
        None => value,
    }
}

fn number(value: &Scalar) -> Option<f64> {
    match value {
        Scalar::Number(n) => Some(n.to_f64()).filter(|x| x.is_finite()),
        _ => None,
    }
}

fn currency(value: &Scalar, context: &ModifierContext<'_>) -> Option<String> {
    let amount = number(value)?;
    let data = context.locale.data();
    let digits = data.format_decimal(amount.abs(), data.currency_digits, true);
    let sign = if amount < 0.0 { "-" } else { "" };

    Some(if data.currency_prefix {
        format!(
            "{}{}{}{}",
            sign, data.currency_symbol, data.currency_spacing, digits
        )
    } else {
        format!(
            "{}{}{}{}",
            sign, digits, data.currency_spacing, data.currency_symbol
        )
    })
}

fn percent(value: &Scalar, context: &ModifierContext<'_>) -> Option<String> {
    let ratio = number(value)?;
    let data = context.locale.data();
    let digits = data.format_decimal((ratio * 100.0).abs(), 0, true);
    let sign = if ratio < 0.0 && digits.chars().any(|c| c != '0') {
        "-"
    } else {
        ""
    };
    Some(format!("{}{}{}%", sign, digits, data.percent_spacing))
}

fn instant(value: &Scalar, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let timestamp = match value {
        Scalar::Timestamp(t) => *t,
        Scalar::Number(n) if n.is_integer() => Timestamp::from_millis(n.to_i64()),
        _ => return None,
    };
    timestamp.to_datetime(offset)
}

fn localized(
    value: &Scalar,
    temporal: Temporal,
    style: Style,
    context: &ModifierContext<'_>,
) -> Option<String> {
    let datetime = instant(value, context.time_zone)?;
    let data = context.locale.data();
    let pattern = match temporal {
        Temporal::Date => data.date_pattern(style).to_string(),
        Temporal::Time => data.time_pattern(style).to_string(),
        Temporal::DateTime => data.date_time_pattern(style),
    };
    Some(datetime.format_localized(&pattern, data.chrono).to_string())
}

fn iso(value: &Scalar, temporal: Temporal, context: &ModifierContext<'_>) -> Option<String> {
    let datetime = instant(value, context.time_zone)?;
    let pattern = match temporal {
        Temporal::Date => "%Y-%m-%d",
        Temporal::Time => "%H:%M:%S%.f",
        Temporal::DateTime => "%Y-%m-%dT%H:%M:%S%.f",
    };
    let offset = if context.time_zone.local_minus_utc() == 0 {
        "Z".to_string()
    } else {
        datetime.format("%:z").to_string()
    };
    Some(format!("{}{}", datetime.format(pattern), offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;

    // 2020-01-05T15:04:05Z, a Sunday.
    const MILLIS: i64 = 1_578_236_645_000;

    fn apply(value: impl Into<Scalar>, argument: &str, locale: &str, offset_hours: i32) -> String {
        let locale = Locale::parse(locale);
        let zone = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        let context = ModifierContext::new(&locale, zone);
        format_value(value.into(), Some(argument), &context).to_string()
    }

    #[test]
    fn missing_argument_passes_through() {
        let locale = Locale::default();
        let context = ModifierContext::new(&locale, FixedOffset::east_opt(0).unwrap());
        assert_eq!(format_value(Scalar::from(5), None, &context), Scalar::from(5));
    }

    #[test]
    fn currency_by_locale() {
        assert_eq!(apply(1234.5, "currency", "en-US", 0), "$1,234.50");
        assert_eq!(apply(-3, "currency", "en-US", 0), "-$3.00");
        assert_eq!(apply(1234.5, "currency", "de-DE", 0), "1.234,50\u{a0}€");
        assert_eq!(apply(1234.4, "currency", "ja-JP", 0), "￥1,234");
    }

    #[test]
    fn percent_by_locale() {
        assert_eq!(apply(0.25, "percent", "en-US", 0), "25%");
        assert_eq!(apply(12.5, "percent", "en-US", 0), "1,250%");
        assert_eq!(apply(0.25, "percent", "fr-FR", 0), "25\u{a0}%");
    }

    #[test]
    fn non_numbers_pass_through_number_formats() {
        assert_eq!(apply("abc", "currency", "en-US", 0), "abc");
        assert_eq!(apply("abc", "shortDate", "en-US", 0), "abc");
    }

    #[test]
    fn localized_dates() {
        assert_eq!(apply(MILLIS, "shortDate", "en-US", 0), "1/5/20");
        assert_eq!(apply(MILLIS, "mediumDate", "en-US", 0), "Jan 5, 2020");
        assert_eq!(apply(MILLIS, "longDate", "en-US", 0), "January 5, 2020");
        assert_eq!(apply(MILLIS, "fullDate", "en-US", 0), "Sunday, January 5, 2020");
        assert_eq!(apply(MILLIS, "longDate", "de-DE", 0), "5. Januar 2020");
    }

    #[test]
    fn localized_times_follow_time_zone() {
        assert_eq!(apply(MILLIS, "shortTime", "en-US", 0), "3:04 PM");
        assert_eq!(apply(MILLIS, "mediumTime", "en-US", 0), "3:04:05 PM");
        assert_eq!(apply(MILLIS, "shortTime", "en-GB", 1), "16:04");
        assert_eq!(
            apply(MILLIS, "mediumDateTime", "en-US", 0),
            "Jan 5, 2020, 3:04:05 PM"
        );
    }

    #[test]
    fn iso_formats() {
        assert_eq!(apply(MILLIS, "isoDate", "en-US", 0), "2020-01-05Z");
        assert_eq!(apply(MILLIS, "isoTime", "en-US", 0), "15:04:05Z");
        assert_eq!(apply(MILLIS, "isoDateTime", "en-US", 0), "2020-01-05T15:04:05Z");
        assert_eq!(
            apply(MILLIS + 250, "isoDateTime", "en-US", 2),
            "2020-01-05T17:04:05.250+02:00"
        );
        assert_eq!(
            apply(Timestamp::from_millis(MILLIS), "isoDate", "en-US", 0),
            "2020-01-05Z"
        );
    }

    #[test]
    fn other_arguments_are_printf_patterns() {
        assert_eq!(apply(3.14159, "%.2f", "en-US", 0), "3.14");
        assert_eq!(apply(42, "%04d", "en-US", 0), "0042");
    }
}
