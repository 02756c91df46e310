//! Locale identifiers and the formatting conventions attached to them.
//!
//! The table is deliberately small. Unknown languages fall back to `en-US`;
//! a known language with an unknown region falls back to that language's
//! primary region.

use std::fmt;

/// A language with an optional region, e.g. `en-US` or `fr`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale {
    language: String,
    region: Option<String>,
}

impl Locale {
    pub fn new(language: &str, region: Option<&str>) -> Self {
        Locale {
            language: language.to_ascii_lowercase(),
            region: region
                .filter(|r| !r.is_empty())
                .map(|r| r.to_ascii_uppercase()),
        }
    }

    /// Parses a tag such as `en-US`, `fr_FR` or `de`. Anything past the
    /// region (variants, scripts) is ignored.
    pub fn parse(tag: &str) -> Self {
        let mut parts = tag.split(['-', '_']).filter(|p| !p.is_empty());
        match parts.next() {
            Some(language) => Locale::new(language, parts.next()),
            None => Locale::default(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// BCP 47 style tag, e.g. `en-US`.
    pub fn tag(&self) -> String {
        self.to_string()
    }

    /// Resource bundle suffixes from most to least specific:
    /// `_en_US`, `_en`, then the empty suffix.
    pub fn bundle_suffixes(&self) -> Vec<String> {
        let mut suffixes = Vec::with_capacity(3);
        if let Some(region) = &self.region {
            suffixes.push(format!("_{}_{}", self.language, region));
        }
        suffixes.push(format!("_{}", self.language));
        suffixes.push(String::new());
        suffixes
    }

    /// Formatting conventions for this locale.
    pub fn data(&self) -> &'static LocaleData {
        let region = self.region.as_deref();
        LOCALES
            .iter()
            .find(|d| d.language == self.language && Some(d.region) == region)
            .or_else(|| LOCALES.iter().find(|d| d.language == self.language))
            .unwrap_or(&LOCALES[0])
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::new("en", Some("US"))
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}-{}", self.language, region),
            None => f.write_str(&self.language),
        }
    }
}

/// Date and time styles, from most to least compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Short,
    Medium,
    Long,
    Full,
}

impl Style {
    fn index(self) -> usize {
        match self {
            Style::Short => 0,
            Style::Medium => 1,
            Style::Long => 2,
            Style::Full => 3,
        }
    }
}

/// Number, currency and date conventions for one locale.
#[derive(Debug)]
pub struct LocaleData {
    pub language: &'static str,
    pub region: &'static str,
    pub chrono: chrono::Locale,
    pub decimal_separator: char,
    pub grouping_separator: char,
    pub currency_symbol: &'static str,
    /// Symbol goes before the amount.
    pub currency_prefix: bool,
    /// Text between amount and symbol.
    pub currency_spacing: &'static str,
    pub currency_digits: usize,
    /// Text between a percentage and the `%` sign.
    pub percent_spacing: &'static str,
    date_patterns: [&'static str; 4],
    time_patterns: [&'static str; 4],
    date_time_separator: &'static str,
}

impl LocaleData {
    /// strftime pattern for a date in the given style.
    pub fn date_pattern(&self, style: Style) -> &'static str {
        self.date_patterns[style.index()]
    }

    /// strftime pattern for a time of day in the given style.
    pub fn time_pattern(&self, style: Style) -> &'static str {
        self.time_patterns[style.index()]
    }

    /// strftime pattern for a date followed by a time, both in `style`.
    pub fn date_time_pattern(&self, style: Style) -> String {
        format!(
            "{}{}{}",
            self.date_pattern(style),
            self.date_time_separator,
            self.time_pattern(style)
        )
    }

    /// Formats a non-negative magnitude with `decimals` fraction digits,
    /// optionally grouping the integer part in thousands.
    pub fn format_decimal(&self, magnitude: f64, decimals: usize, grouped: bool) -> String {
        let plain = format!("{:.*}", decimals, magnitude.abs());
        let (integer, fraction) = match plain.split_once('.') {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (plain.as_str(), None),
        };

        let mut out = String::with_capacity(plain.len() + plain.len() / 3);
        if grouped {
            out.push_str(&group_digits(integer, self.grouping_separator));
        } else {
            out.push_str(integer);
        }
        if let Some(fraction) = fraction {
            out.push(self.decimal_separator);
            out.push_str(fraction);
        }
        out
    }
}

/// Inserts `separator` between every three digits, counting from the right.
pub fn group_digits(digits: &str, separator: char) -> String {
    let len = digits.chars().count();
    let mut out = String::with_capacity(digits.len() + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

static LOCALES: &[LocaleData] = &[
    LocaleData {
        language: "en",
        region: "US",
        chrono: chrono::Locale::en_US,
        decimal_separator: '.',
        grouping_separator: ',',
        currency_symbol: "$",
        currency_prefix: true,
        currency_spacing: "",
        currency_digits: 2,
        percent_spacing: "",
        date_patterns: ["%-m/%-d/%y", "%b %-d, %Y", "%B %-d, %Y", "%A, %B %-d, %Y"],
        time_patterns: ["%-I:%M %p", "%-I:%M:%S %p", "%-I:%M:%S %p %:z", "%-I:%M:%S %p %:z"],
        date_time_separator: ", ",
    },
    LocaleData {
        language: "en",
        region: "GB",
        chrono: chrono::Locale::en_GB,
        decimal_separator: '.',
        grouping_separator: ',',
        currency_symbol: "£",
        currency_prefix: true,
        currency_spacing: "",
        currency_digits: 2,
        percent_spacing: "",
        date_patterns: ["%d/%m/%Y", "%-d %b %Y", "%-d %B %Y", "%A, %-d %B %Y"],
        time_patterns: ["%H:%M", "%H:%M:%S", "%H:%M:%S %:z", "%H:%M:%S %:z"],
        date_time_separator: ", ",
    },
    LocaleData {
        language: "fr",
        region: "FR",
        chrono: chrono::Locale::fr_FR,
        decimal_separator: ',',
        grouping_separator: '\u{202f}',
        currency_symbol: "€",
        currency_prefix: false,
        currency_spacing: "\u{a0}",
        currency_digits: 2,
        percent_spacing: "\u{a0}",
        date_patterns: ["%d/%m/%Y", "%-d %b %Y", "%-d %B %Y", "%A %-d %B %Y"],
        time_patterns: ["%H:%M", "%H:%M:%S", "%H:%M:%S %:z", "%H:%M:%S %:z"],
        date_time_separator: " ",
    },
    LocaleData {
        language: "de",
        region: "DE",
        chrono: chrono::Locale::de_DE,
        decimal_separator: ',',
        grouping_separator: '.',
        currency_symbol: "€",
        currency_prefix: false,
        currency_spacing: "\u{a0}",
        currency_digits: 2,
        percent_spacing: "\u{a0}",
        date_patterns: ["%d.%m.%y", "%d.%m.%Y", "%-d. %B %Y", "%A, %-d. %B %Y"],
        time_patterns: ["%H:%M", "%H:%M:%S", "%H:%M:%S %:z", "%H:%M:%S %:z"],
        date_time_separator: ", ",
    },
    LocaleData {
        language: "es",
        region: "ES",
        chrono: chrono::Locale::es_ES,
        decimal_separator: ',',
        grouping_separator: '.',
        currency_symbol: "€",
        currency_prefix: false,
        currency_spacing: "\u{a0}",
        currency_digits: 2,
        percent_spacing: "\u{a0}",
        date_patterns: ["%-d/%-m/%y", "%-d %b %Y", "%-d de %B de %Y", "%A, %-d de %B de %Y"],
        time_patterns: ["%-H:%M", "%-H:%M:%S", "%-H:%M:%S %:z", "%-H:%M:%S %:z"],
        date_time_separator: ", ",
    },
    LocaleData {
        language: "it",
        region: "IT",
        chrono: chrono::Locale::it_IT,
        decimal_separator: ',',
        grouping_separator: '.',
        currency_symbol: "€",
        currency_prefix: false,
        currency_spacing: "\u{a0}",
        currency_digits: 2,
        percent_spacing: "",
        date_patterns: ["%d/%m/%y", "%-d %b %Y", "%-d %B %Y", "%A %-d %B %Y"],
        time_patterns: ["%H:%M", "%H:%M:%S", "%H:%M:%S %:z", "%H:%M:%S %:z"],
        date_time_separator: ", ",
    },
    LocaleData {
        language: "ja",
        region: "JP",
        chrono: chrono::Locale::ja_JP,
        decimal_separator: '.',
        grouping_separator: ',',
        currency_symbol: "￥",
        currency_prefix: true,
        currency_spacing: "",
        currency_digits: 0,
        percent_spacing: "",
        date_patterns: ["%Y/%m/%d", "%Y/%m/%d", "%Y年%-m月%-d日", "%Y年%-m月%-d日 %A"],
        time_patterns: ["%H:%M", "%H:%M:%S", "%H:%M:%S %:z", "%H:%M:%S %:z"],
        date_time_separator: " ",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_separators() {
        assert_eq!(Locale::parse("en-US"), Locale::new("en", Some("US")));
        assert_eq!(Locale::parse("fr_fr"), Locale::new("fr", Some("FR")));
        assert_eq!(Locale::parse("de").region(), None);
        assert_eq!(Locale::parse(""), Locale::default());
    }

    #[test]
    fn tag_uses_hyphen() {
        assert_eq!(Locale::parse("pt_BR").tag(), "pt-BR");
        assert_eq!(Locale::parse("ja").to_string(), "ja");
    }

    #[test]
    fn bundle_suffixes_most_specific_first() {
        assert_eq!(
            Locale::parse("en-GB").bundle_suffixes(),
            vec!["_en_GB".to_string(), "_en".to_string(), String::new()]
        );
        assert_eq!(
            Locale::parse("de").bundle_suffixes(),
            vec!["_de".to_string(), String::new()]
        );
    }

    #[test]
    fn data_falls_back_by_language_then_default() {
        assert_eq!(Locale::parse("en-GB").data().currency_symbol, "£");
        assert_eq!(Locale::parse("de-AT").data().region, "DE");
        assert_eq!(Locale::parse("xx-YY").data().region, "US");
    }

    #[test]
    fn groups_digits_from_the_right() {
        assert_eq!(group_digits("1", ','), "1");
        assert_eq!(group_digits("1234", ','), "1,234");
        assert_eq!(group_digits("123456", ','), "123,456");
        assert_eq!(group_digits("1234567", '.'), "1.234.567");
    }

    #[test]
    fn format_decimal_uses_locale_separators() {
        let en = Locale::default();
        let de = Locale::parse("de-DE");
        assert_eq!(en.data().format_decimal(1234.5, 2, true), "1,234.50");
        assert_eq!(de.data().format_decimal(1234.5, 2, true), "1.234,50");
        assert_eq!(en.data().format_decimal(1234.4, 0, false), "1234");
    }
}
