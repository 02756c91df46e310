//! Output-format escapers.
//!
//! Non-string scalars are escaped through their display form, so
//! `{{count:^json}}` behaves the same as it would for a string.

use httprpc_beans::Scalar;

use super::ModifierRegistry;

pub(super) fn register(registry: &mut ModifierRegistry) {
    registry.register_fn("^html", |value, _, _| escape_with(value, escape_markup));
    registry.register_fn("^xml", |value, _, _| escape_with(value, escape_markup));
    registry.register_fn("^json", |value, _, _| escape_with(value, escape_json));
    registry.register_fn("^csv", |value, _, _| escape_with(value, escape_csv));
    registry.register_fn("^url", |value, _, _| escape_with(value, escape_url));
}

fn escape_with(value: Scalar, escape: fn(&str) -> String) -> Scalar {
    match &value {
        Scalar::String(s) => Scalar::String(escape(s)),
        other => Scalar::String(escape(&other.to_string())),
    }
}

/// Replaces `< > & "` with entity references.
pub fn escape_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// Escapes text for use inside a JSON string literal.
pub fn escape_json(s: &str) -> String {
    match serde_json::to_string(s) {
        Ok(quoted) => quoted[1..quoted.len() - 1].to_string(),
        Err(_) => s.to_string(),
    }
}

/// Backslash-escapes `"` and `\` for use inside a quoted CSV field.
pub fn escape_csv(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Form-urlencodes text: spaces become `+`, reserved bytes become `%XX`.
pub fn escape_url(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_escapes_the_four_specials() {
        assert_eq!(escape_markup(r#"<a href="x">&</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
        assert_eq!(escape_markup("héllo 'world'"), "héllo 'world'");
    }

    #[test]
    fn json_escapes_quotes_and_controls() {
        assert_eq!(escape_json("a\"b\\c\nd\te"), "a\\\"b\\\\c\\nd\\te");
        assert_eq!(escape_json("\u{1}"), "\\u0001");
        assert_eq!(escape_json("日本"), "日本");
    }

    #[test]
    fn csv_backslash_escapes() {
        assert_eq!(escape_csv(r#"say "hi" \o/"#), r#"say \"hi\" \\o/"#);
        assert_eq!(escape_csv("a,b"), "a,b");
    }

    #[test]
    fn url_uses_form_encoding() {
        assert_eq!(escape_url("a b&c=d/é"), "a+b%26c%3Dd%2F%C3%A9");
    }

    #[test]
    fn numbers_are_escaped_through_display() {
        assert_eq!(escape_with(Scalar::from(1.5), escape_url), Scalar::from("1.5"));
        assert_eq!(escape_with(Scalar::from(true), escape_markup), Scalar::from("true"));
    }
}
