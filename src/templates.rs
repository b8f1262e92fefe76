//! HTML templates and strict placeholder formatting.
//!
//! Placeholders are single-brace `{name}` fields. `{{` and `}}` escape literal
//! braces. A field whose name is not in the substitution set is an error, so
//! a template can never ship with an unfilled hole.

use std::borrow::Cow;
use std::path::Path;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{info, warn};

use crate::error::TemplateError;

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

/// Substitute `{name}` fields in `template` from `vars`.
pub fn format_placeholders(template: &str, vars: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
            offset += pos + 2;
            continue;
        }
        if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
            offset += pos + 2;
            continue;
        }
        if tail.starts_with('}') {
            return Err(TemplateError::Malformed {
                position: offset + pos,
                reason: "single '}' encountered".to_string(),
            });
        }

        let Some(end) = tail[1..].find(['{', '}']) else {
            return Err(TemplateError::Malformed {
                position: offset + pos,
                reason: "unclosed '{'".to_string(),
            });
        };
        if tail.as_bytes()[end + 1] == b'{' {
            return Err(TemplateError::Malformed {
                position: offset + pos,
                reason: "nested '{' inside placeholder".to_string(),
            });
        }

        let name = &tail[1..end + 1];
        if name.is_empty() {
            return Err(TemplateError::Malformed {
                position: offset + pos,
                reason: "empty placeholder".to_string(),
            });
        }

        let value = vars
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| TemplateError::UnknownPlaceholder {
                name: name.to_string(),
            })?;
        out.push_str(value);

        rest = &tail[end + 2..];
        offset += pos + end + 2;
    }

    out.push_str(rest);
    Ok(out)
}

/// Read a template file. Placeholders are filled later with
/// `format_placeholders`.
pub fn load_template(path: impl AsRef<Path>) -> Result<String, TemplateError> {
    let path = path.as_ref();
    info!(path = %path.display(), "Loading HTML template");
    std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Escape text for inclusion in HTML element content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Return the inner content of `<body>` if the model wrapped its answer in a
/// full document, otherwise the input unchanged.
pub fn extract_html_body(html: &str) -> Cow<'_, str> {
    if !html.to_ascii_lowercase().contains("<body") {
        warn!("No <body> tag found in LLM response, using content as-is");
        return Cow::Borrowed(html);
    }
    let document = Html::parse_document(html);
    match document.select(&BODY).next() {
        Some(body) => Cow::Owned(body.inner_html()),
        None => {
            warn!("No <body> element found in LLM response, using content as-is");
            Cow::Borrowed(html)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn formats_known_placeholders() {
        let out = format_placeholders(
            "<p>Ref {complaint_id} from {company_name}</p>",
            &[("complaint_id", "abc-123"), ("company_name", "PENCOM")],
        )
        .unwrap();
        assert_eq!(out, "<p>Ref abc-123 from PENCOM</p>");
    }

    #[test]
    fn unknown_placeholder_is_error() {
        let err = format_placeholders(
            "<p>{complaint_id} {unexpected}</p>",
            &[("complaint_id", "abc-123"), ("company_name", "PENCOM")],
        )
        .unwrap_err();
        match err {
            TemplateError::UnknownPlaceholder { name } => assert_eq!(name, "unexpected"),
            other => panic!("expected UnknownPlaceholder, got {other:?}"),
        }
    }

    #[test]
    fn double_braces_are_literal() {
        let out = format_placeholders("p {{ margin: 0 }} {x}", &[("x", "1")]).unwrap();
        assert_eq!(out, "p { margin: 0 } 1");
    }

    #[test]
    fn unused_variables_are_fine() {
        let out = format_placeholders("plain text", &[("x", "1")]).unwrap();
        assert_eq!(out, "plain text");
    }

    #[test]
    fn substituted_values_are_not_reformatted() {
        let out = format_placeholders("{a}", &[("a", "{b}")]).unwrap();
        assert_eq!(out, "{b}");
    }

    #[test]
    fn malformed_braces_are_errors() {
        assert!(matches!(
            format_placeholders("open {x", &[("x", "1")]),
            Err(TemplateError::Malformed { .. })
        ));
        assert!(matches!(
            format_placeholders("close } only", &[]),
            Err(TemplateError::Malformed { .. })
        ));
        assert!(matches!(
            format_placeholders("empty {}", &[]),
            Err(TemplateError::Malformed { .. })
        ));
        assert!(matches!(
            format_placeholders("{a{b}}", &[]),
            Err(TemplateError::Malformed { .. })
        ));
    }

    #[test]
    fn handles_multibyte_text_around_placeholders() {
        let out = format_placeholders("Réf. {id} — merci", &[("id", "42")]).unwrap();
        assert_eq!(out, "Réf. 42 — merci");
    }

    #[test]
    fn escape_html_replaces_markup() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#x27;Jerry&#x27;&lt;/b&gt;"
        );
    }

    #[test]
    fn extract_body_from_full_document() {
        let html = "<!DOCTYPE html><html><head><title>x</title></head>\
                    <BODY class=\"mail\"><p>Hello</p><p>World</p></BODY></html>";
        assert_eq!(extract_html_body(html), "<p>Hello</p><p>World</p>");
    }

    #[test]
    fn extract_body_without_wrapper_returns_input() {
        let html = "<p>Dear Sir/Ma</p>";
        assert_eq!(extract_html_body(html), html);
    }

    #[test]
    fn extract_body_with_unclosed_tag_keeps_remainder() {
        let html = "<html><body><p>Truncated";
        assert_eq!(extract_html_body(html), "<p>Truncated</p>");
    }

    #[test]
    fn extract_body_ignores_body_marker_in_head_comment() {
        let html = "<html><head><!-- template <body> marker --></head>\
                    <body><p>Hi</p></body></html>";
        assert_eq!(extract_html_body(html), "<p>Hi</p>");
    }

    #[test]
    fn extract_body_keeps_placeholders() {
        let html = "<html><head><style>p { color: red }</style></head>\
                    <body><p>Ref {complaint_id} from {company_name}</p></body></html>";
        assert_eq!(
            extract_html_body(html),
            "<p>Ref {complaint_id} from {company_name}</p>"
        );
    }

    #[test]
    fn load_template_fills_placeholders() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<h1>{{unit_name}}</h1>").unwrap();
        let template = load_template(file.path()).unwrap();
        let out = format_placeholders(&template, &[("unit_name", "RSA")]).unwrap();
        assert_eq!(out, "<h1>RSA</h1>");
    }

    #[test]
    fn load_template_missing_file() {
        let err = load_template("/nonexistent/template.html").unwrap_err();
        assert!(matches!(err, TemplateError::Io { .. }));
    }
}
