//! Rendering of chat text into HTML.
//!
//! Replies come from a remote service and are untrusted. They go through an
//! allow-list sanitizer: permitted tags survive without any attribute,
//! `script`/`style` elements disappear with their contents, and every other
//! tag is dropped while its text is kept (escaped). The `**bold**` convention
//! is applied after sanitizing.

/// Tags that may appear in rendered replies. Attributes are always dropped.
const ALLOWED_TAGS: &[&str] = &[
    "b", "strong", "i", "em", "p", "br", "ul", "ol", "li", "code",
];

/// Elements removed together with their contents.
const STRIPPED_ELEMENTS: &[&str] = &["script", "style"];

/// Escape text for use in HTML element content or attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        push_escaped(&mut out, ch);
    }
    out
}

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        _ => out.push(ch),
    }
}

/// Render an assistant reply to safe HTML.
#[must_use]
pub fn render_reply(text: &str) -> String {
    line_breaks(&bold(&sanitize(text)))
}

/// Render a visitor message to safe HTML. No markup is honoured.
#[must_use]
pub fn render_user(text: &str) -> String {
    line_breaks(&escape_html(text))
}

/// Apply the tag allow-list to untrusted HTML.
#[must_use]
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(ch) = rest.chars().next() {
        if ch == '<' {
            if let Some(tag) = Tag::parse(rest) {
                rest = &rest[tag.len..];
                let name = tag.name.to_ascii_lowercase();
                if STRIPPED_ELEMENTS.contains(&name.as_str()) {
                    if !tag.closing {
                        rest = skip_element_body(rest, &name);
                    }
                } else if ALLOWED_TAGS.contains(&name.as_str()) {
                    match (tag.closing, name.as_str()) {
                        (true, "br") => {}
                        (false, "br") => out.push_str("<br>"),
                        (true, _) => {
                            out.push_str("</");
                            out.push_str(&name);
                            out.push('>');
                        }
                        (false, _) => {
                            out.push('<');
                            out.push_str(&name);
                            out.push('>');
                        }
                    }
                }
                continue;
            }
        }
        push_escaped(&mut out, ch);
        rest = &rest[ch.len_utf8()..];
    }
    out
}

/// A tag recognised at the start of the input.
#[derive(Debug)]
struct Tag<'a> {
    name: &'a str,
    closing: bool,
    /// Bytes consumed, including the closing `>`.
    len: usize,
}

impl<'a> Tag<'a> {
    fn parse(input: &'a str) -> Option<Self> {
        let body = input.strip_prefix('<')?;
        let (closing, body) = match body.strip_prefix('/') {
            Some(stripped) => (true, stripped),
            None => (false, body),
        };
        let name_len = body
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(body.len());
        if name_len == 0 || !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return None;
        }
        let name = &body[..name_len];
        let after_name = &body[name_len..];
        if !after_name.starts_with(|c: char| c == '>' || c == '/' || c.is_ascii_whitespace()) {
            return None;
        }
        let close = find_tag_end(after_name)?;
        let len = input.len() - after_name.len() + close + 1;
        Some(Self { name, closing, len })
    }
}

/// Find the `>` ending a tag, skipping over quoted attribute values.
fn find_tag_end(input: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (offset, ch) in input.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '>') => return Some(offset),
            (None, _) => {}
        }
    }
    None
}

/// Skip everything up to and including `</name>`, or to the end of input.
fn skip_element_body<'a>(input: &'a str, name: &str) -> &'a str {
    let lower = input.to_ascii_lowercase();
    let closing = format!("</{name}");
    let mut search_from = 0;
    while let Some(found) = lower[search_from..].find(&closing) {
        let start = search_from + found;
        if let Some(tag) = Tag::parse(&input[start..]) {
            if tag.closing {
                return &input[start + tag.len..];
            }
        }
        search_from = start + closing.len();
    }
    ""
}

/// Turn `**text**` pairs into `<strong>` elements. An unmatched marker is
/// kept literally, which keeps partial frames of a reveal readable.
fn bold(text: &str) -> String {
    let parts: Vec<&str> = text.split("**").collect();
    let pairs = (parts.len() - 1) / 2;
    let mut out = String::with_capacity(text.len());
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            let marker = index - 1;
            if marker < pairs * 2 {
                out.push_str(if marker % 2 == 0 { "<strong>" } else { "</strong>" });
            } else {
                out.push_str("**");
            }
        }
        out.push_str(part);
    }
    out
}

fn line_breaks(html: &str) -> String {
    html.replace("\r\n", "\n").replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_removed_with_body() {
        let html = render_reply("Hi<script>alert('x')</script> there");
        assert_eq!(html, "Hi there");
        assert!(!html.to_lowercase().contains("<script"));
    }

    #[test]
    fn test_uppercase_script_removed() {
        let html = sanitize("<SCRIPT src=\"x.js\">evil()</Script>ok");
        assert_eq!(html, "ok");
    }

    #[test]
    fn test_unterminated_script_drops_rest() {
        assert_eq!(sanitize("a<script>never closed"), "a");
    }

    #[test]
    fn test_attributes_dropped_from_allowed_tags() {
        let html = sanitize(r#"<b onclick="steal()">bold</b> <em class='x' style="a>b">e</em>"#);
        assert_eq!(html, "<b>bold</b> <em>e</em>");
        assert!(!html.contains('='));
    }

    #[test]
    fn test_unknown_tags_stripped_text_kept() {
        let html = sanitize(r#"<a href="javascript:x()">link</a><img src=x onerror=alert(1)>"#);
        assert_eq!(html, "link");
    }

    #[test]
    fn test_stray_angle_brackets_escaped() {
        assert_eq!(sanitize("1 < 2 && 3 > 2"), "1 &lt; 2 &amp;&amp; 3 &gt; 2");
        assert_eq!(sanitize("<!-- hi -->"), "&lt;!-- hi --&gt;");
    }

    #[test]
    fn test_br_normalised() {
        assert_eq!(sanitize("a<br/>b<BR class=\"x\">c</br>"), "a<br>b<br>c");
    }

    #[test]
    fn test_bold_pairs() {
        assert_eq!(
            render_reply("We do **SEO** and **ads**."),
            "We do <strong>SEO</strong> and <strong>ads</strong>."
        );
    }

    #[test]
    fn test_unmatched_bold_kept_literal() {
        assert_eq!(render_reply("**SEO** and **ad"), "<strong>SEO</strong> and **ad");
        assert_eq!(render_reply("**"), "**");
    }

    #[test]
    fn test_newlines_become_breaks() {
        assert_eq!(render_reply("one\ntwo"), "one<br>two");
    }

    #[test]
    fn test_user_text_fully_escaped() {
        assert_eq!(
            render_user("<b>hi</b> **x**"),
            "&lt;b&gt;hi&lt;/b&gt; **x**"
        );
    }
}
