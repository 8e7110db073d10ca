//! Small HTML helpers shared by the renderer, the card store and the
//! terminal surface.

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Escaped text with explicit `<br>` line breaks. Never fails.
pub fn plain_text_markup(text: &str) -> String {
    escape_html(text).replace("\r\n", "\n").replace('\n', "<br>")
}

pub fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Iterate over `(is_tag, slice)` segments of `html`. An unterminated `<`
/// is treated as text.
fn segments(html: &str) -> impl Iterator<Item = (bool, &str)> {
    let mut rest = html;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        if rest.starts_with('<') {
            if let Some(end) = rest.find('>') {
                let (tag, tail) = rest.split_at(end + 1);
                rest = tail;
                return Some((true, tag));
            }
            let text = rest;
            rest = "";
            return Some((false, text));
        }
        let end = rest.find('<').unwrap_or(rest.len());
        let (text, tail) = rest.split_at(end);
        rest = tail;
        Some((false, text))
    })
}

/// Plain text of a card field: tags removed, whitespace collapsed,
/// basic entities decoded.
pub fn extract_text_from_html(html: &str) -> String {
    let stripped: String = segments(html)
        .filter(|(is_tag, _)| !is_tag)
        .map(|(_, text)| text)
        .collect();
    unescape_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('<')
        .trim_end_matches('>')
        .trim_end_matches('/')
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Readable text for rendered chat markup, keeping block boundaries as
/// line breaks.
pub fn markup_to_plain(markup: &str) -> String {
    let mut out = String::new();
    for (is_tag, slice) in segments(markup) {
        if !is_tag {
            out.push_str(&unescape_entities(slice));
            continue;
        }
        match tag_name(slice).as_str() {
            "br" => out.push('\n'),
            "/p" | "/h3" | "/li" | "/blockquote" | "/pre" | "/div" => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            "li" => out.push_str("- "),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn plain_text_markup_converts_line_breaks() {
        assert_eq!(plain_text_markup("a < b\nc\r\nd"), "a &lt; b<br>c<br>d");
    }

    #[test]
    fn extract_text_strips_tags_and_collapses_whitespace() {
        let html = "<div class=\"front\">  What is <b>2&nbsp;+&nbsp;2</b>?\n</div><br>";
        assert_eq!(extract_text_from_html(html), "What is 2 + 2?");
        assert_eq!(extract_text_from_html(""), "");
    }

    #[test]
    fn extract_text_keeps_unterminated_angle_bracket() {
        assert_eq!(extract_text_from_html("1 <2"), "1 <2");
    }

    #[test]
    fn markup_to_plain_keeps_block_boundaries() {
        let markup = "<p style=\"x\">Hello &amp; bye</p><ul><li>one</li><li>two</li></ul>a<br>b";
        assert_eq!(markup_to_plain(markup), "Hello & bye\n- one\n- two\na\nb");
    }
}
