//! Message renderer: lightweight markup in, styled HTML out.
//!
//! Rich conversion goes through pulldown-cmark with every re-styled tag
//! emitted as raw HTML carrying the theme's inline style. Anything that
//! cannot be converted falls back to escaped text with `<br>` line breaks;
//! [`MessageRenderer::render`] itself never fails.

use std::error::Error;
use std::fmt;

use tracing::warn;

use crate::ui::theme::{
    MarkupTheme, ANSWER_LABEL_COLOR, ASSISTANT_BLOCK_STYLE, CARD_BLOCK_STYLE, ERROR_BLOCK_STYLE,
    PLACEHOLDER_BLOCK_STYLE, QUESTION_LABEL_COLOR, SYSTEM_BLOCK_STYLE, USER_BLOCK_STYLE,
};
use crate::utils::html::{escape_html, plain_text_markup};

const RICH_MARKERS: &[char] = &['#', '*', '`', '[', ']', '_', '~', '>', '-'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Markdown turned off in configuration.
    Disabled,
    /// Built without the `markdown` feature.
    Unavailable,
    /// The converter panicked.
    Failed(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Disabled => write!(f, "markdown rendering is disabled"),
            RenderError::Unavailable => write!(f, "markdown support was not compiled in"),
            RenderError::Failed(reason) => write!(f, "markdown conversion failed: {reason}"),
        }
    }
}

impl Error for RenderError {}

/// Whether `text` carries any markup worth converting.
pub fn needs_rich_processing(text: &str) -> bool {
    text.contains(RICH_MARKERS) || text.contains("\n\n") || text.lines().any(starts_ordered_item)
}

/// `1. item` or `2) item`: a digit run, `.` or `)`, then whitespace.
fn starts_ordered_item(line: &str) -> bool {
    let line = line.trim_start();
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return false;
    }
    let mut rest = line[digits..].chars();
    matches!(rest.next(), Some('.' | ')')) && rest.next().map_or(true, char::is_whitespace)
}

#[derive(Debug, Clone)]
pub struct MessageRenderer {
    theme: MarkupTheme,
    markdown_enabled: bool,
}

impl MessageRenderer {
    pub fn new(theme: MarkupTheme, markdown_enabled: bool) -> Self {
        Self {
            theme,
            markdown_enabled,
        }
    }

    /// Styled markup for `text`; plain text skips conversion entirely.
    pub fn render(&self, text: &str) -> String {
        if !needs_rich_processing(text) {
            return plain_text_markup(text);
        }
        match self.try_render_rich(text) {
            Ok(html) => html,
            Err(RenderError::Disabled) => plain_text_markup(text),
            Err(err) => {
                warn!(error = %err, theme = self.theme.name, "falling back to plain text");
                plain_text_markup(text)
            }
        }
    }

    pub fn try_render_rich(&self, text: &str) -> Result<String, RenderError> {
        if !self.markdown_enabled {
            return Err(RenderError::Disabled);
        }
        self.convert(text)
    }

    #[cfg(feature = "markdown")]
    fn convert(&self, text: &str) -> Result<String, RenderError> {
        let theme = &self.theme;
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| styled::to_html(text, theme)))
            .map_err(|panic| {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                RenderError::Failed(reason)
            })
    }

    #[cfg(not(feature = "markdown"))]
    fn convert(&self, _text: &str) -> Result<String, RenderError> {
        Err(RenderError::Unavailable)
    }

    pub fn assistant_block(&self, text: &str) -> String {
        format!(
            r#"<div style="{ASSISTANT_BLOCK_STYLE}">{}</div>"#,
            self.render(text)
        )
    }

    /// Card writeback block with a "Question:" or "Answer:" label.
    pub fn card_block(&self, text: &str, is_question: bool) -> String {
        let (label, color, margin_bottom) = if is_question {
            ("Question:", QUESTION_LABEL_COLOR, "8px")
        } else {
            ("Answer:", ANSWER_LABEL_COLOR, "16px")
        };
        let label = format!(r#"<span style="color:{color};font-weight:600;">{label}</span>"#);
        if needs_rich_processing(text) {
            format!(
                r#"<div style="margin:0 0 {margin_bottom} 0;{CARD_BLOCK_STYLE}">{label}<br>{}</div>"#,
                self.render(text)
            )
        } else {
            format!(
                r#"<p style="margin:0 0 {margin_bottom} 0;{CARD_BLOCK_STYLE}">{label} {}</p>"#,
                escape_html(text)
            )
        }
    }
}

pub fn user_block(text: &str) -> String {
    format!(
        r#"<div style="{USER_BLOCK_STYLE}">{}</div>"#,
        plain_text_markup(text)
    )
}

pub fn system_block(text: &str) -> String {
    format!(
        r#"<div style="{SYSTEM_BLOCK_STYLE}">{}</div>"#,
        plain_text_markup(text)
    )
}

pub fn placeholder_block(text: &str) -> String {
    format!(
        r#"<div style="{PLACEHOLDER_BLOCK_STYLE}">{}</div>"#,
        escape_html(text)
    )
}

pub fn error_block(message: &str) -> String {
    format!(
        r#"<div style="{ERROR_BLOCK_STYLE}">Error: {}</div>"#,
        plain_text_markup(message)
    )
}

#[cfg(feature = "markdown")]
mod styled {
    use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

    use crate::ui::theme::MarkupTheme;
    use crate::utils::html::escape_html;

    fn open(tag: &str, style: &str) -> CowStr<'static> {
        format!(r#"<{tag} style="{style}">"#).into()
    }

    fn close(tag: &str) -> CowStr<'static> {
        format!("</{tag}>").into()
    }

    fn restyle<'a>(event: Event<'a>, theme: &MarkupTheme) -> Event<'a> {
        match event {
            Event::Start(Tag::Heading { .. }) => Event::Html(open("h3", theme.heading)),
            Event::End(TagEnd::Heading(_)) => Event::Html(close("h3")),
            Event::Start(Tag::List(None)) => Event::Html(open("ul", theme.list)),
            Event::Start(Tag::List(Some(start))) if start != 1 => Event::Html(
                format!(r#"<ol start="{start}" style="{}">"#, theme.list).into(),
            ),
            Event::Start(Tag::List(Some(_))) => Event::Html(open("ol", theme.list)),
            Event::End(TagEnd::List(ordered)) => {
                Event::Html(close(if ordered { "ol" } else { "ul" }))
            }
            Event::Start(Tag::Item) => Event::Html(open("li", theme.list_item)),
            Event::End(TagEnd::Item) => Event::Html(close("li")),
            Event::Start(Tag::Paragraph) => Event::Html(open("p", theme.paragraph)),
            Event::End(TagEnd::Paragraph) => Event::Html(close("p")),
            Event::Start(Tag::Strong) => Event::InlineHtml(open("strong", theme.strong)),
            Event::End(TagEnd::Strong) => Event::InlineHtml(close("strong")),
            Event::Code(code) => Event::InlineHtml(
                format!(
                    r#"<code style="{}">{}</code>"#,
                    theme.code,
                    escape_html(&code)
                )
                .into(),
            ),
            Event::Start(Tag::BlockQuote(_)) => match theme.blockquote {
                Some(style) => Event::Html(open("blockquote", style)),
                None => Event::Html("<blockquote>".into()),
            },
            Event::End(TagEnd::BlockQuote(_)) => Event::Html(close("blockquote")),
            // Raw HTML from the model is shown, never interpreted.
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            other => other,
        }
    }

    pub(super) fn to_html(text: &str, theme: &MarkupTheme) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        let parser = Parser::new_ext(text, options).map(|event| restyle(event, theme));
        let mut out = String::with_capacity(text.len() * 2);
        html::push_html(&mut out, parser);
        out.trim_end().to_string()
    }
}
