//! Inline style sets applied to rendered markup.

/// Inline CSS for each tag the renderer re-styles.
///
/// Headings of every level share one style and are emitted as `h3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupTheme {
    pub name: &'static str,
    pub heading: &'static str,
    pub list: &'static str,
    pub list_item: &'static str,
    pub paragraph: &'static str,
    pub strong: &'static str,
    pub code: &'static str,
    /// `None` leaves blockquotes unstyled.
    pub blockquote: Option<&'static str>,
}

impl MarkupTheme {
    /// Used inside the chat transcript.
    pub fn chat() -> Self {
        Self {
            name: "chat",
            heading: "color:#111827;font-weight:600;line-height:1.2;margin:8px 0 4px 0;font-size:1.1rem;",
            list: "margin:8px 0;padding-left:20px;color:#111827;",
            list_item: "margin:2px 0;color:#111827;",
            paragraph: "margin:4px 0;color:#111827;line-height:1.4;",
            strong: "font-weight:600;color:#111827;",
            code: "background-color:#f3f4f6;color:#dc2626;padding:2px 4px;border-radius:3px;font-family:monospace;font-size:0.9em;",
            blockquote: Some("margin:8px 0;padding:8px 12px;border-left:3px solid #e5e7eb;background-color:#f9fafb;color:#6b7280;font-style:italic;"),
        }
    }

    /// Compact, left-aligned variant written into card fields.
    pub fn card() -> Self {
        Self {
            name: "card",
            heading: "color:#333333;font-weight:600;line-height:1.2;margin:0;padding:0;text-align:left;font-size:1.2rem;display:block;",
            list: "margin:0;padding:0 0 0 1.5rem;text-align:left;display:block;",
            list_item: "margin:0;padding:0;text-align:left;display:list-item;",
            paragraph: "margin:0;padding:0;text-align:left;line-height:1.2;display:block;",
            strong: "font-weight:600;color:#333333;",
            code: "background-color:#f3f4f6;color:#dc2626;padding:2px 4px;border-radius:3px;font-family:monospace;font-size:0.875em;",
            blockquote: None,
        }
    }
}

// Transcript blocks.
pub const USER_BLOCK_STYLE: &str = "margin:12px 0;padding:12px 16px;border:1px solid #e5e7eb;color:#111827;font-size:14px;max-width:75%;margin-left:auto;line-height:1.5;";
pub const ASSISTANT_BLOCK_STYLE: &str = "margin:12px 0;padding:12px 16px;border:1px solid #e5e7eb;color:#111827;font-size:14px;max-width:75%;margin-right:auto;line-height:1.5;";
pub const SYSTEM_BLOCK_STYLE: &str = "margin:12px 0;padding:12px 16px;background-color:#f9fafb;border:1px solid #e5e7eb;font-size:14px;font-style:italic;text-align:center;";
pub const PLACEHOLDER_BLOCK_STYLE: &str = "margin:12px 0;padding:8px 16px;color:#6b7280;font-size:14px;max-width:75%;margin-right:auto;line-height:1.5;font-style:italic;";
pub const ERROR_BLOCK_STYLE: &str = "margin:12px 0;padding:12px 16px;background-color:#fef2f2;border:1px solid #fca5a5;color:#dc2626;font-size:14px;max-width:75%;margin-right:auto;line-height:1.5;";

// Card writeback blocks.
pub const QUESTION_LABEL_COLOR: &str = "#2563eb";
pub const ANSWER_LABEL_COLOR: &str = "#059669";
pub const CARD_BLOCK_STYLE: &str =
    "padding:12px 16px;border:1px solid #e5e7eb;text-align:left;line-height:1.2;display:block;";
pub const CARD_SEPARATOR: &str =
    r#"<hr style="margin: 6px 0; padding: 0; border: none; border-top: 1px solid #e5e7eb;">"#;
