//! The render surface a chat session draws into.

use std::ops::Range;

/// Output side of a chat session.
///
/// Offsets are byte positions in the surface's markup. The session keeps the
/// range returned for the in-progress reply and passes it back to
/// [`ChatSurface::insert`] on every update.
pub trait ChatSurface {
    /// Current end offset of the markup.
    fn end(&self) -> usize;

    /// Replace `range` with `markup` and return the range it now occupies.
    fn insert(&mut self, range: Range<usize>, markup: &str) -> Range<usize>;

    fn append_block(&mut self, markup: &str) -> Range<usize> {
        let end = self.end();
        self.insert(end..end, markup)
    }

    fn scroll_to_end(&mut self) {}

    fn clear(&mut self);

    fn set_send_enabled(&mut self, enabled: bool, label: &str);

    fn show_notice(&mut self, title: &str, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

/// In-memory HTML transcript.
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    markup: String,
    send_enabled: bool,
    send_label: String,
    notices: Vec<Notice>,
    scrolls: usize,
}

impl Default for HtmlDocument {
    fn default() -> Self {
        Self {
            markup: String::new(),
            send_enabled: true,
            send_label: "Send".to_string(),
            notices: Vec::new(),
            scrolls: 0,
        }
    }
}

impl HtmlDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn slice(&self, range: Range<usize>) -> Option<&str> {
        self.markup.get(range)
    }

    pub fn send_enabled(&self) -> bool {
        self.send_enabled
    }

    pub fn send_label(&self) -> &str {
        &self.send_label
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn scroll_count(&self) -> usize {
        self.scrolls
    }

    /// Standalone HTML page holding the transcript.
    pub fn to_page(&self, title: &str) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body style=\"font-family:sans-serif;max-width:860px;margin:0 auto;\">\n{}\n</body>\n</html>\n",
            crate::utils::html::escape_html(title),
            self.markup
        )
    }
}

fn clamp(range: Range<usize>, len: usize) -> Range<usize> {
    let end = range.end.min(len);
    range.start.min(end)..end
}

impl ChatSurface for HtmlDocument {
    fn end(&self) -> usize {
        self.markup.len()
    }

    fn insert(&mut self, range: Range<usize>, markup: &str) -> Range<usize> {
        let range = clamp(range, self.markup.len());
        let start = range.start;
        self.markup.replace_range(range, markup);
        start..start + markup.len()
    }

    fn scroll_to_end(&mut self) {
        self.scrolls += 1;
    }

    fn clear(&mut self) {
        self.markup.clear();
    }

    fn set_send_enabled(&mut self, enabled: bool, label: &str) {
        self.send_enabled = enabled;
        self.send_label = label.to_string();
    }

    fn show_notice(&mut self, title: &str, message: &str) {
        self.notices.push(Notice {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_exactly_the_given_range() {
        let mut doc = HtmlDocument::new();
        doc.append_block("<div>user</div>");
        let placeholder = doc.append_block("<div>...</div>");
        doc.append_block("<hr>");

        let updated = doc.insert(placeholder, "<div>The answer</div>");
        assert_eq!(doc.markup(), "<div>user</div><div>The answer</div><hr>");
        assert_eq!(doc.slice(updated), Some("<div>The answer</div>"));
    }

    #[test]
    fn successive_inserts_track_growing_content() {
        let mut doc = HtmlDocument::new();
        let mut region = doc.append_block("<p>.</p>");
        for text in ["<p>The</p>", "<p>The answer</p>", "<p>The answer is 42.</p>"] {
            region = doc.insert(region, text);
        }
        assert_eq!(doc.markup(), "<p>The answer is 42.</p>");
        assert_eq!(region, 0..doc.end());
    }

    #[test]
    fn out_of_bounds_ranges_are_clamped() {
        let mut doc = HtmlDocument::new();
        doc.append_block("abc");
        let range = doc.insert(10..20, "d");
        assert_eq!(doc.markup(), "abcd");
        assert_eq!(range, 3..4);
    }

    #[test]
    fn send_state_and_notices_are_recorded() {
        let mut doc = HtmlDocument::new();
        assert!(doc.send_enabled());
        doc.set_send_enabled(false, "Thinking...");
        doc.show_notice("Warning", "Please enter a message");
        assert!(!doc.send_enabled());
        assert_eq!(doc.send_label(), "Thinking...");
        assert_eq!(doc.notices()[0].message, "Please enter a message");
    }
}
