//! Typesetting bridge — turns overlay markup into rendered glyphs.
//!
//! The bridge is an injectable capability so the overlay pipeline can be
//! exercised in tests with a recording fake instead of a live UI.  The
//! production implementation renders into the egui frame each repaint, so
//! "re-typeset after a content change" needs no extra scheduling.

use egui::{Color32, RichText};

/// Inline-math delimiters accepted in overlay markup, in match order.
const DELIMITERS: [(&str, &str); 2] = [("\\(", "\\)"), ("$", "$")];

/// Capability consumed by the overlay rendering path.
pub trait Typesetter {
    /// Render one overlay's markup into `ui`.
    fn typeset(&mut self, ui: &mut egui::Ui, markup: &str);

    /// Hook fired when the overlay sequence changes (item added or reset).
    fn content_changed(&mut self) {}
}

// ============================================================================
// Markup parsing
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedMarkup {
    /// The display text with delimiters and size wrapper stripped.
    pub text: String,
    /// True when the markup carried a `\LARGE{...}` wrapper.
    pub large: bool,
}

/// Strip inline-math delimiters (`\(...\)` or `$...$`) and an optional
/// `\LARGE{...}` wrapper.  Markup that doesn't match is passed through
/// verbatim — never dropped.
pub fn parse_inline_math(markup: &str) -> ParsedMarkup {
    let trimmed = markup.trim();
    let mut body = trimmed;
    for (open, close) in DELIMITERS {
        if trimmed.len() >= open.len() + close.len()
            && trimmed.starts_with(open)
            && trimmed.ends_with(close)
        {
            body = &trimmed[open.len()..trimmed.len() - close.len()];
            break;
        }
    }

    let body = body.trim();
    if let Some(rest) = body.strip_prefix("\\LARGE{") {
        if let Some(inner) = rest.strip_suffix('}') {
            return ParsedMarkup {
                text: inner.trim().to_string(),
                large: true,
            };
        }
    }
    ParsedMarkup {
        text: body.to_string(),
        large: false,
    }
}

// ============================================================================
// On-screen implementation
// ============================================================================

/// Renders parsed markup as rich text in the overlay frame.
#[derive(Default)]
pub struct ScreenTypesetter;

impl Typesetter for ScreenTypesetter {
    fn typeset(&mut self, ui: &mut egui::Ui, markup: &str) {
        let parsed = parse_inline_math(markup);
        let size = if parsed.large { 28.0 } else { 17.0 };
        ui.label(
            RichText::new(parsed.text)
                .size(size)
                .color(Color32::WHITE),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_backslash_paren_delimiters_and_large_wrapper() {
        let parsed = parse_inline_math("\\(\\LARGE{x + 2 = 7}\\)");
        assert_eq!(
            parsed,
            ParsedMarkup {
                text: "x + 2 = 7".to_string(),
                large: true
            }
        );
    }

    #[test]
    fn strips_dollar_delimiters() {
        let parsed = parse_inline_math("$a = b$");
        assert_eq!(parsed.text, "a = b");
        assert!(!parsed.large);
    }

    #[test]
    fn unmatched_markup_passes_through_verbatim() {
        let parsed = parse_inline_math("just some text");
        assert_eq!(parsed.text, "just some text");
        assert!(!parsed.large);

        // Half-open delimiters are not stripped
        let parsed = parse_inline_math("\\(dangling");
        assert_eq!(parsed.text, "\\(dangling");
    }

    #[test]
    fn generated_markup_round_trips_through_the_parser() {
        let result = crate::overlay::GeneratedResult {
            expression: "x".to_string(),
            answer: "5".to_string(),
        };
        let parsed = parse_inline_math(&result.markup());
        assert_eq!(parsed.text, "x = 5");
        assert!(parsed.large);
    }

    /// A bridge fake that records notifications, for pipeline tests.
    #[derive(Default)]
    struct RecordingTypesetter {
        notifications: usize,
    }

    impl Typesetter for RecordingTypesetter {
        fn typeset(&mut self, _ui: &mut egui::Ui, _markup: &str) {}
        fn content_changed(&mut self) {
            self.notifications += 1;
        }
    }

    #[test]
    fn content_change_notifications_reach_the_bridge() {
        let mut bridge = RecordingTypesetter::default();
        let ts: &mut dyn Typesetter = &mut bridge;
        ts.content_changed();
        ts.content_changed();
        assert_eq!(bridge.notifications, 2);
    }
}
