/*!
 * Code protection for translated text.
 *
 * Fenced code blocks and inline code spans are swapped for placeholder
 * tokens before the body goes to the provider, then swapped back once the
 * translation returns. Links are left in place; the prompt tells the model
 * not to touch their structure.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// Fenced blocks first, inline spans second, leftmost match wins
static CODE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*?```|`[^`\n]+`").unwrap());

const TOKEN_OPEN: char = '⟦';
const TOKEN_CLOSE: char = '⟧';
const TOKEN_TAG: &str = "CODE_";

/// What a guarded span protects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    InlineCode,
    FencedBlock,
}

/// One protected region of the original body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedSpan {
    pub kind: SpanKind,
    /// Byte range in the unguarded body
    pub range: Range<usize>,
    pub placeholder: String,
    pub original: String,
}

/// A body with its code replaced by placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedBody {
    pub text: String,
    pub spans: Vec<GuardedSpan>,
}

/// Result of putting the protected spans back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    pub text: String,
    /// Spans whose placeholder was not found in the translated text
    pub missing: Vec<GuardedSpan>,
}

impl Restored {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Placeholder protection for Markdown bodies
pub struct ContentGuard;

impl ContentGuard {
    /// Replace every fenced block and inline code span with a unique token
    pub fn protect(body: &str) -> GuardedBody {
        let open = Self::token_prefix(body);
        let mut text = String::with_capacity(body.len());
        let mut spans = Vec::new();
        let mut last = 0;

        for found in CODE_REGEX.find_iter(body) {
            let original = found.as_str();
            let kind = if original.starts_with("```") {
                SpanKind::FencedBlock
            } else {
                SpanKind::InlineCode
            };
            let placeholder = format!("{}{}{}{}", open, TOKEN_TAG, spans.len(), TOKEN_CLOSE);

            text.push_str(&body[last..found.start()]);
            text.push_str(&placeholder);
            last = found.end();

            spans.push(GuardedSpan {
                kind,
                range: found.range(),
                placeholder,
                original: original.to_string(),
            });
        }
        text.push_str(&body[last..]);

        GuardedBody { text, spans }
    }

    /// Put the original code back. Placeholders that vanished are reported,
    /// never fatal here.
    pub fn restore(translated: &str, spans: &[GuardedSpan]) -> Restored {
        let mut text = translated.to_string();
        let mut missing = Vec::new();

        for span in spans {
            if text.contains(&span.placeholder) {
                text = text.replace(&span.placeholder, &span.original);
            } else {
                missing.push(span.clone());
            }
        }

        Restored { text, missing }
    }

    /// Smallest run of opening brackets that never occurs in front of the
    /// tag in `body`, so placeholders cannot collide with document text
    fn token_prefix(body: &str) -> String {
        let mut open = TOKEN_OPEN.to_string();
        while body.contains(&format!("{}{}", open, TOKEN_TAG)) {
            open.push(TOKEN_OPEN);
        }
        open
    }
}
