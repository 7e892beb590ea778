/*!
 * Prompt templates for note translation.
 *
 * The instruction tells the model which placeholders to leave alone and which
 * pieces of Markdown structure must survive, then embeds the guarded body.
 */

use crate::translation::guard::GuardedBody;

/// Instruction template for note translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default instruction for Markdown notes.
    pub const NOTE_TRANSLATOR: &'static str = r#"Translate the Markdown note below into {target_language}.

## Rules
- Return ONLY the translated note, with no commentary before or after it
- Tokens of the form {token_example} stand for code; copy every one of them exactly, once, in place
- Keep heading levels (#, ##, ###) exactly as in the original
- Keep list markers and numbering (-, *, 1.) exactly as in the original
- Keep link structure intact: in [[target]] and [[target|label]] never change the target; in [text](url) translate only the text, never the url
- Keep line breaks, blank lines, tables and block quotes in the same places
- Do not add, remove or reorder sections

<note>
{body}
</note>"#;

    /// Opening tag around the embedded body.
    pub const BODY_OPEN: &'static str = "<note>\n";

    /// Closing tag around the embedded body.
    pub const BODY_CLOSE: &'static str = "\n</note>";

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default note translator template.
    pub fn note_translator() -> Self {
        Self::new(Self::NOTE_TRANSLATOR)
    }

    /// Render the template with the given variables.
    pub fn render(&self, target_language: &str, token_example: &str, body: &str) -> String {
        self.template
            .replace("{target_language}", target_language)
            .replace("{token_example}", token_example)
            .replace("{body}", body)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::note_translator()
    }
}

/// Builder for the user message sent to the provider.
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    template: PromptTemplate,
    target_language: String,
    custom_instructions: Option<String>,
}

impl TranslationPromptBuilder {
    /// Create a new prompt builder.
    pub fn new(target_language: &str) -> Self {
        Self {
            template: PromptTemplate::default(),
            target_language: target_language.to_string(),
            custom_instructions: None,
        }
    }

    /// Append free-form instructions after the rules.
    pub fn with_custom_instructions(mut self, instructions: &str) -> Self {
        self.custom_instructions = Some(instructions.to_string());
        self
    }

    /// Render the prompt for a guarded body.
    pub fn build(&self, guarded: &GuardedBody) -> String {
        let token_example = guarded
            .spans
            .first()
            .map(|s| s.placeholder.as_str())
            .unwrap_or("⟦CODE_0⟧");

        // Substitute the body last so its text is never scanned for template keys
        let mut prompt = self
            .template
            .render(&self.target_language, token_example, "{body}");
        if let Some(extra) = &self.custom_instructions {
            prompt = prompt.replacen("\n\n<note>", &format!("\n- {}\n\n<note>", extra), 1);
        }
        prompt.replacen("{body}", &guarded.text, 1)
    }

    /// Pull the body back out of a response, tolerating models that echo the
    /// wrapping tags.
    pub fn strip_wrapper(response: &str) -> &str {
        let trimmed = response.trim_matches('\n');
        match trimmed.strip_prefix(PromptTemplate::BODY_OPEN.trim_end()) {
            Some(rest) => rest
                .strip_suffix(PromptTemplate::BODY_CLOSE.trim_start())
                .unwrap_or(rest)
                .trim_matches('\n'),
            None => response,
        }
    }
}
