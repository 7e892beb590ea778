/*!
 * Note translation with structural preservation.
 *
 * This module contains the core functionality for translating note bodies
 * using generation providers. It is split into several submodules:
 *
 * - `core`: The translation engine and its options
 * - `batch`: Windowed batch execution
 * - `document`: Front matter and body model for notes
 * - `guard`: Placeholder protection for code spans
 * - `prompts`: Prompt templates and builders for translation
 */

// Re-export main types for easier usage
pub use self::batch::BatchTranslator;
pub use self::core::{TranslationEngine, TranslationOptions};

// Re-export document model types
pub use self::document::{Document, FrontMatter, MetaValue, compose, extract_front_matter};
pub use self::guard::{ContentGuard, GuardedBody, GuardedSpan, Restored, SpanKind};

// Re-export prompt types
pub use self::prompts::{PromptTemplate, TranslationPromptBuilder};

// Submodules
pub mod batch;
pub mod core;
pub mod document;
pub mod guard;
pub mod prompts;
