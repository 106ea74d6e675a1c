pub mod markdown;

pub use markdown::{MarkdownConfig, MarkdownRenderer, convert_to_markdown};
