pub mod article;
pub mod cleaning;
pub mod css;
pub mod download;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod formatters;
pub mod images;
pub mod message;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod parse;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod protect;
pub mod readability;
pub mod reconcile;
pub mod scoring;
pub mod selection;
pub mod settings;
pub mod snapshot;
pub mod visibility;
pub mod widgets;

pub use article::{ExtractionResult, OutputTarget};
#[doc(hidden)]
pub use cleaning::{CleaningConfig, clean_html};
pub use download::{DownloadConfig, DownloadReport, ImageDownloader};
pub use error::{EzyCopyError, Result};
#[doc(hidden)]
pub use extract::{ExtractConfig, ExtractedContent, extract_content};
pub use fetch::{FetchConfig, FetchedPage};
pub use fetch::{fetch_file, fetch_page, fetch_stdin};
pub use formatters::{MarkdownConfig, MarkdownRenderer, convert_to_markdown};
pub use images::{ImageRef, collect_images, rewrite_image_paths, strip_images};
pub use message::{Host, Request, Response};
pub use naming::{markdown_filename, page_subfolder, sanitize_image_filename};
pub use output::{Clipboard, SystemClipboard, resolve_output_path, save_markdown, write_markdown};
pub use parse::Document;
pub use pipeline::{ExtractOptions, extract, extract_html};
pub use postprocess::postprocess_markdown;
#[doc(hidden)]
pub use preprocess::PreprocessConfig;
pub use preprocess::{normalize_content, preprocess_html};
pub use readability::{ArticleExtractor, CleaningMode, ExtractedArticle, Readability, ReadabilityConfig};
pub use reconcile::{ExtractionPath, ReconcileStrategy, Reconciled, SnapshotSource, reconcile};
#[doc(hidden)]
pub use scoring::{ScoreConfig, ScoreResult, calculate_score};
pub use selection::SelectionSource;
pub use settings::Settings;
pub use snapshot::Snapshot;
pub use visibility::LiveDocument;
