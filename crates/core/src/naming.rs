//! Filenames and folder layout for saved articles and their images.
//!
//! Saved output lives under [`EZYCOPY_FOLDER`]. A page's images go into
//! `images/<page>/`, where `<page>` is the Markdown filename without its
//! extension.

use std::sync::LazyLock;

use regex::Regex;
use time::{Date, OffsetDateTime, macros::format_description};
use url::Url;

/// Root folder for everything written on the user's behalf.
pub const EZYCOPY_FOLDER: &str = "EzyCopy";

/// Subfolder of [`EZYCOPY_FOLDER`] holding per-page image folders.
pub const IMAGES_SUBFOLDER: &str = "images";

const MAX_TITLE_CHARS: usize = 50;
const MAX_IMAGE_FILENAME: usize = 200;
const FALLBACK_EXTENSION: &str = ".png";

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").expect("non-alphanumeric pattern"));
static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9._-]").expect("unsafe filename pattern"));
static IMAGE_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp|svg|bmp|ico)$").expect("image extension pattern"));
static EXTENSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.[^.]+$").expect("extension pattern"));

/// Today's date in UTC.
pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

fn iso_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| format!("{}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day()))
}

/// `<safe-title>-<YYYY-MM-DD>` for a given date.
///
/// The title is cut to 50 characters, every run of non-alphanumerics becomes
/// a single `-`, and leading or trailing dashes are trimmed. A title with no
/// alphanumerics at all becomes `untitled`. Because runs collapse,
/// `Hello, World!` yields `Hello-World`, never `Hello--World`.
///
/// ```rust
/// use ezycopy_core::naming::base_name;
/// use time::macros::date;
///
/// assert_eq!(base_name("Hello, World! 2024", date!(2024 - 03 - 09)), "Hello-World-2024-2024-03-09");
/// ```
pub fn base_name(title: &str, date: Date) -> String {
    let truncated: String = title.chars().take(MAX_TITLE_CHARS).collect();
    let safe = NON_ALPHANUMERIC.replace_all(&truncated, "-");
    let safe = safe.trim_matches('-');
    let safe = if safe.is_empty() { "untitled" } else { safe };

    format!("{safe}-{}", iso_date(date))
}

/// Per-page image subfolder name, dated today.
pub fn page_subfolder(title: &str) -> String {
    base_name(title, today())
}

/// Markdown filename for `title`, dated today.
pub fn markdown_filename(title: &str) -> String {
    format!("{}.md", page_subfolder(title))
}

/// Path of a page's image folder relative to the download root.
pub fn images_path(page_subfolder: &str) -> String {
    format!("{EZYCOPY_FOLDER}/{IMAGES_SUBFOLDER}/{page_subfolder}")
}

/// Path of an image relative to the Markdown file that references it.
pub fn image_link_path(page_subfolder: &str, filename: &str) -> String {
    format!("{IMAGES_SUBFOLDER}/{page_subfolder}/{filename}")
}

/// A filesystem-safe filename for the image at `url`.
///
/// Takes the last path segment (query strings never reach it), percent
/// decodes it, and replaces everything outside `[a-zA-Z0-9._-]` with `_`.
/// Names without a known image extension get `.png`. Names longer than 200
/// characters are cut while keeping the extension. URLs that do not parse,
/// or end in `/`, fall back to `image-{index}`.
///
/// ```rust
/// use ezycopy_core::naming::sanitize_image_filename;
///
/// assert_eq!(sanitize_image_filename("https://a.co/p/My%20Photo.JPG?w=800", 0), "My_Photo.JPG");
/// assert_eq!(sanitize_image_filename("https://a.co/render?id=7", 3), "render.png");
/// assert_eq!(sanitize_image_filename("not a url", 2), "image-2.png");
/// ```
pub fn sanitize_image_filename(url: &str, index: usize) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return format!("image-{index}{FALLBACK_EXTENSION}");
    };

    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("image-{index}"));

    let decoded = urlencoding::decode(&segment).map(|s| s.into_owned()).unwrap_or(segment);
    let mut filename = UNSAFE_FILENAME_CHARS.replace_all(&decoded, "_").into_owned();

    if !IMAGE_EXTENSION.is_match(&filename) {
        filename.push_str(FALLBACK_EXTENSION);
    }

    if filename.len() > MAX_IMAGE_FILENAME {
        let extension = EXTENSION.find(&filename).map(|m| m.as_str().to_string()).unwrap_or_default();
        filename.truncate(MAX_IMAGE_FILENAME - extension.len());
        filename.push_str(&extension);
    }

    filename
}
