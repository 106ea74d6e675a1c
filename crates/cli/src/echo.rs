use owo_colors::OwoColorize;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "EzyCopy".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Copy any web article as clean Markdown\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print extraction details summary
pub fn print_extraction_details(result: &ezycopy_core::ExtractionResult) {
    eprintln!("  {} {}", "Title:".dimmed(), result.title.bright_white());
    if let Some(byline) = &result.byline {
        eprintln!("  {} {}", "Author:".dimmed(), byline.bright_white());
    }
    eprintln!("  {} {}", "Path:".dimmed(), format!("{:?}", result.path).bright_white());
    eprintln!("  {} {}", "Images:".dimmed(), result.images.len().to_string().bright_white());
    eprintln!("  {} {}\n", "Markdown:".dimmed(), format_size(result.body.len()).bright_white());
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
