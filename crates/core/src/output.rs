//! Persistence collaborators: output paths, Markdown files, and the clipboard.

use std::fs;
use std::io::{self, Write};
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::naming::{EZYCOPY_FOLDER, markdown_filename};
use crate::{EzyCopyError, Result};

/// `<Downloads>/EzyCopy`, falling back to the home directory, then `.`.
pub fn default_output_dir() -> PathBuf {
    dirs::download_dir().or_else(dirs::home_dir).unwrap_or_else(|| PathBuf::from(".")).join(EZYCOPY_FOLDER)
}

fn expand_home(path: &str) -> Result<PathBuf> {
    let Some(rest) = path.strip_prefix('~') else {
        return Ok(PathBuf::from(path));
    };
    let home = dirs::home_dir().ok_or_else(|| EzyCopyError::Persistence {
        path: PathBuf::from(path),
        source: io::Error::new(io::ErrorKind::NotFound, "no home directory"),
    })?;
    Ok(home.join(rest.trim_start_matches(['/', '\\'])))
}

/// Turns a user supplied output location into a Markdown file path.
///
/// `~` expands to the home directory. An existing directory, or a path
/// ending in a separator, gets a filename generated from `title`. Anything
/// else is a file path and gets `.md` appended unless it already ends in it.
pub fn resolve_output_path(output: &str, title: &str) -> Result<PathBuf> {
    let path = expand_home(output)?;
    let names_dir = output.ends_with('/') || output.ends_with(MAIN_SEPARATOR);

    if names_dir || path.is_dir() {
        return Ok(path.join(markdown_filename(title)));
    }

    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("md")) {
        return Ok(path);
    }

    let mut with_ext = path.into_os_string();
    with_ext.push(".md");
    Ok(PathBuf::from(with_ext))
}

/// First of `path`, `stem (1).ext`, `stem (2).ext`, ... for which `taken` is false.
pub(crate) fn unique_path_by(path: &Path, taken: impl Fn(&Path) -> bool) -> PathBuf {
    if !taken(path) {
        return path.to_path_buf();
    }

    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let ext = path.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default();

    (1..)
        .map(|n| path.with_file_name(format!("{stem} ({n}){ext}")))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| path.to_path_buf())
}

/// `path`, or the first `name (n).ext` variant that does not exist yet.
pub fn unique_path(path: &Path) -> PathBuf {
    unique_path_by(path, Path::exists)
}

/// Writes `content` to `path`, creating parent directories. Overwrites.
pub fn write_markdown(path: &Path, content: &str) -> Result<()> {
    let persist = |source| EzyCopyError::Persistence { path: path.to_path_buf(), source };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(persist)?;
    }
    fs::write(path, content).map_err(persist)?;

    debug!(path = %path.display(), bytes = content.len(), "wrote markdown");
    Ok(())
}

/// Saves `content` as `dir/filename`, renaming on conflict.
///
/// Returns the path actually written.
pub fn save_markdown(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let path = unique_path(&dir.join(filename));
    write_markdown(&path, content)?;
    Ok(path)
}

/// Somewhere to put text for the user to paste.
pub trait Clipboard {
    fn copy(&self, text: &str) -> Result<()>;
}

/// The platform clipboard, reached through the usual command line tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

type ClipboardTool = (&'static str, &'static [&'static str]);

#[cfg(target_os = "macos")]
const CLIPBOARD_TOOLS: &[ClipboardTool] = &[("pbcopy", &[])];

#[cfg(windows)]
const CLIPBOARD_TOOLS: &[ClipboardTool] = &[("clip", &[])];

#[cfg(not(any(target_os = "macos", windows)))]
const CLIPBOARD_TOOLS: &[ClipboardTool] =
    &[("wl-copy", &[]), ("xclip", &["-selection", "clipboard"]), ("xsel", &["--clipboard", "--input"])];

impl SystemClipboard {
    fn pipe_into(program: &str, args: &[&str], text: &str) -> io::Result<()> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }

        let status = child.wait()?;
        if status.success() { Ok(()) } else { Err(io::Error::other(format!("{program} exited with {status}"))) }
    }
}

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> Result<()> {
        let mut last_error = None;

        for (program, args) in CLIPBOARD_TOOLS {
            match Self::pipe_into(program, args, text) {
                Ok(()) => {
                    debug!(program, "copied to clipboard");
                    return Ok(());
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => last_error = Some(err.to_string()),
            }
        }

        Err(EzyCopyError::ClipboardError(last_error.unwrap_or_else(|| "no clipboard tool found".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_directory_generates_name() {
        let dir = TempDir::new().unwrap();
        let path = resolve_output_path(dir.path().to_str().unwrap(), "Hello, World!").unwrap();

        assert_eq!(path.parent().unwrap(), dir.path());
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("Hello-World-"));
        assert!(name.ends_with(".md"));
    }

    #[test]
    fn test_resolve_trailing_separator_is_directory() {
        let dir = TempDir::new().unwrap();
        let output = format!("{}{MAIN_SEPARATOR}new{MAIN_SEPARATOR}", dir.path().display());
        let path = resolve_output_path(&output, "Post").unwrap();

        assert_eq!(path.parent().unwrap(), dir.path().join("new"));
    }

    #[test]
    fn test_resolve_file_paths() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("notes");

        let plain = resolve_output_path(base.to_str().unwrap(), "ignored").unwrap();
        assert_eq!(plain, dir.path().join("notes.md"));

        let upper = resolve_output_path(dir.path().join("A.MD").to_str().unwrap(), "ignored").unwrap();
        assert_eq!(upper, dir.path().join("A.MD"));
    }

    #[test]
    fn test_resolve_expands_home() {
        let Some(home) = dirs::home_dir() else { return };
        let path = resolve_output_path("~/ezycopy-test-out/article", "t").unwrap();
        assert_eq!(path, home.join("ezycopy-test-out").join("article.md"));
    }

    #[test]
    fn test_unique_path() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("post.md");
        assert_eq!(unique_path(&target), target);

        fs::write(&target, "a").unwrap();
        fs::write(dir.path().join("post (1).md"), "b").unwrap();
        assert_eq!(unique_path(&target), dir.path().join("post (2).md"));
    }

    #[test]
    fn test_save_markdown_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let first = save_markdown(dir.path(), "a.md", "one").unwrap();
        let second = save_markdown(dir.path(), "a.md", "two").unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read_to_string(first).unwrap(), "one");
        assert_eq!(fs::read_to_string(second).unwrap(), "two");
    }

    #[test]
    fn test_write_markdown_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b").join("c.md");
        write_markdown(&path, "# T").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "# T");
    }

    #[test]
    fn test_write_markdown_failure_is_persistence() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let err = write_markdown(&blocker.join("child.md"), "# T").unwrap_err();
        assert!(matches!(err, EzyCopyError::Persistence { .. }));
    }
}
