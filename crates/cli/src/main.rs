mod echo;
mod logging;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ezycopy_core::{
    Clipboard, DownloadConfig, EzyCopyError, ExtractOptions, ExtractionResult, FetchConfig, Host, ImageDownloader,
    LiveDocument, OutputTarget, Readability, ReconcileStrategy, SelectionSource, Settings, SystemClipboard, extract,
    fetch_file, fetch_page, fetch_stdin, page_subfolder, resolve_output_path, write_markdown,
};
use owo_colors::OwoColorize;
use url::Url;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Copy any web article as clean Markdown
#[derive(Parser, Debug)]
#[command(name = "ezycopy")]
#[command(author = "EzyCopy Contributors")]
#[command(version)]
#[command(about = "Copy any web article as clean Markdown", long_about = None)]
struct Args {
    /// URL to fetch, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT", required_unless_present = "serve")]
    input: Option<String>,

    /// Output file or directory (default: stdout)
    #[arg(short, long, value_name = "PATH")]
    output: Option<String>,

    /// Copy the Markdown to the system clipboard
    #[arg(short, long)]
    clipboard: bool,

    /// Strip images from output
    #[arg(long)]
    no_images: bool,

    /// HTTP timeout in seconds
    #[arg(short, long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Copy only the elements matching a CSS selector
    #[arg(long, value_name = "CSS")]
    select: Option<String>,

    /// Save images next to the output file and link them locally
    #[arg(long, requires = "output")]
    download_images: bool,

    /// Image-loss reconciliation strategy (retry, cms)
    #[arg(long, default_value = "retry", value_name = "STRATEGY")]
    strategy: ReconcileStrategy,

    /// Settings file (default: <config dir>/ezycopy/settings.json)
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Base URL for resolving relative links in file or stdin input
    #[arg(long, value_name = "URL")]
    base_url: Option<Url>,

    /// Answer browser extension messages on stdin/stdout
    #[arg(long, conflicts_with_all = ["input", "output", "clipboard", "select"])]
    serve: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn fetch_config(&self) -> FetchConfig {
        let mut config = FetchConfig { timeout: self.timeout, ..Default::default() };
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
        config
    }

    fn download_config(&self, root: Option<PathBuf>) -> DownloadConfig {
        let mut config = DownloadConfig { timeout: Duration::from_secs(self.timeout), ..Default::default() };
        if let Some(root) = root {
            config.root = root;
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose);

    let outcome = tokio::select! {
        result = run(args) => result,
        Ok(()) = tokio::signal::ctrl_c() => Err(EzyCopyError::Cancelled.into()),
    };

    match outcome {
        // A blocking stdin read would otherwise keep the runtime alive.
        Err(err) if is_cancelled(&err) => std::process::exit(0),
        other => other,
    }
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<EzyCopyError>().is_some_and(EzyCopyError::is_cancellation))
}

async fn run(args: Args) -> anyhow::Result<()> {
    if args.serve {
        return serve(&args).await;
    }

    if args.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    let settings = load_settings(args.settings.as_deref())?;
    let input = args.input.as_deref().unwrap_or("-");

    let (html, base_url) = load_page(input, &args).await?;

    if args.verbose {
        eprintln!("  {} {}", "Size:".dimmed(), echo::format_size(html.len()).bright_white());
        if let Some(base_url) = &base_url {
            eprintln!("  {} {}", "Base URL:".dimmed(), base_url.as_str().bright_white());
        }
        eprintln!();
        echo::print_step(2, 3, "Extracting main content");
    }

    let selection = args.select.clone().map(SelectionSource::Selector);
    let mut options = ExtractOptions::from(&settings).with_strategy(args.strategy);
    options.include_images &= !args.no_images;
    options.selective_copy |= selection.is_some();

    let mut live = LiveDocument::parse(&html, base_url);
    let mut result =
        extract(&mut live, selection.as_ref(), &Readability::default(), &options).context("Failed to convert to Markdown")?;

    if selection.is_some() && !result.is_selection {
        echo::print_warning("Selection matched no text, copying the full page instead");
    }

    if args.verbose {
        echo::print_extraction_details(&result);
        echo::print_step(3, 3, "Writing output");
    }

    if let Some(output) = args.output.as_deref() {
        let path = resolve_output_path(output, &result.title).context("Failed to resolve output path")?;

        let wants_local_images = args.download_images || settings.download_images_locally;
        if wants_local_images && options.include_images && !result.images.is_empty() {
            let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
            download_images(&mut result, root, &args).await?;
        }

        let markdown = result.to_markdown(OutputTarget::Download);
        write_markdown(&path, &markdown).with_context(|| format!("Failed to write to file: {}", path.display()))?;
        echo::print_success(&format!("Saved to {}", path.display().bright_white()));
    }

    // stdout is the fallback when nothing else received the Markdown.
    let mut to_stdout = args.output.is_none();
    if args.clipboard {
        match SystemClipboard.copy(&result.to_markdown(OutputTarget::Clipboard)) {
            Ok(()) => {
                echo::print_success("Copied to clipboard");
                to_stdout = false;
            }
            Err(err) => echo::print_warning(&err.to_string()),
        }
    }

    if to_stdout {
        println!("{}", result.to_markdown(OutputTarget::Download));
    }

    Ok(())
}

/// Explicit settings files must load; the default one falls back quietly.
fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => Settings::load(path).with_context(|| format!("Failed to load settings: {}", path.display())),
        None => Ok(Settings::load_default().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring unreadable settings");
            Settings::default()
        })),
    }
}

async fn load_page(input: &str, args: &Args) -> anyhow::Result<(String, Option<Url>)> {
    if input == "-" {
        if args.verbose {
            echo::print_step(1, 3, "Reading from stdin");
        }
        let html = tokio::task::spawn_blocking(fetch_stdin)
            .await
            .context("stdin reader stopped")?
            .context("Failed to read from stdin")?;
        Ok((html, args.base_url.clone()))
    } else if input.starts_with("http://") || input.starts_with("https://") {
        if args.verbose {
            echo::print_step(1, 3, &format!("Fetching from {}", input.bright_white().underline()));
        }
        let page = fetch_page(input, &args.fetch_config()).await.context("Failed to fetch URL")?;
        Ok((page.html, Some(page.url)))
    } else {
        if args.verbose {
            echo::print_step(1, 3, &format!("Reading from file {}", input.bright_white()));
        }
        let html = fetch_file(input).with_context(|| format!("Failed to read file: {input}"))?;
        Ok((html, args.base_url.clone()))
    }
}

async fn download_images(result: &mut ExtractionResult, root: PathBuf, args: &Args) -> anyhow::Result<()> {
    let downloader = ImageDownloader::new(args.download_config(Some(root))).context("Failed to build HTTP client")?;
    let report = downloader
        .download_all(&result.images, &page_subfolder(&result.title))
        .await
        .context("Failed to create image folder")?;

    if report.downloaded_count < report.total_images {
        echo::print_warning(&format!(
            "Downloaded {} of {} images, the rest keep their remote links",
            report.downloaded_count, report.total_images
        ));
    } else {
        echo::print_info(&format!("Downloaded {} images", report.downloaded_count));
    }

    result.localize_images(&report.url_to_path_map);
    Ok(())
}

async fn serve(args: &Args) -> anyhow::Result<()> {
    let settings_path = args.settings.clone().or_else(Settings::default_path);
    let downloader = ImageDownloader::new(args.download_config(None)).context("Failed to build HTTP client")?;

    Host::new(settings_path, downloader)
        .serve(tokio::io::stdin(), tokio::io::stdout())
        .await
        .context("Message host stopped")
}
