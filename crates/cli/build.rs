use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("ezycopy")
        .version(env!("CARGO_PKG_VERSION"))
        .author("EzyCopy Contributors")
        .about("Copy any web article as clean Markdown")
        .arg(clap::arg!([INPUT] "URL to fetch, local HTML file, or '-' for stdin"))
        .arg(
            clap::arg!(-o --output <PATH> "Output file or directory (default: stdout)")
                .value_name("PATH")
                .value_hint(clap::ValueHint::AnyPath),
        )
        .arg(clap::arg!(-c --clipboard "Copy the Markdown to the system clipboard"))
        .arg(clap::arg!(--no_images "Strip images from output"))
        .arg(clap::arg!(-t --timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--user_agent <UA> "Custom User-Agent for HTTP requests").value_name("UA"))
        .arg(clap::arg!(--select <CSS> "Copy only the elements matching a CSS selector").value_name("CSS"))
        .arg(clap::arg!(--download_images "Save images next to the output file and link them locally"))
        .arg(
            clap::arg!(--strategy <STRATEGY> "Image-loss reconciliation strategy")
                .value_name("STRATEGY")
                .default_value("retry")
                .value_parser(["retry", "cms"]),
        )
        .arg(
            clap::arg!(--settings <FILE> "Settings file")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf))
                .value_hint(clap::ValueHint::FilePath),
        )
        .arg(clap::arg!(--base_url <URL> "Base URL for resolving relative links in file or stdin input").value_name("URL"))
        .arg(clap::arg!(--serve "Answer browser extension messages on stdin/stdout"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    for shell in [
        clap_complete::Shell::Bash,
        clap_complete::Shell::Zsh,
        clap_complete::Shell::Fish,
        clap_complete::Shell::PowerShell,
    ] {
        clap_complete::generate_to(shell, &mut cmd, "ezycopy", &completions_dir).unwrap();
    }

    println!("cargo:warning=Shell completions generated in: {}", completions_dir.display());
}
