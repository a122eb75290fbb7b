//! Reference CLI: extract a scope from an HTML file (or stdin) and
//! print the result.
//!
//! ```text
//! pagescope -s 'selector:article' -x '.ad' -f markdown page.html
//! cat page.html | pagescope -s main -f text --debug
//! ```

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use pagescope::{
    extract_bytes_with_options, parse_meta, parse_scope, Format, Options, ScopeResolution,
};

#[derive(Parser)]
#[command(name = "pagescope", version, about = "Scoped web-content extraction")]
struct Args {
    /// Scope: main | full | auto | selector:<csv> | {json}
    #[arg(short = 's', long, default_value = "main")]
    scope: String,

    /// Comma-separated exclude selectors (with selector: scopes only)
    #[arg(short = 'x', long)]
    exclude: Option<String>,

    /// Output format: html | markdown | text
    #[arg(short = 'f', long, default_value = "html")]
    format: String,

    /// Source URL, passed to function scopes and handler lookup
    #[arg(short = 'u', long)]
    url: Option<String>,

    /// Emit a JSON envelope with the scope resolution record
    #[arg(long)]
    debug: bool,

    /// Print page metadata instead of content
    #[arg(long)]
    meta: bool,

    /// HTML file to read; stdin when omitted
    file: Option<PathBuf>,
}

#[derive(Serialize)]
struct Envelope {
    content: String,
    resolution: ScopeResolution,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("pagescope: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<String, String> {
    let html = read_input(args.file.as_deref()).map_err(|err| err.to_string())?;

    if args.meta {
        let meta = parse_meta(&pagescope::encoding::transcode_to_utf8(&html));
        return serde_json::to_string_pretty(&meta).map_err(|err| err.to_string());
    }

    let format = Format::parse(&args.format)
        .ok_or_else(|| format!("unknown format {:?}", args.format))?;
    let scope = parse_scope(&args.scope, args.exclude.as_deref())
        .map_err(|err| err.to_string())?;
    let options = Options {
        format,
        url: args.url.clone(),
        ..Options::default()
    };

    let result = extract_bytes_with_options(&html, &scope, &options, None)
        .map_err(|err| err.to_string())?;

    if args.debug {
        let envelope = Envelope {
            content: result.content,
            resolution: result.resolution,
        };
        serde_json::to_string_pretty(&envelope).map_err(|err| err.to_string())
    } else {
        Ok(result.content)
    }
}

fn read_input(path: Option<&std::path::Path>) -> std::io::Result<Vec<u8>> {
    match path {
        Some(path) => std::fs::read(path),
        None => {
            let mut buffer = Vec::new();
            std::io::stdin().read_to_end(&mut buffer)?;
            Ok(buffer)
        }
    }
}
