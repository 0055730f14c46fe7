// Chunk: docs/chunks/cli_driver - Command-line driver for the highlight engine
//!
//! glint: prints the highlight ranges of a file.
//!
//! Loads the file into a highlight session, asks for a viewport (the whole
//! file, or the lines given with `--lines`) and prints one range per line:
//!
//! ```text
//! 0..2 keyword "fn"
//! ```
//!
//! Logging goes to stderr and is controlled by `GLINT_LOG` (an
//! `EnvFilter` directive, `warn` by default).

use std::fs;
use std::ops::{Range, RangeInclusive};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use glint_buffer::{ByteCharMap, LineIndex, TextSnapshot};
use glint_highlight::{BackgroundSession, HighlightConfig, HighlightEvent, HighlightSession};
use glint_syntax::{HighlightRange, LanguageRegistry};
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::EnvFilter;

/// How long the background worker gets before the driver gives up.
const BACKGROUND_WAIT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "glint")]
#[command(about = "Print the syntax highlight ranges of a file")]
#[command(version)]
struct Cli {
    /// File to highlight
    #[arg(required_unless_present = "list_languages")]
    file: Option<PathBuf>,

    /// Language name or alias (detected from the extension if omitted)
    #[arg(short, long)]
    language: Option<String>,

    /// Only print ranges on these 1-based lines, e.g. `10:40`
    #[arg(long, value_parser = parse_lines)]
    lines: Option<RangeInclusive<usize>>,

    /// Configuration file (defaults to the user config file, if any)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print character offsets in the configured encoding instead of bytes
    #[arg(long)]
    chars: bool,

    /// Parse on the background worker instead of the calling thread
    #[arg(long)]
    background: bool,

    /// List the supported languages and exit
    #[arg(long)]
    list_languages: bool,
}

fn parse_lines(value: &str) -> std::result::Result<RangeInclusive<usize>, String> {
    let (first, last) = value
        .split_once(':')
        .ok_or_else(|| format!("expected FIRST:LAST, got `{}`", value))?;
    let first: usize = first.trim().parse().map_err(|e| format!("bad first line: {}", e))?;
    let last: usize = last.trim().parse().map_err(|e| format!("bad last line: {}", e))?;
    if first == 0 || last < first {
        return Err(format!("`{}` is not a 1-based line range", value));
    }
    Ok(first..=last)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("GLINT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    if cli.list_languages {
        let registry = LanguageRegistry::new();
        let mut names: Vec<&str> = registry.language_names().collect();
        names.sort_unstable();
        for name in names {
            println!("{}", name);
        }
        return Ok(());
    }
    let Some(file) = &cli.file else {
        bail!("no file given");
    };

    let config = match &cli.config {
        Some(path) => HighlightConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => HighlightConfig::load_or_default(),
    };
    let text =
        fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;

    let registry = Arc::new(LanguageRegistry::new());
    let language = match &cli.language {
        Some(name) => name.clone(),
        None => registry
            .config_for_path(file)
            .map_or_else(|| "plain".to_string(), |c| c.name.to_string()),
    };
    info!(file = %file.display(), language = %language, bytes = text.len(), "highlighting");

    let snapshot = TextSnapshot::new(text.as_str());
    let mut index = LineIndex::from_snapshot(&snapshot);
    let (viewport, keep) = match &cli.lines {
        Some(lines) => {
            let last = (*lines.end()).min(index.line_count());
            let Some(span) = index.byte_span(*lines.start()..=last) else {
                bail!("{} has only {} lines", file.display(), index.line_count());
            };
            let end_line = index.line(last).map_or(span.start, |l| l.start_offset);
            ((span.start, end_line), span)
        }
        None => ((0, text.len()), 0..text.len()),
    };

    let ranges = if cli.background {
        highlight_background(registry, &language, config.clone(), &text, viewport)?
    } else {
        highlight_inline(registry, &language, config.clone(), &text, viewport)
    };

    let ranges: Vec<HighlightRange> = ranges
        .into_iter()
        .filter(|r| r.start_byte < keep.end && r.end_byte > keep.start)
        .collect();
    debug!(ranges = ranges.len(), "highlighting finished");

    let map = cli.chars.then(|| ByteCharMap::new(&text, config.char_encoding));
    for range in &ranges {
        let bytes = range.byte_range();
        let shown = match &map {
            Some(map) => match map.range_to_chars(bytes.clone()) {
                Some(chars) => chars,
                None => continue,
            },
            None => bytes.clone(),
        };
        println!("{} {}", format_range(&shown), format_token(range, &text));
    }
    Ok(())
}

fn format_range(range: &Range<usize>) -> String {
    format!("{}..{}", range.start, range.end)
}

fn format_token(range: &HighlightRange, text: &str) -> String {
    let token = text.get(range.byte_range()).unwrap_or_default();
    format!("{} {:?}", range.category, token)
}

fn highlight_inline(
    registry: Arc<LanguageRegistry>,
    language: &str,
    config: HighlightConfig,
    text: &str,
    (start, end): (usize, usize),
) -> Vec<HighlightRange> {
    let mut session = HighlightSession::new(registry, language, config);
    session.document_did_load(text);
    let update = session.viewport_changed(start, end);
    report_events(session.poll());
    update.map(|u| u.ranges).unwrap_or_default()
}

fn highlight_background(
    registry: Arc<LanguageRegistry>,
    language: &str,
    config: HighlightConfig,
    text: &str,
    (start, end): (usize, usize),
) -> Result<Vec<HighlightRange>> {
    let mut session = BackgroundSession::spawn(registry, language, config)
        .context("starting the parse worker")?;
    session.document_did_load(text);
    let mut events: Vec<HighlightEvent> = session
        .viewport_changed(start, end)
        .map(HighlightEvent::Updated)
        .into_iter()
        .collect();
    events.extend(session.wait_idle(BACKGROUND_WAIT));
    if session.is_busy() {
        bail!("parse worker did not finish within {:?}", BACKGROUND_WAIT);
    }

    let mut ranges = Vec::new();
    for event in &events {
        if let HighlightEvent::Updated(update) = event {
            ranges.extend(update.ranges.iter().copied());
        }
    }
    report_events(events);
    ranges.sort_by_key(|r| r.start_byte);
    Ok(ranges)
}

fn report_events(events: Vec<HighlightEvent>) {
    if events.contains(&HighlightEvent::TimedOut) {
        eprintln!("glint: parse timed out, printing no highlights");
    }
}
