//! Command line front-end over the in-memory editor host.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::app::blink::SessionOutcome;
use crate::app::copy::{CopyHighlighter, CopyMode};
use crate::domain::model::TextRange;
use crate::infra::clipboard::{ClipboardSink, MemoryClipboard, SystemClipboard};
use crate::infra::config::Config;
use crate::infra::highlight::parse_color;
use crate::infra::memory::{Caret, MemoryEditor};
use crate::infra::ui_thread::UiLoop;

#[derive(Debug, Parser)]
#[command(author, version, about = "Flash copied text, then put the carets back", long_about = None)]
pub struct Cli {
    /// Extra config file layered over global and workspace settings.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Copy from FILE at the given carets and run the blink session
    Copy(CopyArgs),
    /// Print the effective settings
    Config {
        #[arg(long)]
        json: bool,
    },
    /// Parse a color value and print it as #RRGGBBAA
    Color { value: String },
    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Debug, clap::Args)]
pub struct CopyArgs {
    pub file: PathBuf,

    /// LINE:COL (0-based) for a bare caret, START..END for a selection.
    #[arg(long = "caret", value_name = "SPEC", required = true)]
    pub carets: Vec<CaretSpec>,

    /// Keep the copied text in memory instead of the system clipboard.
    #[arg(long)]
    pub no_clipboard: bool,

    /// Print the copied text after the session ends.
    #[arg(long)]
    pub print: bool,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub blink_count: Option<u32>,

    #[arg(long, value_parser = clap::value_parser!(u64).range(50..=1000))]
    pub interval_ms: Option<u64>,
}

/// Caret as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretSpec {
    Position { line: usize, column: usize },
    Selection(TextRange),
}

impl FromStr for CaretSpec {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if let Some((start, end)) = value.split_once("..") {
            let start = parse_index(start, "selection start")?;
            let end = parse_index(end, "selection end")?;
            return Ok(CaretSpec::Selection(TextRange::new(start, end)));
        }
        if let Some((line, column)) = value.split_once(':') {
            return Ok(CaretSpec::Position {
                line: parse_index(line, "line")?,
                column: parse_index(column, "column")?,
            });
        }
        Err(format!("expected LINE:COL or START..END, got `{value}`"))
    }
}

fn parse_index(raw: &str, what: &str) -> Result<usize, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("invalid {what}: `{raw}`"))
}

impl CaretSpec {
    fn resolve(self, editor: &MemoryEditor) -> Result<Caret> {
        match self {
            CaretSpec::Position { line, column } => editor
                .offset_at(line, column)
                .map(Caret::at)
                .with_context(|| format!("line {line} is past the end of the file")),
            CaretSpec::Selection(range) => {
                if range.end > editor.len_chars() {
                    bail!(
                        "selection {}..{} is past the end of the file",
                        range.start,
                        range.end
                    );
                }
                Ok(Caret::selecting(range))
            }
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Copy(args) => run_copy(args, config_path),
        Commands::Config { json } => run_config(config_path, json),
        Commands::Color { value } => {
            println!("{}", parse_color(value.as_str()));
            Ok(())
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            let name = command.get_name().to_owned();
            clap_complete::generate(shell, &mut command, name, &mut io::stdout());
            Ok(())
        }
    }
}

fn run_config(config_path: Option<&Path>, json: bool) -> Result<()> {
    let effective = Config::load(config_path)?.effective();
    let rendered = if json {
        serde_json::to_string_pretty(&effective).context("failed to render settings as JSON")?
    } else {
        toml::to_string(&effective).context("failed to render settings as TOML")?
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn run_copy(args: CopyArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load(config_path)?;
    if let Some(count) = args.blink_count {
        config.blink.count = Some(count);
    }
    if let Some(interval_ms) = args.interval_ms {
        config.blink.interval_ms = Some(interval_ms);
    }

    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let mut editor = MemoryEditor::new(&text);
    let carets = args
        .carets
        .iter()
        .map(|spec| spec.resolve(&editor))
        .collect::<Result<Vec<_>>>()?;
    editor.set_carets(carets)?;

    let clipboard: Box<dyn ClipboardSink + Send> = if args.no_clipboard {
        Box::new(MemoryClipboard::default())
    } else {
        Box::new(SystemClipboard::new())
    };

    let ui = UiLoop::spawn("copyflash-ui", editor)?;
    let highlighter = Arc::new(CopyHighlighter::from_config(ui.host(), clipboard, &config)?);

    let outcome = {
        let highlighter = Arc::clone(&highlighter);
        ui.with_surface(move |editor| highlighter.on_copy(editor, CopyMode::Action))??
    };

    let result = outcome
        .session
        .map(|session| session.join())
        .unwrap_or(SessionOutcome::Cancelled);
    let editor = ui.close()?;

    if outcome.targets.is_empty() {
        println!("nothing to copy");
        return Ok(());
    }
    println!("copied {} range(s), session {result}", outcome.targets.len());
    for caret in editor.caret_layout() {
        println!("caret {}", describe_caret(&caret));
    }
    if args.print {
        let copied = outcome
            .copied
            .ok_or_else(|| anyhow!("copy produced no clipboard text"))?;
        println!("{copied}");
    }
    Ok(())
}

fn describe_caret(caret: &Caret) -> String {
    match caret.selection {
        Some(range) => format!("@{} [{}..{}]", caret.offset, range.start, range.end),
        None => format!("@{}", caret.offset),
    }
}
