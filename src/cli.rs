use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect, summarize and save today's threads.
    Run(RunArgs),
    /// Serve the saved documents over HTTP.
    Serve(ServeArgs),
    /// Inspect or edit the tracked-thread store.
    Tracked {
        #[command(subcommand)]
        command: TrackedCommand,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    #[value(name = "4chan")]
    FourChan,
    #[value(name = "5chan")]
    FiveChan,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummarizerArg {
    /// OpenAI Responses API (needs OPENAI_API_KEY).
    Openai,
    /// Opening post excerpt, no network.
    Excerpt,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Which explorer to run.
    #[arg(long, value_enum, default_value_t = SourceArg::All)]
    pub source: SourceArg,

    /// Explorer configuration (TOML). Defaults apply when missing.
    #[arg(long, default_value = "board-explorer.toml")]
    pub config: PathBuf,

    /// Overrides `data_dir` from the config file.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = SummarizerArg::Openai)]
    pub summarizer: SummarizerArg,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address.
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: SocketAddr,

    #[arg(long, default_value = "board-explorer.toml")]
    pub config: PathBuf,

    /// Overrides `data_dir` from the config file.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum TrackedCommand {
    /// Print every tracked thread and its read position.
    List(TrackedListArgs),
    /// Start tracking a thread by name.
    Add(TrackedAddArgs),
}

#[derive(Debug, Args)]
pub struct TrackedListArgs {
    #[arg(long, value_enum, default_value_t = SourceArg::All)]
    pub source: SourceArg,

    #[arg(long, default_value = "board-explorer.toml")]
    pub config: PathBuf,

    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TrackedAddArgs {
    /// `4chan` or `5chan`.
    #[arg(long, value_enum)]
    pub source: SourceArg,

    /// Thread name; matched case-insensitively against live titles.
    #[arg(long)]
    pub name: String,

    /// Board id, e.g. `g`.
    #[arg(long)]
    pub board: String,

    #[arg(long, default_value = "board-explorer.toml")]
    pub config: PathBuf,

    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}
