use crate::output::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file, instead of the default search path
    #[clap(long, value_parser)]
    pub config: Option<PathBuf>,

    /// Directory holding `<table>.json` snapshots
    #[clap(long, value_parser)]
    pub data_dir: Option<PathBuf>,

    /// Never contact the remote, even if credentials are configured
    #[clap(long, value_parser, default_value_t = false)]
    pub local_only: bool,

    #[clap(long, value_parser, default_value_t = false)]
    pub verbose: bool,

    #[clap(long, value_parser)]
    pub log: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one query against the corpus
    Query {
        query: String,

        /// Query option, e.g. `-p search_apply_highlight=true`
        #[clap(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the parsed request as JSON
    Parse {
        query: String,

        #[clap(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Dump a dataset as JSON
    Export {
        dataset: String,

        /// Only the first few rows, printed inline
        #[clap(long, value_parser, default_value_t = false)]
        preview: bool,

        #[clap(long, value_parser)]
        out: Option<PathBuf>,
    },
    /// Verse (or chapter) of the day
    Today {
        #[clap(long, value_parser, default_value_t = false)]
        chapter: bool,
    },
    /// Keep datasets in sync and answer queries read from stdin
    Shell,
    Completions {
        #[clap(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got {raw:?}")),
    }
}
