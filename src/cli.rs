use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Directory containing the downloaded schema corpus
    #[arg(long)]
    pub input_dir: PathBuf,

    /// Directory the flattened schema sets are written to
    #[arg(long)]
    pub output_dir: PathBuf,

    /// JSON manifest path or comma separated message list
    #[arg(long)]
    pub message_list: Option<String>,

    /// Version label selecting the message set from a JSON manifest
    #[arg(long)]
    pub version: Option<String>,

    /// Namespace prefix that marks schemas as project-owned; imports outside
    /// it are treated as foreign and copied verbatim
    #[arg(long, default_value = "http://www.iata.org")]
    pub namespace_family: String,
}
