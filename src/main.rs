mod cli;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ndc_flatten::flatten::flatten_message;
use ndc_flatten::manifest::{ManifestError, MessageManifest};
use ndc_flatten::xsd::corpus::{Corpus, NamespaceFamily};

/// Vendor prefix stripped from entry names when deriving per-message output
/// folder names.
const FOLDER_PREFIX: &str = "IATA_";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = cli::Cli::parse();

    let targets = match resolve_targets(&cli) {
        Ok(targets) => targets,
        Err(error) => {
            error!(%error, "could not determine the message list");
            return ExitCode::FAILURE;
        }
    };
    if targets.is_empty() {
        error!("no target messages given; use --message-list");
        return ExitCode::FAILURE;
    }
    if let Err(error) = fs::create_dir_all(&cli.output_dir) {
        error!(%error, path = %cli.output_dir.display(), "could not create output directory");
        return ExitCode::FAILURE;
    }

    let mut corpus = Corpus::new(
        cli.input_dir.clone(),
        NamespaceFamily::new(cli.namespace_family.clone()),
    );
    let mut failures = 0usize;
    for filename in &targets {
        let message_dir = cli.output_dir.join(folder_name(filename));
        match flatten_message(&mut corpus, filename, &message_dir) {
            Ok(outcome) => info!(
                entry = %filename,
                documents = outcome.common_documents.len() + 1,
                copied_foreign = outcome.copied_foreign.len(),
                "flattened"
            ),
            Err(error) => {
                warn!(entry = %filename, %error, "skipped");
                failures += 1;
            }
        }
    }

    if failures == targets.len() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Resolves the entry list from either a JSON manifest (restricted by the
/// `--version` label) or a comma-separated message list.
fn resolve_targets(cli: &cli::Cli) -> Result<Vec<String>, ManifestError> {
    let Some(list) = &cli.message_list else {
        return Ok(Vec::new());
    };
    if list.ends_with(".json") {
        let manifest = MessageManifest::load(Path::new(list))?;
        let version = cli
            .version
            .as_deref()
            .ok_or(ManifestError::MissingVersionLabel)?;
        Ok(manifest
            .messages_for(version)?
            .iter()
            .map(|message| with_extension(message))
            .collect())
    } else {
        Ok(list
            .split(',')
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(with_extension)
            .collect())
    }
}

fn with_extension(message: &str) -> String {
    if message.ends_with(".xsd") {
        message.to_string()
    } else {
        format!("{message}.xsd")
    }
}

fn folder_name(filename: &str) -> String {
    let stem = filename.strip_suffix(".xsd").unwrap_or(filename);
    stem.strip_prefix(FOLDER_PREFIX).unwrap_or(stem).to_string()
}
