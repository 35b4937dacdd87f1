use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stowage_archive::TarArchive;
use stowage_artifact::Artifacts;
use stowage_blob::BucketRegistry;
use stowage_config::{Config, FileEntry};
use stowage_kms::KeeperRegistry;
use stowage_template::ContextTemplate;
use stowage_upload::BlobUploader;

/// Stowage - package and publish release artifacts to blob storage
#[derive(Parser)]
#[command(name = "stowage")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Build a tar archive from a list of file entries
  Archive {
    /// Path of the archive to write
    #[arg(long)]
    output: PathBuf,

    /// JSON file listing the entries to add, in order
    #[arg(long)]
    files: PathBuf,
  },

  /// Upload release artifacts to every configured blob destination
  Upload {
    /// Path to the stowage configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Path to the artifact catalog (JSON)
    #[arg(long)]
    artifacts: PathBuf,

    /// Template variable, e.g. --var tag=v1.0.0 (repeatable)
    #[arg(long = "var", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// Override the configured number of concurrent uploads
    #[arg(long)]
    parallelism: Option<usize>,
  },
}

fn parse_var(s: &str) -> Result<(String, String), String> {
  s.split_once('=')
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Archive { output, files }) => {
      run_archive(&output, &files)?;
    }
    Some(Commands::Upload {
      config,
      artifacts,
      vars,
      parallelism,
    }) => {
      run_upload(config, artifacts, vars, parallelism)?;
    }
    None => {
      println!("stowage - use --help to see available commands");
    }
  }

  Ok(())
}

fn run_archive(output: &Path, files: &Path) -> Result<()> {
  let content = std::fs::read_to_string(files)
    .with_context(|| format!("failed to read file list: {}", files.display()))?;
  let entries: Vec<FileEntry> = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse file list: {}", files.display()))?;

  let file = File::create(output)
    .with_context(|| format!("failed to create archive: {}", output.display()))?;
  let mut archive = TarArchive::new(BufWriter::new(file));

  for entry in &entries {
    archive
      .add(entry)
      .with_context(|| format!("failed to add {} to archive", entry.source.display()))?;
  }
  archive.close().context("failed to finish archive")?;

  info!(path = %output.display(), entries = entries.len(), "archive_created");
  Ok(())
}

fn run_upload(
  config: PathBuf,
  artifacts: PathBuf,
  vars: Vec<(String, String)>,
  parallelism: Option<usize>,
) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_upload_async(config, artifacts, vars, parallelism).await })
}

async fn run_upload_async(
  config_file: PathBuf,
  artifacts_file: PathBuf,
  vars: Vec<(String, String)>,
  parallelism: Option<usize>,
) -> Result<()> {
  let content = tokio::fs::read_to_string(&config_file)
    .await
    .with_context(|| format!("failed to read config file: {}", config_file.display()))?;
  let config: Config = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse config file: {}", config_file.display()))?;
  let config = config.validated().context("invalid configuration")?;

  if parallelism == Some(0) {
    bail!("--parallelism must be at least 1");
  }
  if config.blobs.is_empty() {
    bail!("no blob destinations configured in {}", config_file.display());
  }

  let artifacts = Artifacts::from_json_file(&artifacts_file).context("failed to load artifacts")?;

  let mut context = serde_json::Map::new();
  context.insert(
    "project_name".to_string(),
    serde_json::Value::String(config.project_name.clone()),
  );
  for (key, value) in vars {
    context.insert(key, serde_json::Value::String(value));
  }
  let template = ContextTemplate::from_json(serde_json::Value::Object(context));

  let uploader = BlobUploader::new(
    Arc::new(BucketRegistry::with_defaults()),
    Arc::new(KeeperRegistry::with_defaults()),
  )
  .with_parallelism(parallelism.unwrap_or(config.parallelism));

  let reports = uploader
    .upload_all(&artifacts, &config.blobs, &template)
    .await
    .context("upload failed")?;

  for report in reports {
    info!(url = %report.url, uploaded = report.keys.len(), "destination_completed");
    for key in &report.keys {
      println!("{}", key);
    }
  }

  Ok(())
}
