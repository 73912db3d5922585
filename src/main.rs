use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dfs_plugin::schema::FileSystemSchema;
use dfs_plugin::{FileSystemPlugin, PluginContext, SchemaPath, SchemaTree, StorageConfig, UserSession};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Storage configuration file (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Name the plugin is registered under
    #[arg(long, default_value = "dfs")]
    name: String,

    /// User the schemas are built for
    #[arg(long, default_value = "anonymous")]
    user: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered format engines and their configs
    Formats,
    /// List workspaces and their configs
    Workspaces,
    /// List the tables of a workspace
    Tables { workspace: String },
    /// Plan a scan for a selection, e.g. '{"format":{"type":"named","name":"csv"},"selection":{"files":["/data"]}}'
    Scan {
        selection: String,

        /// Columns to read (all when omitted)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Cloud credentials for s3:// and azure:// connections
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = StorageConfig::from_file(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let plugin = FileSystemPlugin::new(&args.name, config, &PluginContext::default())?;

    match args.command {
        Command::Formats => {
            let formats: BTreeMap<_, _> = plugin
                .registry()
                .plugins()
                .map(|format| (format.name(), format.config()))
                .collect();
            print_json(&formats)?;
        }
        Command::Workspaces => {
            let workspaces: BTreeMap<_, _> = plugin
                .workspace_names()
                .into_iter()
                .filter_map(|name| plugin.workspace(name).map(|workspace| (name, workspace.config())))
                .collect();
            print_json(&workspaces)?;
        }
        Command::Tables { workspace } => {
            let mut tree = SchemaTree::new();
            plugin.register_schemas(&UserSession::new(args.user), &mut tree);
            let schema = tree
                .get(plugin.name())
                .and_then(|schema| schema.as_any().downcast_ref::<FileSystemSchema>())
                .and_then(|schema| schema.workspace(&workspace))
                .with_context(|| format!("unknown workspace '{workspace}'"))?;
            print_json(&schema.list_tables().await?)?;
        }
        Command::Scan { selection, columns } => {
            let selection: serde_json::Value =
                serde_json::from_str(&selection).context("selection is not valid JSON")?;
            let columns: Vec<SchemaPath> = columns.into_iter().map(SchemaPath::new).collect();
            let scan = plugin.physical_scan(&selection, &columns).await?;
            info!(format = %scan.format, files = scan.files.len(), bytes = scan.total_bytes(), "planned scan");
            print_json(&scan)?;
        }
    }

    Ok(())
}
