use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use mlndash::config::DashConfig;
use mlndash::document::{EntitiesDoc, EntityKind, QueryDoc};
use mlndash::entity::{Catalog, EnumDecl, EnumEditor, ReservedNames, StreamDecl, StreamEditor};
use mlndash::errors::ValidationIssue;
use mlndash::graph::QueryGraph;
use mlndash::query::NodeEditor;
use mlndash::services::{DashApi, DashboardService, RestClient, Session, TracingNotifier};

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// YAML config file
    #[clap(short, long, global = true, default_value = "mlndash.yaml")]
    config: PathBuf,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a .qry, .str or .enum file and print its canonical JSON
    Check {
        file: PathBuf,
        /// Stream and enum files the document may refer to
        #[clap(long = "with", num_args = 1..)]
        with: Vec<PathBuf>,
    },
    /// Print the topological node order of a query document
    Order {
        file: PathBuf,
    },
    Login {
        username: String,
        password: String,
    },
    Logout,
    /// List the current remote directory
    Ls,
    Cd {
        dir: String,
    },
    Up,
    /// Print a remote file
    Cat {
        file: String,
    },
    Streams,
    Enums,
    Queries,
    /// Upload a local document after validating it
    Push {
        file: PathBuf,
        /// Replace the stored entity instead of creating it
        #[clap(short, long)]
        update: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let config = DashConfig::load(Some(args.config.as_path()))?;

    match args.command {
        Commands::Check { file, with } => {
            let catalog = load_catalog(&with)?;
            let (_, json) = check_file(&file, &catalog)?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Commands::Order { file } => {
            let doc = read_query(&file)?;
            let graph = QueryGraph::from_document(doc, Catalog::default())?;
            for id in graph.topological_order()? {
                let kind = graph.node(&id).map(|n| n.kind().to_string()).unwrap_or_default();
                println!("{}\t{}", id, kind);
            }
        }
        Commands::Login { username, password } => {
            let client = rest_client(&config)?;
            let session = client.login(&username, &password).await?;
            save_session(&config, Some(&session))?;
            info!("Logged in as {}", session.username);
        }
        Commands::Logout => {
            let client = rest_client(&config)?;
            client.logout().await?;
            save_session(&config, None)?;
            info!("Logged out");
        }
        Commands::Ls => {
            let client = rest_client(&config)?;
            let listing = client.list_directory().await?;
            println!("{}", listing.cwd);
            for entry in listing.list {
                if entry.is_file {
                    println!("  {}", entry.dir);
                } else {
                    println!("+ {}", entry.dir);
                }
            }
        }
        Commands::Cd { dir } => {
            let client = rest_client(&config)?;
            if let Some(cwd) = client.navigate_to_child_dir(&dir).await? {
                println!("{}", cwd);
            }
        }
        Commands::Up => {
            let client = rest_client(&config)?;
            if let Some(cwd) = client.navigate_to_parent_dir().await? {
                println!("{}", cwd);
            }
        }
        Commands::Cat { file } => {
            let client = rest_client(&config)?;
            let content = client.get_file_content(&file).await?;
            println!("{}", content.file_content);
            if let Some(alert) = content.alert_message {
                eprintln!("{}", alert);
            }
        }
        Commands::Streams => {
            let client = rest_client(&config)?;
            for stream in client.get_all_streams().await? {
                println!("{}\t{} field(s)", stream.stream_name, stream.fields.len());
            }
        }
        Commands::Enums => {
            let client = rest_client(&config)?;
            for decl in client.get_all_enums().await? {
                println!("{}\t{}", decl.enum_name, decl.values.join(", "));
            }
        }
        Commands::Queries => {
            let client = rest_client(&config)?;
            for query in client.get_all_queries().await? {
                let name = query
                    .get("queryName")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| query.to_string());
                println!("{}", name);
            }
        }
        Commands::Push { file, update } => {
            let client = Arc::new(rest_client(&config)?);
            let service = DashboardService::new(client.clone(), Arc::new(TracingNotifier));
            let catalog = service.fetch_catalog().await?;
            let (kind, json) = check_file(&file, &catalog)?;
            let doc = EntitiesDoc::single(kind, json);
            if update {
                client.update_entities(&doc).await?;
            } else {
                client.create_entities(&doc).await?;
            }
            info!("Pushed {} ({})", file.display(), kind);
        }
    }

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("hyper=off,reqwest=warn,{}", log_level)))
        .without_time()
        .init();
}

fn rest_client(config: &DashConfig) -> Result<RestClient> {
    let client = RestClient::new(&config.api.base_url, config.api.timeout())?;
    Ok(client.with_session(load_session(config)?))
}

fn load_session(config: &DashConfig) -> Result<Option<Session>> {
    let Some(path) = &config.session_file else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read session file {}", path.display()))?;
    let session = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse session file {}", path.display()))?;
    Ok(Some(session))
}

fn save_session(config: &DashConfig, session: Option<&Session>) -> Result<()> {
    let Some(path) = &config.session_file else {
        return Ok(());
    };
    match session {
        Some(session) => fs::write(path, serde_json::to_string(session)?)
            .with_context(|| format!("Failed to write session file {}", path.display())),
        None if path.exists() => fs::remove_file(path)
            .with_context(|| format!("Failed to remove session file {}", path.display())),
        None => Ok(()),
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn file_kind(path: &Path) -> Result<EntityKind> {
    let name = path.to_string_lossy();
    EntityKind::from_file_name(&name)
        .ok_or_else(|| anyhow!("{}: expected a .qry, .str or .enum file", path.display()))
}

fn read_query(path: &Path) -> Result<QueryDoc> {
    QueryDoc::from_json(&read_file(path)?)
        .with_context(|| format!("{} is not a query document", path.display()))
}

fn issues_error(path: &Path, issues: &[ValidationIssue]) -> anyhow::Error {
    if issues.is_empty() {
        return anyhow!("{} is not valid: node was never finished", path.display());
    }
    let listed: Vec<String> = issues.iter().map(ToString::to_string).collect();
    anyhow!("{} is not valid: {}", path.display(), listed.join("; "))
}

/// Stream and enum declarations given on the command line
fn load_catalog(paths: &[PathBuf]) -> Result<Catalog> {
    let mut catalog = Catalog::default();
    for path in paths {
        let content = read_file(path)?;
        match file_kind(path)? {
            EntityKind::Stream => catalog.streams.push(
                serde_json::from_str(&content)
                    .with_context(|| format!("{} is not a stream", path.display()))?,
            ),
            EntityKind::Enum => catalog.enums.push(
                serde_json::from_str(&content)
                    .with_context(|| format!("{} is not an enum", path.display()))?,
            ),
            EntityKind::Query => bail!("{}: only .str and .enum files can be used", path.display()),
        }
    }
    Ok(catalog)
}

/// Validate a local document against `catalog`; returns its canonical JSON
fn check_file(path: &Path, catalog: &Catalog) -> Result<(EntityKind, Value)> {
    let kind = file_kind(path)?;
    let content = read_file(path)?;
    let json = match kind {
        EntityKind::Query => {
            let doc = QueryDoc::from_json(&content)
                .with_context(|| format!("{} is not a query document", path.display()))?;
            let graph = QueryGraph::from_document(doc, catalog.clone())?;
            for id in graph.incomplete_nodes() {
                if let Some(node) = graph.node(&id) {
                    let err = issues_error(path, &node.editor().issues());
                    return Err(err.context(format!("node '{}' ({})", id, node.kind())));
                }
            }
            serde_json::to_value(graph.to_document()?)?
        }
        EntityKind::Stream => {
            let decl: StreamDecl = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a stream", path.display()))?;
            let reserved = ReservedNames::new(Vec::new(), catalog.enum_names());
            StreamEditor::open_existing(decl)
                .validate(&reserved)
                .map_err(|issues| issues_error(path, &issues))?
                .to_json()?
        }
        EntityKind::Enum => {
            let decl: EnumDecl = serde_json::from_str(&content)
                .with_context(|| format!("{} is not an enum", path.display()))?;
            EnumEditor::open_existing(decl)
                .validate(&ReservedNames::default())
                .map_err(|issues| issues_error(path, &issues))?
                .to_json()?
        }
    };
    Ok((kind, json))
}
