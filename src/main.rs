use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dumphub_client::api::{AnalyzeRequest, HttpApi, RemoteApi, StatusResult};
use dumphub_client::config::{self, DumpHubConfig};
use dumphub_client::events::{ConsoleEventHandler, EventBus};
use dumphub_client::logging;
use dumphub_client::pattern::{AnalyzePattern, UploadPattern};
use dumphub_client::poller::StatusPoller;
use dumphub_client::preview::{self, PreviewTable, UploadPreview};
use dumphub_client::shutdown::ShutdownCoordinator;
use dumphub_client::upload_queue::{FileSource, UploadQueue, UploadState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about = "Dump Hub client", long_about = None)]
struct Cli {
    /// Server URL, overrides the saved configuration
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files in chunks
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Preview the head of a local file as a table
    Preview {
        file: PathBuf,
        #[arg(long)]
        separator: Option<String>,
        /// comment character, pass an empty value to disable
        #[arg(long)]
        comment: Option<String>,
    },
    /// Preview a stored file on the server
    RemotePreview {
        filename: String,
        #[arg(long, default_value_t = 0)]
        start: usize,
        #[arg(long, default_value = ":")]
        separator: String,
    },
    /// Request analysis of a stored file
    Analyze {
        filename: String,
        #[arg(long, default_value_t = 0)]
        start: usize,
        #[arg(long, default_value = ":")]
        separator: String,
        /// column indexes to index, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        columns: Vec<usize>,
    },
    /// List files in the server upload folder
    Files,
    /// Delete a stored file from the upload folder
    DeleteFile { filename: String },
    /// Search indexed entries
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show analysis status
    Status {
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// keep refreshing until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Delete an analyzed dump by checksum
    Delete { checksum: String },
    /// Show or change the saved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Save the server URL
    SetServer { url: String },
    /// Restore defaults
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let mut config = config::load_config().context("loading configuration")?;
    if let Some(server) = &cli.server {
        config.server_url = Some(server.clone());
    }

    match cli.command {
        Commands::Config { action } => run_config(action, config),
        Commands::Preview {
            file,
            separator,
            comment,
        } => run_local_preview(&config, file, separator, comment).await,
        Commands::Upload { files } => run_upload(connect(&config)?, &config, files).await,
        Commands::RemotePreview {
            filename,
            start,
            separator,
        } => {
            let result = connect(&config)?.get_preview(&filename, start).await?;
            print_table(&preview::parse(&result.preview[..], &separator));
            Ok(())
        }
        Commands::Analyze {
            filename,
            start,
            separator,
            columns,
        } => {
            let pattern = AnalyzePattern::new(start, separator);
            let request = AnalyzeRequest {
                filename: filename.clone(),
                pattern: pattern.render(),
                columns,
            };
            connect(&config)?.analyze(&request).await?;
            println!("{} will be analyzed in background", filename);
            Ok(())
        }
        Commands::Files => {
            let listing = connect(&config)?.list_files().await?;
            println!("{}", listing.dir);
            for file in listing.files {
                println!("{:>14}  {}", file.size, file.filename);
            }
            Ok(())
        }
        Commands::DeleteFile { filename } => {
            connect(&config)?.delete_file(&filename).await?;
            println!("Deleted {}", filename);
            Ok(())
        }
        Commands::Search { query, page } => {
            let result = connect(&config)?.search(&query, page).await?;
            println!("{} results", result.total);
            for entry in result.results {
                println!("{} [{}] {}", entry.origin, entry.origin_id, entry.data.join(" | "));
            }
            Ok(())
        }
        Commands::Status { page, watch } => {
            let api = connect(&config)?;
            if watch {
                watch_status(api, page, Duration::from_secs(config.poll_interval_secs)).await
            } else {
                print_status(&api.get_status(page).await?);
                Ok(())
            }
        }
        Commands::Delete { checksum } => {
            connect(&config)?.delete(&checksum).await?;
            println!("Deletion of {} requested", checksum);
            Ok(())
        }
    }
}

fn connect(config: &DumpHubConfig) -> Result<Arc<dyn RemoteApi>> {
    config.validate()?;
    Ok(Arc::new(HttpApi::from_config(config)?))
}

async fn run_upload(api: Arc<dyn RemoteApi>, config: &DumpHubConfig, files: Vec<PathBuf>) -> Result<()> {
    let events = EventBus::default();
    let shutdown = ShutdownCoordinator::new();
    let printer = ConsoleEventHandler::new(events.clone(), shutdown.clone()).start();

    let queue = UploadQueue::from_config(api, events, config);
    let mut rejected = 0;
    for path in &files {
        if let Err(e) = queue.enqueue_path(path).await {
            eprintln!("✗ {}: {}", path.display(), e);
            rejected += 1;
        }
    }

    let finished = queue.wait_all().await;
    shutdown.shutdown();
    let _ = printer.await;

    let failed = finished
        .iter()
        .filter(|f| f.state == UploadState::Failed)
        .count();
    println!(
        "{} uploaded, {} failed",
        finished.len() - failed,
        failed + rejected
    );

    if failed + rejected > 0 {
        bail!("{} file(s) were not uploaded", failed + rejected);
    }
    Ok(())
}

async fn run_local_preview(
    config: &DumpHubConfig,
    file: PathBuf,
    separator: Option<String>,
    comment: Option<String>,
) -> Result<()> {
    let comment_char = match comment {
        Some(value) => value.chars().next(),
        None => config.comment_char,
    };
    let pattern = UploadPattern::new(
        separator.unwrap_or_else(|| config.separator.clone()),
        comment_char,
    );

    let mut session = UploadPreview::new(pattern);
    session.load(&FileSource::from_path(file)).await?;

    println!("pattern: {}", session.pattern());
    print_table(session.table());
    Ok(())
}

async fn watch_status(api: Arc<dyn RemoteApi>, page: u32, interval: Duration) -> Result<()> {
    let (handle, mut results) = StatusPoller::new(api, page, interval).spawn();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            result = results.recv() => match result {
                Some(status) => print_status(&status),
                None => break,
            },
        }
    }

    handle.stop().await;
    Ok(())
}

fn run_config(action: ConfigAction, config: DumpHubConfig) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::SetServer { url } => {
            let mut saved = config::load_config()?;
            saved.server_url = Some(url);
            saved.validate()?;
            config::save_config(&saved)?;
            println!("Saved server URL to {}", config::get_config_file_path()?.display());
        }
        ConfigAction::Reset => {
            config::clear_config()?;
            println!("Configuration reset");
        }
    }
    Ok(())
}

fn print_table(table: &PreviewTable) {
    if table.is_empty() {
        println!("(no preview lines)");
        return;
    }

    let header: Vec<String> = (0..table.max_cols).map(|i| format!("[{}]", i)).collect();
    println!("{}", header.join("\t"));
    for row in &table.rows {
        println!("{}", row.join("\t"));
    }
}

fn print_status(status: &StatusResult) {
    println!("{} entries", status.total);
    for entry in &status.results {
        println!(
            "{}  {:<10}  {}  {}",
            entry.date,
            entry.kind().label(),
            entry.checksum,
            entry.filename
        );
    }
}
