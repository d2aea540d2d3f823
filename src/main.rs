//! kbctl CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use kbctl::{
    api::ApiClient,
    commands::{
        cmd_add_manual, cmd_create_index, cmd_create_project, cmd_delete_index, cmd_delete_job,
        cmd_delete_project, cmd_init, cmd_job_content, cmd_list_indexes, cmd_list_jobs,
        cmd_list_projects, cmd_query, cmd_scrape_url, cmd_show_project, cmd_status,
        cmd_sync_index, cmd_upload_pdf, cmd_watch, print_indexes, print_init, print_jobs,
        print_project, print_projects, print_query_results, print_status, print_watch_summary,
        QueryOptions, SyncOptions,
    },
    config::Config,
    error::{Error, Result},
    progress::LogWriterFactory,
    store::{EntityStore, PollScheduler},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "kbctl")]
#[command(version, about = "Admin console for a remote knowledge base service", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize kbctl configuration
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,

        /// Knowledge base service URL
        #[arg(long)]
        url: Option<String>,
    },

    /// Show service status and account totals
    Status,

    /// Manage projects
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Manage a project's documents
    Doc {
        #[command(subcommand)]
        action: DocAction,
    },

    /// Manage a project's indexes
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Run a semantic query against a synced index
    Query {
        /// Index ID to query
        index_id: String,

        /// The search query
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Follow a project's documents and indexes until all have settled
    Watch {
        /// Project ID to watch
        project_id: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// List all projects
    List,

    /// Create a new project
    Create {
        /// Project name
        name: String,

        /// Project description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Show one project
    Show {
        /// Project ID
        project_id: String,
    },

    /// Delete a project and everything in it
    Delete {
        /// Project ID
        project_id: String,
    },
}

#[derive(Subcommand)]
enum DocAction {
    /// List a project's documents
    List {
        /// Project ID
        project_id: String,
    },

    /// Upload a PDF for parsing
    Upload {
        /// Project ID
        project_id: String,

        /// Path to the PDF file
        path: PathBuf,
    },

    /// Scrape a web page into the project
    Scrape {
        /// Project ID
        project_id: String,

        /// URL to scrape
        url: String,
    },

    /// Add manual text content
    Add {
        /// Project ID
        project_id: String,

        /// Content title
        title: String,

        /// Content body (reads stdin when omitted)
        content: Option<String>,
    },

    /// Show the extracted markdown of a document
    Content {
        /// Job ID
        job_id: String,
    },

    /// Delete a document
    Delete {
        /// Project ID
        project_id: String,

        /// Job ID
        job_id: String,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// List a project's indexes
    List {
        /// Project ID
        project_id: String,
    },

    /// Create an index over completed documents
    Create {
        /// Project ID
        project_id: String,

        /// Index name
        name: String,

        /// Index description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Document (job) IDs to include, 1 to 5
        #[arg(long = "job", required = true)]
        job_ids: Vec<String>,
    },

    /// Trigger embedding sync for an index
    Sync {
        /// Project ID
        project_id: String,

        /// Index ID
        index_id: String,

        /// Embedding model override
        #[arg(long)]
        model: Option<String>,

        /// Chunk size ratio override (0-1]
        #[arg(long)]
        chunk_ratio: Option<f64>,

        /// Chunk overlap ratio override [0-1)
        #[arg(long)]
        overlap_ratio: Option<f64>,
    },

    /// Delete an index
    Delete {
        /// Project ID
        project_id: String,

        /// Index ID
        index_id: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    // Init doesn't need an existing config
    if let Commands::Init { force, url } = cli.command {
        let base_dir = cli.config.and_then(|p| p.parent().map(PathBuf::from));
        let config = cmd_init(base_dir, force, url).await?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            print_init(&config);
        }
        return Ok(());
    }

    // Completions don't need config either
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "kbctl", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    let api = ApiClient::from_config(&config)?;
    let store = Arc::new(EntityStore::new(Arc::new(api)));

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Status => {
            let status = cmd_status(&config, &store).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }

        Commands::Project { action } => match action {
            ProjectAction::List => {
                let projects = cmd_list_projects(&store).await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&projects)?);
                } else {
                    print_projects(&projects);
                }
            }
            ProjectAction::Create { name, description } => {
                let project = cmd_create_project(&store, &name, &description).await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&project)?);
                } else {
                    println!("✓ Project '{}' created ({})", project.name, project.id);
                }
            }
            ProjectAction::Show { project_id } => {
                let project = cmd_show_project(&store, &project_id).await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&project)?);
                } else {
                    print_project(&project);
                }
            }
            ProjectAction::Delete { project_id } => {
                cmd_delete_project(&store, &project_id).await?;
                println!("✓ Project '{}' deleted", project_id);
            }
        },

        Commands::Doc { action } => match action {
            DocAction::List { project_id } => {
                let jobs = cmd_list_jobs(&store, &project_id).await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&jobs)?);
                } else {
                    print_jobs(&jobs);
                }
            }
            DocAction::Upload { project_id, path } => {
                let filename = cmd_upload_pdf(&store, &project_id, &path).await?;
                println!("✓ Uploaded '{}'; parsing runs server-side", filename);
                println!("  Follow progress with 'kbctl watch {}'", project_id);
            }
            DocAction::Scrape { project_id, url } => {
                cmd_scrape_url(&store, &project_id, &url).await?;
                println!("✓ Scrape started for {}", url);
                println!("  Follow progress with 'kbctl watch {}'", project_id);
            }
            DocAction::Add {
                project_id,
                title,
                content,
            } => {
                let content = match content {
                    Some(content) => content,
                    None => read_stdin()?,
                };
                cmd_add_manual(&store, &project_id, &title, &content).await?;
                println!("✓ Content '{}' added", title);
            }
            DocAction::Content { job_id } => {
                let content = cmd_job_content(&store, &job_id).await?;
                println!("{}", content);
            }
            DocAction::Delete { project_id, job_id } => {
                cmd_delete_job(&store, &project_id, &job_id).await?;
                println!("✓ Document '{}' deleted", job_id);
            }
        },

        Commands::Index { action } => match action {
            IndexAction::List { project_id } => {
                let indexes = cmd_list_indexes(&store, &project_id).await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&indexes)?);
                } else {
                    print_indexes(&indexes);
                }
            }
            IndexAction::Create {
                project_id,
                name,
                description,
                job_ids,
            } => {
                let index =
                    cmd_create_index(&store, &project_id, &name, &description, &job_ids).await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&index)?);
                } else {
                    println!("✓ Index '{}' created ({})", index.name, index.id);
                    println!("  Run 'kbctl index sync {} {}' to embed it", project_id, index.id);
                }
            }
            IndexAction::Sync {
                project_id,
                index_id,
                model,
                chunk_ratio,
                overlap_ratio,
            } => {
                let options = SyncOptions {
                    embedding_model: model,
                    chunk_ratio,
                    overlap_ratio,
                };
                cmd_sync_index(&store, &config, &project_id, &index_id, options).await?;
                println!("✓ Sync started for index '{}'", index_id);
                println!("  Follow progress with 'kbctl watch {}'", project_id);
            }
            IndexAction::Delete {
                project_id,
                index_id,
            } => {
                cmd_delete_index(&store, &project_id, &index_id).await?;
                println!("✓ Index '{}' deleted", index_id);
            }
        },

        Commands::Query {
            index_id,
            query,
            limit,
        } => {
            let options = QueryOptions { limit };
            let outcome = cmd_query(&store, &config, &index_id, &query, options).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_query_results(&outcome);
            }
        }

        Commands::Watch { project_id } => {
            let scheduler = PollScheduler::new(Arc::clone(&store), &config.poll);
            let summary = cmd_watch(&scheduler, &project_id).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_watch_summary(&summary);
                print_jobs(&summary.jobs);
                print_indexes(&summary.indexes);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => {
            let default = Config::default_config_path();
            if !default.exists() {
                return Err(Error::NotInitialized);
            }
            Config::load(&default)
        }
    }
}

fn read_stdin() -> Result<String> {
    use std::io::Read;
    let mut content = String::new();
    std::io::stdin().read_to_string(&mut content)?;
    Ok(content)
}
