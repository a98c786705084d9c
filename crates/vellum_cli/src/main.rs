//! Vellum CLI - versioned document storage from the command line.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::Globals;

#[derive(Parser)]
#[command(name = "vellum")]
#[command(about = "Versioned document storage for collaborative editing", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding vellum.toml and the durable bucket
    #[arg(long, global = true, default_value = ".vellum")]
    data_dir: PathBuf,

    /// Override the configured backend (memory, durable)
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a data directory with a default configuration
    Init {
        /// Durable bucket name
        #[arg(long)]
        bucket: Option<String>,
        /// Listen port for a network transport
        #[arg(long)]
        port: Option<u16>,
        /// TLS certificate chain (PEM)
        #[arg(long, requires = "key")]
        cert: Option<PathBuf>,
        /// TLS private key (PEM)
        #[arg(long, requires = "cert")]
        key: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config,
    /// Serve JSON requests line by line on stdin
    Session,
    /// List committed generations of a file
    Versions {
        /// Project identifier
        project: String,
        /// File identifier
        file: String,
    },
    /// Print the content of a committed generation
    Show {
        /// Project identifier
        project: String,
        /// File identifier
        file: String,
        /// Generation (latest if omitted)
        #[arg(short, long)]
        generation: Option<i64>,
    },
    /// List the patches stored with a generation
    Patches {
        /// Project identifier
        project: String,
        /// File identifier
        file: String,
        /// Generation
        generation: i64,
    },
    /// Print a file's text at a generation without one patch
    DeletePatch {
        /// Project identifier
        project: String,
        /// File identifier
        file: String,
        /// Generation to reconstruct
        generation: i64,
        /// Timestamp of the patch to leave out
        timestamp: i64,
    },
    /// Tombstone a file in its project's cemetery
    DeleteFile {
        /// Project identifier
        project: String,
        /// File identifier
        file: String,
        /// File name to record
        name: String,
        /// Removal time in milliseconds (now if omitted)
        #[arg(long)]
        timestamp: Option<i64>,
    },
    /// List a project's tombstones
    Cemetery {
        /// Project identifier
        project: String,
    },
    /// Print the serialized patch between two text files
    Diff {
        /// Original text file
        old: PathBuf,
        /// Edited text file
        new: PathBuf,
    },
}

fn main() -> Result<()> {
    // Respects RUST_LOG (e.g., RUST_LOG=vellum_core=debug).
    // Logs go to stderr; stdout carries session responses.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let globals = Globals {
        data_dir: cli.data_dir,
        backend: cli.backend,
    };

    match cli.command {
        Commands::Init {
            bucket,
            port,
            cert,
            key,
        } => commands::init::run(
            &globals,
            commands::init::InitOptions {
                bucket,
                port,
                cert,
                key,
            },
        ),
        Commands::Config => commands::config::run(&globals),
        Commands::Session => commands::session::run(&globals),
        Commands::Versions { project, file } => commands::versions::run(&globals, &project, &file),
        Commands::Show {
            project,
            file,
            generation,
        } => commands::show::run(&globals, &project, &file, generation),
        Commands::Patches {
            project,
            file,
            generation,
        } => commands::patches::run(&globals, &project, &file, generation),
        Commands::DeletePatch {
            project,
            file,
            generation,
            timestamp,
        } => commands::delete_patch::run(&globals, &project, &file, generation, timestamp),
        Commands::DeleteFile {
            project,
            file,
            name,
            timestamp,
        } => commands::delete_file::run(&globals, &project, &file, &name, timestamp),
        Commands::Cemetery { project } => commands::cemetery::run(&globals, &project),
        Commands::Diff { old, new } => commands::diff::run(&old, &new),
    }
}
