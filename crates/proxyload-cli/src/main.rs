//! proxyload CLI - build, host and promote independently deployed UI
//! components.

mod build;
mod output;
mod promote;
mod serve;
mod watch;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "proxyload")]
#[command(about = "Build, host and promote independently deployed UI components")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every component variant and write a release
    Build {
        /// Path to the build configuration
        #[arg(short, long, default_value = "proxyload.toml")]
        config: String,

        /// Release id to write
        #[arg(short, long)]
        release: String,
    },

    /// Rebuild a release whenever a source module changes
    Watch {
        /// Path to the build configuration
        #[arg(short, long, default_value = "proxyload.toml")]
        config: String,

        /// Release id to write
        #[arg(short, long)]
        release: String,
    },

    /// Set the current release of a target environment
    SetRelease {
        /// Target name (e.g. web)
        #[arg(short, long)]
        target: String,

        /// Environment name (e.g. production)
        #[arg(short, long)]
        environment: String,

        /// Release id
        #[arg(short, long)]
        release: String,

        /// Directory containing targets.json
        #[arg(short, long, default_value = "src")]
        src: String,

        /// Dist directory
        #[arg(short, long, default_value = "dist")]
        dist: String,
    },

    /// Interactively select target, environment and release
    Inquire {
        /// Directory containing targets.json
        #[arg(short, long, default_value = "src")]
        src: String,

        /// Dist directory
        #[arg(short, long, default_value = "dist")]
        dist: String,
    },

    /// Show the current release and recent history of a target
    Status {
        /// Target name
        #[arg(short, long)]
        target: String,

        /// Dist directory
        #[arg(short, long, default_value = "dist")]
        dist: String,

        /// Number of earlier releases to show per environment
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// List built releases, newest first
    Releases {
        /// Dist directory
        #[arg(short, long, default_value = "dist")]
        dist: String,
    },

    /// Serve a dist directory over HTTP
    Serve {
        /// Dist directory
        #[arg(short, long, default_value = "dist")]
        dist: String,

        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format_error = |err: anyhow::Error| anyhow::anyhow!("{}", output::describe(&err));

    match cli.command {
        Commands::Build { config, release } => {
            build::execute(&config, &release).map_err(format_error)?;
        }

        Commands::Watch { config, release } => {
            watch::execute(&config, &release).await.map_err(format_error)?;
        }

        Commands::SetRelease {
            target,
            environment,
            release,
            src,
            dist,
        } => {
            promote::set_release(&src, &dist, &target, &environment, &release)
                .map_err(format_error)?;
        }

        Commands::Inquire { src, dist } => {
            promote::inquire(&src, &dist).map_err(format_error)?;
        }

        Commands::Status {
            target,
            dist,
            limit,
        } => {
            promote::status(&dist, &target, limit).map_err(format_error)?;
        }

        Commands::Releases { dist } => {
            promote::releases(&dist).map_err(format_error)?;
        }

        Commands::Serve { dist, port } => {
            serve::execute(&dist, port).await.map_err(format_error)?;
        }
    }

    Ok(())
}
