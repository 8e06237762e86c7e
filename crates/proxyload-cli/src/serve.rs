//! Serve command implementation for the proxyload CLI.
//!
//! Hosts a dist directory over HTTP.

use std::path::Path;

use proxyload_server::ServerConfig;

use crate::output::{self, GREEN, RESET};

/// Start the dist server.
pub async fn execute(dist_dir: &str, port: u16) -> anyhow::Result<()> {
    let path = Path::new(dist_dir);
    if !path.is_dir() {
        anyhow::bail!("Dist directory not found: {} (run a build first)", dist_dir);
    }

    let config = ServerConfig {
        port,
        dist_dir: path.to_path_buf(),
        ..Default::default()
    };

    output::header("serve", path.display());
    output::field("Server", format!("http://{}:{}", config.host, config.port));
    output::field(
        "Bootstrap",
        format!(
            "http://{}:{}/releases/<id>/client.js",
            config.host, config.port
        ),
    );
    output::rule();
    println!("{GREEN}Press Ctrl+C to stop{RESET}");
    println!();

    proxyload_server::serve(config).await?;

    Ok(())
}
