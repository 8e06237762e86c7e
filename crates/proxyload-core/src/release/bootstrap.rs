//! Bootstrap script emitters.
//!
//! `server.js` registers a release's metadata and marks it current.
//! `client.js` does the same and additionally inlines the code of every
//! loader artifact, so the browser can render without a further request for
//! the loaders themselves.

use crate::compile::wrap::{js_string, registry_expr};
use crate::error::Result;

use super::types::Release;

/// Script registering `release` and making it current.
pub fn server_bootstrap(namespace: &str, release: &Release) -> Result<String> {
    let mut code = String::new();
    code.push_str("(function (registry) {\n");
    code.push_str(&format!(
        "registry.releases[{}] = {};\n",
        js_string(&release.id),
        serde_json::to_string(release)?
    ));
    code.push_str(&format!("registry.current = {};\n", js_string(&release.id)));
    code.push_str(&format!("}})({});\n", registry_expr(namespace)));
    Ok(code)
}

/// Server bootstrap followed by the loader artifacts' code.
///
/// `loader_code` must be given in type order.
pub fn client_bootstrap<'a>(
    namespace: &str,
    release: &Release,
    loader_code: impl IntoIterator<Item = &'a str>,
) -> Result<String> {
    let mut code = server_bootstrap(namespace, release)?;
    for loader in loader_code {
        code.push_str(loader);
        if !loader.ends_with('\n') {
            code.push('\n');
        }
    }
    Ok(code)
}
