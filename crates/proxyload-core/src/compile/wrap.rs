//! Self-registering script wrappers.

use crate::artifact::ArtifactKey;
use crate::compile::rewrite::DEPS_PARAM;

/// Expression evaluating to the namespaced registry, creating it if absent.
pub fn registry_expr(namespace: &str) -> String {
    let ns = js_string(namespace);
    format!(
        "(globalThis[{ns}] = globalThis[{ns}] || {{ items: {{}}, releases: {{}}, current: \"\" }})"
    )
}

/// Wrap a factory body so that evaluating the script registers it under `key`.
pub fn wrap_factory(namespace: &str, key: &ArtifactKey, body: &str) -> String {
    let mut code = String::with_capacity(body.len() + 256);
    code.push_str("(function (registry) {\n");
    code.push_str(&format!(
        "registry.items[{}] = function ({DEPS_PARAM}) {{\n",
        js_string(&key.to_string())
    ));
    code.push_str(body);
    if !body.ends_with('\n') {
        code.push('\n');
    }
    code.push_str("};\n");
    code.push_str(&format!("}})({});\n", registry_expr(namespace)));
    code
}

/// Quote a string as a JavaScript literal.
pub(crate) fn js_string(value: &str) -> String {
    // JSON strings are valid JavaScript string literals.
    serde_json::Value::String(value.to_string()).to_string()
}
