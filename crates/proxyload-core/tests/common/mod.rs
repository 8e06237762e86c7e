//! Shared fixtures for proxyload-core integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use proxyload_core::compile::{
    BuildConfig, CompileOutput, CompileRequest, Compiler, DependencySpec, OutputFile,
};
use proxyload_core::{Error, ReleaseBuilder, Result};
use tempfile::TempDir;

/// Stands in for esbuild: the "bundle" is the entry module itself.
pub struct EchoCompiler;

impl Compiler for EchoCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput> {
        let text = fs::read_to_string(request.entry).map_err(|e| Error::io(request.entry, e))?;
        Ok(CompileOutput {
            files: vec![OutputFile {
                path: "<stdout>".to_string(),
                text,
            }],
        })
    }
}

pub const BUTTON_DEFAULT: &str = r#"import React from "react";

export default function Button(props) {
  return React.createElement("h1", null, props.label);
}
"#;

pub const BUTTON_SECONDARY: &str = r#"import React from "react";

export default function Button(props) {
  return React.createElement("h2", null, props.label);
}
"#;

pub const EMAIL_FORM: &str = r#"import { useState } from "react";

export default function EmailForm(props) {
  const [email] = useState("");
  return email;
}
"#;

pub const COMPONENT_LOADER: &str = r#"export default function load(params) {
  return `${params.host}/items/${params.type}/${params.name}/${params.variation}/${params.hash}.js`;
}
"#;

/// A source tree and dist directory in a scratch directory.
pub struct Project {
    _temp: TempDir,
    pub source_dir: PathBuf,
    pub dist_dir: PathBuf,
}

impl Project {
    /// Button (default, secondary), EmailForm and a Component loader.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let source_dir = temp.path().join("src");
        let dist_dir = temp.path().join("dist");

        let project = Self {
            _temp: temp,
            source_dir,
            dist_dir,
        };
        project.write("Component/Button/default/index.tsx", BUTTON_DEFAULT);
        project.write("Component/Button/secondary/index.tsx", BUTTON_SECONDARY);
        project.write("Component/Button/interface.ts", "export interface Props {}\n");
        project.write("Component/EmailForm/default/index.jsx", EMAIL_FORM);
        project.write("Loader/Component/default/index.js", COMPONENT_LOADER);
        project.write(
            "targets.json",
            r#"{ "web": { "name": "web", "environments": ["staging", "production"] } }"#,
        );
        project
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.source_dir.join(relative);
        fs::create_dir_all(path.parent().expect("path has a parent"))
            .expect("Failed to create source dir");
        fs::write(path, contents).expect("Failed to write source file");
    }

    pub fn config(&self) -> BuildConfig {
        BuildConfig {
            source_dir: self.source_dir.clone(),
            dist_dir: self.dist_dir.clone(),
            dependencies: BTreeMap::from([(
                "react".to_string(),
                DependencySpec {
                    version: Some("19.0.0".to_string()),
                },
            )]),
            loaders: BTreeMap::from([(
                "Component".to_string(),
                "Loader/Component/default".to_string(),
            )]),
            ..Default::default()
        }
    }

    pub fn builder(&self) -> ReleaseBuilder {
        ReleaseBuilder::new(self.config(), Arc::new(EchoCompiler))
    }

    pub fn release_file(&self, id: &str, file: &str) -> PathBuf {
        self.dist_dir.join("releases").join(id).join(file)
    }

    /// Host URL under which `FsTransport` finds the dist directory.
    pub fn host(&self) -> String {
        path_string(&self.dist_dir)
    }
}

pub fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
