//! Releases: assembly, documents and bootstrap scripts.

mod assembler;
mod bootstrap;
mod types;

pub use assembler::{AssembledRelease, ReleaseAssembler, ReleasePlan};
pub use bootstrap::{client_bootstrap, server_bootstrap};
pub use types::{Release, ReleaseIndex, ReleaseMeta, ReleaseRecord};
