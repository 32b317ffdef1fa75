//! Catalog operations: read-only listings passed through from the toolchain.

use serde::{Deserialize, Serialize};

use super::names;

/// Which listing to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    /// Every board known to the installed cores.
    Boards,
    /// Installed cores.
    Cores,
    /// Installed libraries.
    Libs,
    /// Connected boards and serial ports.
    Ports,
}

impl CatalogKind {
    pub fn from_op(op: &str) -> Option<Self> {
        match op {
            names::BOARDS => Some(CatalogKind::Boards),
            names::CORES => Some(CatalogKind::Cores),
            names::LIBS => Some(CatalogKind::Libs),
            names::PORTS => Some(CatalogKind::Ports),
            _ => None,
        }
    }

    /// Toolchain subcommand words, before `--format json`.
    pub fn subcommand(&self) -> &'static [&'static str] {
        match self {
            CatalogKind::Boards => &["board", "listall"],
            CatalogKind::Cores => &["core", "list"],
            CatalogKind::Libs => &["lib", "list"],
            CatalogKind::Ports => &["board", "list"],
        }
    }
}
