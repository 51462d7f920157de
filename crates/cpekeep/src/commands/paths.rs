//! Path table command handlers.

use serde::Serialize;
use tabled::Tabled;

use cpekeep_core::normalize::table::{self, PathTemplate};
use cpekeep_core::{CoreError, Dialect, IndexVars, normalize};

use crate::cli::{GlobalOpts, PathsArgs, PathsCommand};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct PathEntry {
    logical: &'static str,
    category: &'static str,
    tr098: &'static str,
    tr181: &'static str,
}

impl From<&PathTemplate> for PathEntry {
    fn from(t: &PathTemplate) -> Self {
        Self {
            logical: t.logical,
            category: t.category(),
            tr098: t.tr098,
            tr181: t.tr181,
        }
    }
}

#[derive(Tabled)]
struct PathRow {
    #[tabled(rename = "Logical")]
    logical: &'static str,
    #[tabled(rename = "TR-098")]
    tr098: &'static str,
    #[tabled(rename = "TR-181")]
    tr181: &'static str,
}

impl From<&PathEntry> for PathRow {
    fn from(e: &PathEntry) -> Self {
        Self {
            logical: e.logical,
            tr098: e.tr098,
            tr181: e.tr181,
        }
    }
}

#[derive(Debug, Serialize)]
struct ResolvedPair {
    logical: String,
    tr098: String,
    tr181: String,
}

impl ResolvedPair {
    fn path(&self, dialect: Dialect) -> &str {
        match dialect {
            Dialect::Tr098 => &self.tr098,
            Dialect::Tr181 => &self.tr181,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: PathsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        PathsCommand::List { category } => {
            let entries: Vec<PathEntry> = normalize::list_paths(category.as_deref())
                .into_iter()
                .filter_map(table::lookup)
                .map(PathEntry::from)
                .collect();
            if let (Some(category), true) = (category, entries.is_empty()) {
                return Err(CliError::NotFound {
                    resource_type: "category".into(),
                    identifier: category,
                    list_command: "paths list".into(),
                });
            }
            let out = output::render_list(
                &global.output,
                &entries,
                |e| PathRow::from(e),
                |e| e.logical.to_owned(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PathsCommand::Resolve {
            logical,
            vars,
            dialect,
        } => {
            let mut index = IndexVars::new();
            for (name, value) in vars {
                index.insert(name, value);
            }
            let (tr098, tr181) = normalize::resolve_pair(&logical, &index)?;
            let pair = ResolvedPair {
                logical,
                tr098,
                tr181,
            };

            let out = output::render_single(
                &global.output,
                &pair,
                |p| match dialect {
                    Some(d) => p.path(d).to_owned(),
                    None => format!(
                        "Logical: {}\nTR-098:  {}\nTR-181:  {}",
                        p.logical, p.tr098, p.tr181
                    ),
                },
                |p| match dialect {
                    Some(d) => p.path(d).to_owned(),
                    None => format!("{}\n{}", p.tr098, p.tr181),
                },
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

/// Unknown names fail the same way everywhere.
pub fn ensure_known(logical: &str) -> Result<(), CliError> {
    table::lookup(logical)
        .map(|_| ())
        .ok_or_else(|| {
            CoreError::UnknownLogicalPath {
                name: logical.to_owned(),
            }
            .into()
        })
}
