//! Table fixture commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::output::{print_list, OutputFormat, TableDisplay};
use fixturekit_common::{FixturesConfig, SqliteTableStore, TableStore};

#[derive(Subcommand)]
pub enum DbCommands {
    /// Load fixture rows into tables
    Load {
        /// Table names
        #[arg(required = true)]
        tables: Vec<String>,
    },

    /// Delete all rows from tables
    Unload {
        /// Table names
        #[arg(required = true)]
        tables: Vec<String>,
    },
}

/// Table row count for display
#[derive(Serialize)]
pub struct TableDisplayRow {
    pub table: String,
    pub rows: i64,
}

impl TableDisplay for TableDisplayRow {
    fn headers() -> Vec<&'static str> {
        vec!["Table", "Rows"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.table.clone(), self.rows.to_string()]
    }
}

pub fn execute(cmd: DbCommands, config: &FixturesConfig, format: OutputFormat) -> Result<()> {
    let store = SqliteTableStore::open(&config.database.path, &config.database.fixtures_dir)?;

    let tables = match cmd {
        DbCommands::Load { tables } => {
            store.load(&tables)?;
            tables
        }
        DbCommands::Unload { tables } => {
            tracing::debug!(?tables, "Unloading tables");
            store.unload(&tables)?;
            tables
        }
    };

    let rows = tables
        .iter()
        .map(|table| {
            Ok(TableDisplayRow {
                table: table.clone(),
                rows: store.row_count(table)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    print_list(&rows, format);
    Ok(())
}
