//! Clap adapter.
//!
//! Compiled only with the `cli` Cargo feature (on by default). [`EditorArgs`]
//! embeds into a `#[derive(Parser)]` struct and [`EditorArgs::into_action()`]
//! turns the parsed subcommand into an [`EditorAction`](crate::EditorAction);
//! everything after that goes through the clap-free
//! [`ConfigEditor::handle()`](crate::ConfigEditor::handle).

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::types::EditorAction;

/// Clap-derived args for the editor subcommands.
#[derive(Debug, Args)]
pub struct EditorArgs {
    #[command(subcommand)]
    pub action: Option<EditorSubcommand>,
}

#[derive(Debug, Subcommand)]
pub enum EditorSubcommand {
    /// List the YAML files of the config directory.
    Files,
    /// Report top-level keys defined in more than one file.
    Analyze {
        /// Print the analysis as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Merge every file into the combine target.
    Combine {
        /// File that keeps a duplicate key, as KEY=FILE. Repeatable.
        #[arg(long, value_name = "KEY=FILE", value_parser = parse_key_file)]
        primary: Vec<(String, String)>,
        /// Merge this key's blocks into the primary even if they conflict.
        #[arg(long, value_name = "KEY")]
        merge: Vec<String>,
        /// Keep only the primary block for this key; drop the others.
        #[arg(long, value_name = "KEY")]
        no_merge: Vec<String>,
    },
    /// Move top-level blocks out of a file into `<stem>-<key>.yaml` files.
    Split {
        file: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Print a section's data.
    Get { section: String },
    /// Replace a section's data with the object in a YAML or JSON file.
    Set { section: String, input: PathBuf },
    /// Verify that every required section exists.
    Check,
    /// Print the effective editor settings.
    Settings,
}

impl EditorArgs {
    /// Convert clap-parsed args into a framework-agnostic `EditorAction`.
    ///
    /// No subcommand lists the files.
    pub fn into_action(self) -> EditorAction {
        match self.action {
            None | Some(EditorSubcommand::Files) => EditorAction::Files,
            Some(EditorSubcommand::Analyze { json }) => EditorAction::Analyze { json },
            Some(EditorSubcommand::Combine {
                primary,
                merge,
                no_merge,
            }) => EditorAction::Combine {
                primary,
                merge,
                no_merge,
            },
            Some(EditorSubcommand::Split { file, keys }) => EditorAction::Split { file, keys },
            Some(EditorSubcommand::Get { section }) => EditorAction::Get { section },
            Some(EditorSubcommand::Set { section, input }) => EditorAction::Set { section, input },
            Some(EditorSubcommand::Check) => EditorAction::Check,
            Some(EditorSubcommand::Settings) => EditorAction::Settings,
        }
    }
}

fn parse_key_file(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, file)) if !key.is_empty() && !file.is_empty() => {
            Ok((key.to_string(), file.to_string()))
        }
        _ => Err(format!("expected KEY=FILE, got '{arg}'")),
    }
}
