use std::path::PathBuf;
use std::process;

use clap::Parser;
use sfs_config::{ConfigEditor, EditorArgs, EditorError, EditorSettings, SectionMapping};

#[derive(Parser)]
#[command(name = "sfs-config")]
#[command(about = "Inspect, merge and edit Statistics for Strava config files", long_about = None)]
#[command(version)]
struct Cli {
    /// Read editor settings from this file instead of searching for sfs-config.toml
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Config directory (overrides the settings file)
    #[arg(short, long, global = true, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// JSON section mapping to use instead of deriving one from the files
    #[arg(long, global = true, value_name = "FILE")]
    mapping: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    editor: EditorArgs,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

fn run(cli: Cli) -> Result<(), EditorError> {
    let mut settings = match &cli.settings {
        Some(path) => EditorSettings::from_files(std::slice::from_ref(path))?,
        None => EditorSettings::discover(&EditorSettings::default_search_paths())?,
    };
    if let Some(dir) = cli.dir {
        settings.config_directory = dir;
    }
    log::debug!("config directory: {}", settings.config_directory.display());

    let mut editor = ConfigEditor::open(settings)?;
    if let Some(path) = &cli.mapping {
        let json = std::fs::read_to_string(path).map_err(|e| EditorError::Io {
            path: path.clone(),
            source: e,
        })?;
        editor = editor.with_mapping(SectionMapping::from_json(&json)?);
    }

    editor.handle_and_print(&cli.editor.into_action())
}
