use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;

use drift_session::{Catalog, DriftConfig, IndexRecord, Session};

use crate::cli::*;
use crate::shell::Shell;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Init(args) => cmd_init(&cli.config, args),
        Command::Queries => cmd_queries(&load_config(&cli.config)?),
        Command::Sessions => cmd_sessions(&load_config(&cli.config)?),
        Command::RmSession(args) => cmd_rm_session(&load_config(&cli.config)?, &args.name),
        Command::Shell(args) => cmd_shell(&load_config(&cli.config)?, args),
    }
}

fn load_config(path: &Path) -> anyhow::Result<DriftConfig> {
    DriftConfig::load(path)
        .with_context(|| format!("cannot load {} (run `drift init` first)", path.display()))
}

fn cmd_init(path: &Path, args: InitArgs) -> anyhow::Result<()> {
    if path.exists() && !args.force {
        bail!("{} already exists, pass --force to overwrite it", path.display());
    }
    let mut config = DriftConfig::new(args.workspace, args.endpoint);
    config.store.prefix_len = args.prefix_len;
    let text = config.to_toml_string()?;
    DriftConfig::from_toml_str(&text)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text).with_context(|| format!("cannot write {}", path.display()))?;

    let config = load_config(path)?;
    Catalog::open(&config)?;
    println!("{} Initialized Drift workspace in {}", "✓".green().bold(), config.workspace.display().to_string().bold());
    println!("  Backend: {}", config.backend.endpoint.to_string().cyan());
    println!("  Config: {}", path.display());
    Ok(())
}

fn print_records(kind: &str, records: &[IndexRecord]) {
    if records.is_empty() {
        println!("No saved {kind}.");
        return;
    }
    for (i, r) in records.iter().enumerate() {
        println!("{} {}  {}", i.to_string().bold(), r.name, r.hash.short_hex().dimmed());
    }
}

fn cmd_queries(config: &DriftConfig) -> anyhow::Result<()> {
    let catalog = Catalog::open(config)?;
    print_records("queries", &catalog.list_queries()?);
    Ok(())
}

fn cmd_sessions(config: &DriftConfig) -> anyhow::Result<()> {
    let catalog = Catalog::open(config)?;
    print_records("sessions", &catalog.list_sessions()?);
    Ok(())
}

fn cmd_rm_session(config: &DriftConfig, name: &str) -> anyhow::Result<()> {
    let catalog = Catalog::open(config)?;
    if catalog.remove_session(name)? {
        println!("{} Removed session {}", "✓".green(), name.yellow());
    } else {
        println!("{} No session named {}", "!".yellow().bold(), name.yellow());
    }
    Ok(())
}

fn cmd_shell(config: &DriftConfig, args: ShellArgs) -> anyhow::Result<()> {
    let catalog = Arc::new(Catalog::open(config)?);
    let backend = config.backend.endpoint.backend();
    let defaults = config.backend.defaults();

    let session = match &args.session {
        Some(name) => {
            let (session, report) = Session::load(name, backend, catalog, defaults)?;
            println!("Loaded session {} ({} documents)", name.yellow(), session.graph().len());
            if !report.is_complete() {
                println!(
                    "{} {} stack entries could not be restored",
                    "!".yellow().bold(),
                    report.missing.len()
                );
            }
            session
        }
        None => Session::new(backend, catalog, defaults),
    };

    let stdin = io::stdin();
    let mut shell = Shell::new(session, io::stdout());
    shell.run(stdin.lock())
}
