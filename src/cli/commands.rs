//! Command dispatch: maps parsed CLI arguments onto services.

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::application::services::CategoryDraft;
use crate::application::IoResultExt;
use crate::cli::args::{Cli, Commands, ConfigCommands, UpsertArgs, ViewerArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{StructuralWarning, Viewer};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `kbtree --help`".to_string(),
        ));
    };

    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(|e| InfraError::io("current directory", e))?,
    };
    let mut settings = Settings::load(Some(dir.as_path()))?;
    if let Some(file) = &cli.file {
        settings.data_file = file.clone();
    }
    debug!("catalog: {}", settings.data_file.display());

    if let Commands::Config { command } = command {
        return cmd_config(command, &settings, &dir);
    }

    let viewer = resolve_viewer(&cli.viewer, &settings);
    let container = ServiceContainer::new(settings);

    match command {
        Commands::Tree {
            json,
            no_procedures,
        } => cmd_tree(&container, &viewer, *json, !*no_procedures),
        Commands::Branch { id, json } => cmd_branch(&container, &viewer, id, *json),
        Commands::Path { id, json } => cmd_path(&container, &viewer, id, *json),
        Commands::Check => cmd_check(&container),
        Commands::Move { id, parent, root } => {
            cmd_move(&container, id, parent.as_deref(), *root)
        }
        Commands::Upsert(args) => cmd_upsert(&container, args),
        Commands::Delete { id } => cmd_delete(&container, id),
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

/// Command-line viewer flags win over the configured viewer.
fn resolve_viewer(args: &ViewerArgs, settings: &Settings) -> Viewer {
    if args.admin {
        Viewer::Admin
    } else if !args.district.is_empty() {
        Viewer::member(args.district.iter().cloned())
    } else {
        settings.viewer()
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| InfraError::Serialize {
        message: e.to_string(),
    })?;
    output::info(&json);
    Ok(())
}

fn print_warnings(container: &ServiceContainer, warnings: &[StructuralWarning]) {
    if !container.settings.display.show_warnings {
        return;
    }
    for warning in warnings {
        output::warning(warning);
    }
}

#[instrument(skip(container))]
fn cmd_tree(
    container: &ServiceContainer,
    viewer: &Viewer,
    json: bool,
    with_procedures: bool,
) -> CliResult<()> {
    let forest = container.hierarchy().tree(viewer)?;
    if json {
        return print_json(&forest.to_nodes());
    }

    if forest.is_empty() {
        output::info(&"No categories.");
    }
    let with_procedures = with_procedures && container.settings.display.show_procedures;
    for tree in forest.to_trees(with_procedures) {
        output::info(&tree);
    }
    print_warnings(container, forest.warnings());
    Ok(())
}

#[instrument(skip(container))]
fn cmd_branch(container: &ServiceContainer, viewer: &Viewer, id: &str, json: bool) -> CliResult<()> {
    let resolved = container.hierarchy().procedures_in_branch(id, viewer)?;
    if json {
        return print_json(&resolved.value);
    }

    if resolved.value.is_empty() {
        output::info(&format!("No procedures under {id}."));
    }
    for procedure in &resolved.value {
        output::info(procedure);
    }
    print_warnings(container, &resolved.warnings);
    Ok(())
}

#[instrument(skip(container))]
fn cmd_path(container: &ServiceContainer, viewer: &Viewer, id: &str, json: bool) -> CliResult<()> {
    let resolved = container.hierarchy().category_path(id, viewer)?;
    if json {
        return print_json(&resolved.value);
    }

    if resolved.value.is_empty() {
        output::info(&format!("No category {id}."));
        return Ok(());
    }
    let breadcrumb = resolved.value.iter().map(|r| r.title.as_str()).join(" > ");
    output::info(&breadcrumb);
    print_warnings(container, &resolved.warnings);
    Ok(())
}

#[instrument(skip(container))]
fn cmd_check(container: &ServiceContainer) -> CliResult<()> {
    let warnings = container.hierarchy().check()?;
    if warnings.is_empty() {
        output::success(&"hierarchy is consistent");
        return Ok(());
    }

    output::header(&format!("{} structural problem(s):", warnings.len()));
    for warning in &warnings {
        output::failure(warning);
    }
    Err(CliError::Findings(format!(
        "{} structural problem(s) found",
        warnings.len()
    )))
}

#[instrument(skip(container))]
fn cmd_move(
    container: &ServiceContainer,
    id: &str,
    parent: Option<&str>,
    root: bool,
) -> CliResult<()> {
    if parent.is_none() && !root {
        return Err(CliError::InvalidArgs(
            "give either --parent <ID> or --root".to_string(),
        ));
    }
    container.catalog().move_category(id, parent)?;
    output::action("Moved", &format!("{} -> {}", id, parent.unwrap_or("<root>")));
    Ok(())
}

#[instrument(skip(container))]
fn cmd_upsert(container: &ServiceContainer, args: &UpsertArgs) -> CliResult<()> {
    let draft = CategoryDraft {
        id: args.id.clone(),
        title: args.title.clone(),
        parent_id: args.parent.clone(),
        importance: args.importance,
        active: !args.inactive,
        default_open: args.open,
        allowed_districts: args.allowed_districts.clone(),
        icon: args.icon.clone(),
    };
    let saved = container.catalog().create_or_update_category(draft)?;
    output::action("Saved", &saved);
    Ok(())
}

#[instrument(skip(container))]
fn cmd_delete(container: &ServiceContainer, id: &str) -> CliResult<()> {
    container.catalog().delete_category(id)?;
    output::action("Deleted", &id);
    Ok(())
}

fn cmd_config(command: &ConfigCommands, settings: &Settings, dir: &Path) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::detail(&format!("global: {}", path.display())),
                None => output::detail(&"global: <no config dir>"),
            }
            output::detail(&format!("local:  {}", local_config_path(dir).display()));
            output::detail(&format!("data:   {}", settings.data_file.display()));
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path: PathBuf = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?
            } else {
                local_config_path(dir)
            };
            if path.exists() {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_path_context("create config directory", parent)?;
            }
            std::fs::write(&path, Settings::template())
                .with_path_context("write config template", &path)?;
            output::action("Created", &path.display());
            Ok(())
        }
    }
}
