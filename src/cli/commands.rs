//! Command dispatch

use std::io;
use std::path::Path;

use clap::CommandFactory;
use tracing::{debug, instrument};

use crate::application::services::LibrarySelection;
use crate::application::{ApplicationError, CatalogWidget};
use crate::cli::args::{Cli, Commands, ConfigCommands, SelectionArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{DisclosureState, NodeId, NodeKind, Taxonomy};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::surface::TreeSurface;
use crate::infrastructure::traits::SelectionItem;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Ok(());
    };

    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "itpcat", &mut io::stdout());
        return Ok(());
    }

    let settings = Settings::load(cli.data_dir.as_deref())?;
    debug!("settings: {:?}", settings);
    let container = ServiceContainer::new(settings);

    match command {
        Commands::Tree {
            selection,
            expand,
            all,
            details,
        } => cmd_tree(&container, selection, expand, *all, *details),
        Commands::Browse { selection } => cmd_browse(&container, selection),
        Commands::Counts {
            selection,
            json,
            non_empty,
        } => cmd_counts(&container, selection, *json, *non_empty),
        Commands::Libraries => cmd_libraries(&container),
        Commands::Config { command } => cmd_config(&container, command),
        Commands::Completion { .. } => Ok(()),
    }
}

impl From<&SelectionArgs> for LibrarySelection {
    fn from(args: &SelectionArgs) -> Self {
        LibrarySelection {
            itp: args.itp.clone(),
            section: args.section.clone(),
        }
    }
}

fn title(selection: &LibrarySelection, taxonomy: &Taxonomy) -> String {
    let scope = match (&selection.itp, &selection.section) {
        (Some(itp), Some(section)) => format!("{itp} / {section}"),
        (Some(itp), None) => itp.clone(),
        (None, Some(section)) => section.clone(),
        (None, None) => "All libraries".to_string(),
    };
    format!("{} ({} packages)", scope, taxonomy.total_packages())
}

/// Load the catalog and aggregate the selected libraries.
fn load_aggregated(
    container: &ServiceContainer,
    selection: &LibrarySelection,
) -> CliResult<Taxonomy> {
    let catalog = container.catalog_service().load()?;
    let taxonomy = catalog.aggregate(selection, container.settings.dedupe_packages)?;
    if container.settings.hide_empty {
        return Ok(taxonomy.retain_non_empty());
    }
    Ok(taxonomy)
}

#[instrument(skip(container))]
fn cmd_tree(
    container: &ServiceContainer,
    selection: &SelectionArgs,
    expand: &[String],
    all: bool,
    details: bool,
) -> CliResult<()> {
    let selection = LibrarySelection::from(selection);
    let taxonomy = load_aggregated(container, &selection)?;
    let surface = TreeSurface::new(title(&selection, &taxonomy));
    let mut widget = CatalogWidget::mount(taxonomy, surface);

    for code in expand {
        let target = widget.reveal(code)?;
        // Revealing a node shows it; expanding it shows what the user asked for
        if widget.state(target)? == DisclosureState::Collapsed {
            widget.activate(target)?;
        }
    }
    if all {
        widget.expand_all(details)?;
    }

    output::info(&widget.surface().render());
    Ok(())
}

#[instrument(skip(container))]
fn cmd_browse(container: &ServiceContainer, selection: &SelectionArgs) -> CliResult<()> {
    let selection = LibrarySelection::from(selection);
    let taxonomy = load_aggregated(container, &selection)?;
    let surface = TreeSurface::new(title(&selection, &taxonomy));
    let mut widget = CatalogWidget::mount(taxonomy, surface);

    loop {
        output::info(&widget.surface().render());

        let items = selection_items(&widget);
        let selected = container
            .selector
            .select_one(&items, "toggle> ")
            .map_err(|message| InfraError::Selector { message })?;

        let Some(item) = selected else {
            break;
        };
        let id: NodeId = item.value.parse().map_err(CliError::InvalidArgs)?;
        widget.activate(id)?;
    }
    Ok(())
}

/// One selectable line per rendered node, indented by depth.
pub fn selection_items(widget: &CatalogWidget<TreeSurface>) -> Vec<SelectionItem> {
    widget
        .visible()
        .into_iter()
        .enumerate()
        .map(|(pos, (id, depth, node))| {
            let marker = match (node.state, node.data.kind) {
                (DisclosureState::Expanded, _) => "-",
                (DisclosureState::Collapsed, NodeKind::Package { .. }) => "*",
                (DisclosureState::Collapsed, NodeKind::Class(_)) => "+",
            };
            SelectionItem {
                display: format!(
                    "{:>4} {}{} {}",
                    pos,
                    "  ".repeat(depth),
                    marker,
                    node.data.label
                ),
                value: id.to_string(),
            }
        })
        .collect()
}

#[instrument(skip(container))]
fn cmd_counts(
    container: &ServiceContainer,
    selection: &SelectionArgs,
    json: bool,
    non_empty: bool,
) -> CliResult<()> {
    let selection = LibrarySelection::from(selection);
    let mut taxonomy = load_aggregated(container, &selection)?;
    if non_empty {
        taxonomy = taxonomy.retain_non_empty();
    }

    if json {
        let rendered = serde_json::to_string_pretty(&taxonomy).map_err(|e| {
            ApplicationError::OperationFailed {
                context: "serialize taxonomy".to_string(),
                source: Box::new(e),
            }
        })?;
        output::info(&rendered);
        return Ok(());
    }

    output::header(&title(&selection, &taxonomy));
    for top in taxonomy.iter() {
        let line = format!("{:<8} {:>8}  {}", top.code, top.package_count, top.short_name);
        if top.package_count == 0 {
            output::muted(&line);
        } else {
            output::info(&line);
        }
    }
    output::action("total", &taxonomy.total_packages());
    Ok(())
}

fn cmd_libraries(container: &ServiceContainer) -> CliResult<()> {
    let libraries = container.catalog_service().load_library_index()?;
    for library in libraries {
        output::info(&format!(
            "{} / {}: {} {}",
            library.itp, library.section, library.file, library.url
        ));
    }
    Ok(())
}

fn cmd_config(container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?
            } else {
                local_config_path(&container.settings.data_dir)
            };
            write_template(container, &path)
        }
        ConfigCommands::Path => {
            if let Some(global) = global_config_path() {
                output::action("global", &describe_path(container, &global));
            }
            let local = local_config_path(&container.settings.data_dir);
            output::action("local", &describe_path(container, &local));
            Ok(())
        }
    }
}

fn describe_path(container: &ServiceContainer, path: &Path) -> String {
    if container.fs.exists(path) {
        format!("{}", path.display())
    } else {
        format!("{} (not found)", path.display())
    }
}

fn write_template(container: &ServiceContainer, path: &Path) -> CliResult<()> {
    if container.fs.exists(path) {
        return Err(CliError::Usage(format!(
            "config already exists: {}",
            path.display()
        )));
    }
    container
        .fs
        .ensure_parent(path)
        .map_err(|e| InfraError::io(format!("create directory for {}", path.display()), e))?;
    container
        .fs
        .write(path, &Settings::template())
        .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
    output::success(&format!("created {}", path.display()));
    Ok(())
}
