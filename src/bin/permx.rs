// permx/src/bin/permx.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use permx::{
    configs::initializer::{setup_permx_logging, PermxConfig},
    mapping::MappingTable,
    menu::{MenuAction, MenuNode},
    router::protected_routes,
    store::SessionSource,
    utils::{
        rbac::{PermissionCheck, PermissionService},
        structs::CurrentUser,
    },
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "permx")]
#[command(about = "Evaluate dashboard permissions and menus offline")]
#[command(version)]
struct Cli {
    /// JSON mapping file replacing the built-in menu key table
    #[arg(long, env = "PERMX_MAPPING_FILE", global = true)]
    mapping: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check one menu key against a user payload
    Check {
        /// User JSON (as returned by the session provider)
        #[arg(short, long)]
        user: PathBuf,
        /// Menu key, e.g. add-Bussiness
        #[arg(short, long)]
        key: String,
        /// menu, list, add, edit, delete or view
        #[arg(short, long, default_value = "menu")]
        action: MenuAction,
    },
    /// Print the menu as the user would see it
    Menu {
        #[arg(short, long)]
        user: PathBuf,
        /// Output format (tree, json)
        #[arg(short, long, default_value = "tree")]
        format: String,
    },
    /// List the menu key mapping table
    Mapping,
    /// List protected routes
    Routes,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let config = PermxConfig::from_env()?;
    setup_permx_logging(&config);

    let cli = Cli::parse();
    let mapping = match &cli.mapping {
        Some(path) => MappingTable::from_json_file(path)
            .with_context(|| format!("loading mapping from {}", path.display()))?,
        None => MappingTable::builtin().clone(),
    };

    match cli.command {
        Commands::Check { user, key, action } => {
            let service = load_service(mapping, &user).await?;
            if service.has_permission(&key, action) {
                println!("granted: {} ({})", key, action);
                Ok(ExitCode::SUCCESS)
            } else {
                println!("denied: {} ({})", key, action);
                Ok(ExitCode::from(2))
            }
        }
        Commands::Menu { user, format } => {
            let service = load_service(mapping, &user).await?;
            let menu = service.menu();
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&menu)?),
                "tree" => print_tree(&menu, 0),
                other => anyhow::bail!("unknown format '{}' (expected tree or json)", other),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Mapping => {
            println!("{:<20} {}", "MENU KEY", "PERMISSION");
            println!("{}", "-".repeat(44));
            for (key, permission) in mapping.iter() {
                println!("{:<20} {}", key, permission);
            }
            println!("\nTotal: {} entries", mapping.len());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Routes => {
            println!("{:<24} {:<12} {}", "PATH", "KEY", "ACTION");
            println!("{}", "-".repeat(44));
            for route in protected_routes() {
                println!(
                    "{:<24} {:<12} {}",
                    route.path, route.permission_key, route.action
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn load_service(mapping: MappingTable, user_file: &Path) -> Result<PermissionService> {
    let raw = std::fs::read_to_string(user_file)
        .with_context(|| format!("reading {}", user_file.display()))?;
    let payload: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", user_file.display()))?;

    let service = PermissionService::new(mapping);
    service
        .refresh(Some(CurrentUser::new(payload)), &SessionSource)
        .await;

    if let Some(error) = service.state().error {
        anyhow::bail!("could not derive permissions: {}", error);
    }
    Ok(service)
}

fn print_tree(nodes: &[MenuNode], depth: usize) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        if let Some(heading) = &node.heading {
            println!("{}== {} ==", indent, heading);
            continue;
        }
        let title = node.title.as_deref().unwrap_or("<untitled>");
        let target = match node.nav_target() {
            Some(path) => path.to_string(),
            None if node.disabled => "(disabled)".to_string(),
            None => String::new(),
        };
        println!("{}- {} {}", indent, title, target);
        if let Some(children) = node.children.as_deref() {
            print_tree(children, depth + 1);
        }
    }
}
