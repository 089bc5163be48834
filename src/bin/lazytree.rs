//! lazytree CLI tool
//!
//! Command-line interface for driving a lazytree-core view over a JSON forest.
//!
//! ## Commands
//!
//! - `show <file>`: load, expand the requested nodes and print the visible rows
//! - `hierarchy <file> <id>`: print the ancestor chain of a node, expanding as needed
//! - `run <file> <ops>`: replay a JSON array of commands and print each result

use clap::{Parser, Subcommand};
use lazytree_core::{
    checkbox::CheckState,
    commands::Op,
    config::{TomlConfigProvider, TreeConfig, TreeConfigProvider},
    event::TreeEvent,
    properties::{FlatNode, NodeId},
    source::MemorySource,
    view::TreeView,
    TreeError,
};
use std::path::PathBuf;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

#[derive(Parser)]
#[command(name = "lazytree")]
#[command(author, version, about = "Inspect JSON trees through the lazytree engine", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print every event the view emits
    #[arg(short, long, global = true)]
    events: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a tree and print its visible rows
    Show {
        /// JSON file holding an array of nested node descriptors
        path: PathBuf,

        /// Node to expand before printing; repeatable
        #[arg(short = 'x', long = "expand")]
        expand: Vec<String>,

        /// Expand every loaded descendant of the expanded nodes too
        #[arg(short, long)]
        recursive: bool,

        /// Node to toggle checked after expanding; repeatable
        #[arg(long = "check")]
        check: Vec<String>,
    },

    /// Print the ancestor chain of a node, expanding everything first
    Hierarchy {
        path: PathBuf,
        id: String,
    },

    /// Replay a JSON array of commands against a tree
    Run {
        path: PathBuf,
        /// JSON file holding an array of commands
        ops: PathBuf,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<TreeConfig, TreeError> {
    match path {
        Some(path) => TomlConfigProvider::new(path).get_config(),
        None => Ok(TreeConfig::default()),
    }
}

fn render_row(row: &FlatNode, check: Option<CheckState>) -> String {
    let marker = if row.is_loading {
        "…"
    } else if !row.has_children {
        " "
    } else if row.is_open {
        "▾"
    } else {
        "▸"
    };
    let check = match check {
        Some(CheckState::Checked) => "[x] ",
        Some(CheckState::Indeterminate) => "[-] ",
        Some(CheckState::Unchecked) => "[ ] ",
        None => "",
    };
    format!(
        "{}{} {}{} ({})",
        "  ".repeat(row.depth),
        marker,
        check,
        row.node.name,
        row.id
    )
}

fn print_rows(view: &TreeView<MemorySource>) {
    for row in view.flat_nodes().iter() {
        let check = if view.config().checkboxes {
            view.check_state(&row.id)
        } else {
            None
        };
        println!("{}", render_row(row, check));
    }
}

fn drain_events(rx: &mut UnboundedReceiver<TreeEvent>, print: bool) -> usize {
    let mut errors = 0;
    while let Ok(event) = rx.try_recv() {
        if let TreeEvent::Error(e) = &event {
            errors += 1;
            if !print {
                eprintln!("error: {e}");
            }
        }
        if print {
            println!("[Event] {event}");
        }
    }
    errors
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;
    let print_events = cli.events;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let (tx, mut rx) = unbounded_channel();
        match cli.command {
            Commands::Show {
                path,
                expand,
                recursive,
                check,
            } => {
                let view = TreeView::new(MemorySource::from_path(&path).await?, config, Some(tx));
                view.load().await?;
                for id in expand {
                    // Failures arrive as error events.
                    let _ = view.expand_node(&NodeId::from(id), recursive).await;
                }
                for id in check {
                    view.toggle_checked(&NodeId::from(id));
                }
                drain_events(&mut rx, print_events);
                print_rows(&view);
            }
            Commands::Hierarchy { path, id } => {
                let view = TreeView::new(MemorySource::from_path(&path).await?, config, Some(tx));
                view.load().await?;
                let roots: Vec<NodeId> = view.tree().roots().iter().map(|n| n.id.clone()).collect();
                for root in roots {
                    let _ = view.expand_node(&root, true).await;
                }
                let hierarchy = view.get_node_hierarchy(&NodeId::from(id));
                drain_events(&mut rx, print_events);
                match hierarchy {
                    Some(chain) => println!(
                        "{}",
                        chain
                            .iter()
                            .map(NodeId::as_str)
                            .collect::<Vec<_>>()
                            .join(" / ")
                    ),
                    None => std::process::exit(1),
                }
            }
            Commands::Run { path, ops } => {
                let ops: Vec<Op> = serde_json::from_str(&tokio::fs::read_to_string(ops).await?)?;
                let view = TreeView::new(MemorySource::from_path(&path).await?, config, Some(tx));
                for op in ops {
                    let label = op.to_string();
                    let result = view.dispatch(op).await;
                    println!("{label} => {result:?}");
                    drain_events(&mut rx, print_events);
                }
                print_rows(&view);
            }
        }
        Ok::<(), TreeError>(())
    })?;

    Ok(())
}
