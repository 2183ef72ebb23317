//! dlbridge CLI: classify and realise saved knowledge bases.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::Result;

use dlbridge::config::ReasonerConfig;
use dlbridge::entity::{EntityHandle, EntityKind};
use dlbridge::reasoner::Reasoner;

#[derive(Parser)]
#[command(name = "dlbridge", version, about = "Description-logic reasoner bridge")]
struct Cli {
    /// Reasoner configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Operation timeout in milliseconds (0 = none). Overrides the config file.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Log kernel stages at info level.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print bridge and kernel versions.
    Version,

    /// Classify a saved KB and print the class hierarchy.
    Classify {
        /// KB snapshot (`.json` or binary).
        kb: PathBuf,
    },

    /// Realise a saved KB and print the direct types of every individual.
    Realise {
        /// KB snapshot (`.json` or binary).
        kb: PathBuf,
    },

    /// Check whether a saved KB is consistent.
    Consistent {
        /// KB snapshot (`.json` or binary).
        kb: PathBuf,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ReasonerConfig::load(path)?,
        None => ReasonerConfig::default(),
    };
    if let Some(ms) = cli.timeout_ms {
        config.operation_timeout_ms = ms;
    }
    config.verbose |= cli.verbose;

    match cli.command {
        Commands::Version => {
            println!("dlbridge {}", env!("CARGO_PKG_VERSION"));
            println!("kernel   {}", Reasoner::<dlbridge::kernel::StructuralKernel>::version());
        }

        Commands::Classify { kb } => {
            let mut reasoner = open(config, &kb)?;
            reasoner.classify()?;
            let top = reasoner.top()?;
            let bottom = reasoner.bottom()?;
            print_tree(&reasoner, &top, &bottom, 0)?;
        }

        Commands::Realise { kb } => {
            let mut reasoner = open(config, &kb)?;
            reasoner.classify()?;
            reasoner.realise()?;
            let individuals = reasoner.entities(EntityKind::Individual)?;
            if individuals.is_empty() {
                println!("No individuals.");
            }
            for individual in &individuals {
                let types = reasoner.types(individual, true)?;
                let names: Vec<&str> = types.iter().map(|t| t.name()).collect();
                println!("{}: {}", individual.name(), names.join(", "));
            }
        }

        Commands::Consistent { kb } => {
            let mut reasoner = open(config, &kb)?;
            if reasoner.is_consistent()? {
                println!("consistent");
            } else {
                println!("inconsistent");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn open(config: ReasonerConfig, kb: &Path) -> Result<Reasoner> {
    let mut reasoner = Reasoner::with_config(config)?;
    reasoner.load(kb)?;
    Ok(reasoner)
}

/// Print `class` and its direct subclasses, indented by depth. Classes
/// equivalent to bottom are left out; an equivalence group is printed once
/// per parent.
fn print_tree(
    reasoner: &Reasoner,
    class: &EntityHandle,
    bottom: &EntityHandle,
    depth: usize,
) -> Result<()> {
    let equivalents = reasoner.equivalent_classes(class)?;
    let mut label = class.name().to_string();
    for eq in &equivalents {
        label.push_str(" = ");
        label.push_str(eq.name());
    }
    println!("{}{label}", "  ".repeat(depth));

    let mut siblings = HashSet::new();
    for sub in reasoner.sub_classes(class, true)? {
        if sub.name() == bottom.name() || reasoner.is_subsumed_by(&sub, bottom)? {
            continue;
        }
        if !siblings.insert(sub.name().to_string()) {
            continue;
        }
        for eq in reasoner.equivalent_classes(&sub)? {
            siblings.insert(eq.name().to_string());
        }
        print_tree(reasoner, &sub, bottom, depth + 1)?;
    }
    Ok(())
}
