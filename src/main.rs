use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rtlmap_frontend::{frontend_call, write_design, Dialect};
use rtlmap_netlist::Design;
use rtlmap_passes::PassRegistry;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// RTLMAP - technology mapping and hierarchy flattening for RTL netlists
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Map cells to implementations from a map library
    Techmap {
        /// Input netlist (`.il` native dialect, anything else Verilog)
        input: PathBuf,

        /// Map library file; may repeat. Without it a built-in library
        /// mapping unit-width RTL cells to gate primitives is used
        #[arg(short, long)]
        map: Vec<PathBuf>,

        /// Output file (native dialect); stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Module selection patterns (`*` and `?` wildcards)
        selection: Vec<String>,
    },

    /// Flatten the design by inlining module instances
    Flatten {
        /// Input netlist
        input: PathBuf,

        /// Output file (native dialect); stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Module selection patterns
        selection: Vec<String>,
    },

    /// Run a semicolon-separated pass pipeline
    Run {
        /// Input netlist
        input: PathBuf,

        /// Commands to run, e.g. "proc; techmap; clean"
        #[arg(short, long)]
        pipeline: String,

        /// Output file (native dialect); stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = PassRegistry::builtin();
    match cli.command {
        Commands::Techmap { input, map, output, selection } => {
            let mut design = load_design(&input)?;
            let mut args: Vec<String> = Vec::new();
            for file in &map {
                args.push("-map".to_string());
                args.push(file.display().to_string());
            }
            args.extend(selection);
            run_pass(&registry, "techmap", &args, &mut design)?;
            emit(&design, output.as_deref())
        }
        Commands::Flatten { input, output, selection } => {
            let mut design = load_design(&input)?;
            run_pass(&registry, "flatten", &selection, &mut design)?;
            emit(&design, output.as_deref())
        }
        Commands::Run { input, pipeline, output } => {
            let mut design = load_design(&input)?;
            registry.call(&mut design, &pipeline)?;
            emit(&design, output.as_deref())
        }
    }
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn load_design(path: &Path) -> Result<Design> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading `{}`", path.display()))?;
    let filename = path.display().to_string();
    let mut design = Design::new();
    frontend_call(&mut design, &text, &filename, Dialect::from_filename(&filename))?;
    Ok(design)
}

fn run_pass(
    registry: &PassRegistry,
    name: &str,
    args: &[String],
    design: &mut Design,
) -> Result<()> {
    let pass = registry
        .get(name)
        .with_context(|| format!("pass `{}` is not registered", name))?;
    pass.execute(args, design, registry)?;
    Ok(())
}

fn emit(design: &Design, output: Option<&Path>) -> Result<()> {
    let text = write_design(design);
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing `{}`", path.display()))?;
            info!("Wrote `{}'.", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}
