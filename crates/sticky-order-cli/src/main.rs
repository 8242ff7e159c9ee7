use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use sticky_order_core::{sticky_tie_breakers, SortOptions};
use sticky_order_layout::{ColumnLayout, MoveDirection};
use tracing_subscriber::EnvFilter;

const CLI_CONTRACT_VERSION: &str = "cli.v1";
const DEFAULT_LOG_FILTER: &str = "sticky_order_core=info,sticky_order_layout=info,sticky=info";

#[derive(Debug, Parser)]
#[command(name = "sticky")]
#[command(about = "Sticky column ordering CLI")]
struct Cli {
    #[arg(long, default_value = "./layout.json")]
    layout: PathBuf,

    /// Persist the resulting layout back to `--layout`.
    #[arg(long, default_value_t = false)]
    write: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Show,
    Validate(SortArgs),
    Sort(SortArgs),
    Move(MoveArgs),
    SetVisible(SetVisibleArgs),
    Chain,
}

#[derive(Debug, Args)]
struct SortArgs {
    /// JSON or YAML file with sort options; explicit flags win over it.
    #[arg(long)]
    options: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    no_stickiness: bool,
    #[arg(long, default_value_t = false)]
    recursive_targets: bool,
    #[arg(long, default_value_t = false)]
    no_adhesion: bool,
}

#[derive(Debug, Args)]
struct MoveArgs {
    #[arg(long)]
    name: String,
    #[arg(long, value_enum)]
    direction: DirectionArg,
    #[arg(long, default_value_t = 1)]
    count: usize,
    #[arg(long, default_value_t = false)]
    respect_absolute: bool,
    #[arg(long, default_value_t = false)]
    respect_adhesion: bool,
}

#[derive(Debug, Args)]
struct SetVisibleArgs {
    #[arg(long)]
    name: String,
    #[arg(long, action = ArgAction::Set)]
    visible: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DirectionArg {
    Up,
    Down,
}

impl DirectionArg {
    fn into_direction(self) -> MoveDirection {
        match self {
            Self::Up => MoveDirection::Up,
            Self::Down => MoveDirection::Down,
        }
    }
}

fn print_report(report: Value) -> Result<()> {
    let report = insert_field(
        report,
        "contract_version",
        Value::String(CLI_CONTRACT_VERSION.to_string()),
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut layout = ColumnLayout::load(&cli.layout)?;
    tracing::debug!(layout = %cli.layout.display(), columns = layout.columns().len(), "loaded layout");

    let report = match cli.command {
        Command::Show => layout_report("show", &layout)?,
        Command::Validate(args) => return run_validate(&args, &layout),
        Command::Sort(args) => run_sort(&args, &mut layout)?,
        Command::Move(args) => run_move(&args, &mut layout)?,
        Command::SetVisible(args) => {
            layout.set_visible(&args.name, args.visible)?;
            layout_report("set_visible", &layout)?
        }
        Command::Chain => {
            layout.chain_to_predecessors()?;
            layout_report("chain", &layout)?
        }
    };

    if cli.write {
        layout.save(&cli.layout)?;
        tracing::info!(layout = %cli.layout.display(), "wrote layout");
    }
    print_report(insert_field(report, "written", Value::Bool(cli.write)))
}

fn run_validate(args: &SortArgs, layout: &ColumnLayout) -> Result<()> {
    let options = resolve_sort_options(args)?;
    let outcome = layout.validate(&options);
    print_report(serde_json::json!({
        "operation": "validate",
        "valid": outcome.is_ok(),
        "error": outcome.err().map(|err| format!("{err:#}")),
        "options": options,
    }))
}

fn run_sort(args: &SortArgs, layout: &mut ColumnLayout) -> Result<Value> {
    let options = resolve_sort_options(args)?;
    layout.sort(&options)?;
    let report = layout_report("sort", layout)?;
    let report = insert_field(report, "options", serde_json::to_value(options)?);
    Ok(insert_field(report, "tie_breakers", serde_json::to_value(sticky_tie_breakers())?))
}

fn run_move(args: &MoveArgs, layout: &mut ColumnLayout) -> Result<Value> {
    layout.move_item(
        &args.name,
        args.direction.into_direction(),
        args.count,
        args.respect_absolute,
        args.respect_adhesion,
    )?;
    layout_report("move", layout)
}

fn layout_report(operation: &str, layout: &ColumnLayout) -> Result<Value> {
    Ok(serde_json::json!({
        "operation": operation,
        "layout_digest": layout.layout_digest()?,
        "order": layout.order(),
        "visible_order": layout.visible_order(),
        "columns": layout.columns(),
    }))
}

fn insert_field(value: Value, key: &str, field: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(key.to_string(), field);
            Value::Object(object)
        }
        other => other,
    }
}

fn resolve_sort_options(args: &SortArgs) -> Result<SortOptions> {
    let mut options = match args.options.as_deref() {
        Some(path) => load_sort_options(path)?,
        None => SortOptions::default(),
    };
    if args.no_stickiness {
        options.stickiness = false;
    }
    if args.recursive_targets {
        options.recursive_targets = true;
    }
    if args.no_adhesion {
        options.adhesion = false;
    }
    Ok(options)
}

fn load_sort_options(path: &Path) -> Result<SortOptions> {
    let body = fs::read_to_string(path)
        .with_context(|| format!("failed to read options file {}", path.display()))?;
    let is_yaml = matches!(path.extension().and_then(|ext| ext.to_str()), Some("yaml" | "yml"));
    if is_yaml {
        serde_yaml::from_str(&body)
            .with_context(|| format!("failed to parse options file {}", path.display()))
    } else {
        serde_json::from_str(&body)
            .with_context(|| format!("failed to parse options file {}", path.display()))
    }
}
