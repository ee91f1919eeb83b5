use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use pgen_filter::{FilterSpec, TierSelector};

mod commands;

#[derive(Parser)]
#[command(name = "pgen")]
#[command(about = "Bulk processing-pattern generator", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> local overrides)
    #[arg(long = "config", global = true, env = "PGEN_CONFIG", value_delimiter = ',')]
    config_paths: Vec<String>,

    /// Recipe catalog JSON (overrides catalog.path)
    #[arg(long, global = true)]
    catalog: Option<String>,

    /// Requester: a UUID, or any name (mapped to a stable UUID)
    #[arg(long, global = true, default_value = "local")]
    requester: String,

    /// Refuse config keys nothing reads instead of warning
    #[arg(long, global = true, default_value_t = false)]
    strict_config: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash,

    /// List recipe categories in the catalog
    Categories,

    /// List catalog machines and the category each resolves to
    Machines,

    /// Count what a generation would produce, without generating
    Count {
        /// Category keyword (exact id, or case-insensitive substring)
        #[arg(required_unless_present = "machine")]
        keyword: Option<String>,

        /// Take the category from a catalog machine instead of a keyword
        #[arg(long, conflicts_with = "keyword")]
        machine: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Generate patterns; resolves conflicts interactively on stdin
    Generate {
        /// Category keyword (exact id, or case-insensitive substring)
        #[arg(required_unless_present = "machine")]
        keyword: Option<String>,

        /// Take the category from a catalog machine instead of a keyword
        #[arg(long, conflicts_with = "keyword")]
        machine: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Blank patterns in the local inventory (fallback when the pool cannot pay)
        #[arg(long, default_value_t = 0)]
        blanks: u64,

        /// Blank patterns in the network pool (tried before the inventory)
        #[arg(long)]
        pool: Option<u64>,
    },

    /// Inspect or consume generated patterns
    Storage {
        #[command(subcommand)]
        cmd: StorageCmd,
    },
}

#[derive(Subcommand)]
enum StorageCmd {
    /// Count, source and output preview of the stored batch
    Summary,

    /// One page of output previews (1-based)
    Page {
        #[arg(default_value_t = 1)]
        page: usize,
    },

    /// Inputs and outputs of one stored pattern (0-based index)
    Detail { index: usize },

    /// Remove and print the oldest N patterns
    Extract {
        #[arg(default_value_t = 1)]
        count: usize,
    },

    /// Delete one stored pattern (0-based index)
    Delete { index: usize },

    /// Drop the whole stored batch
    Clear,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Output item tag/name pattern (regex, case-insensitive; "*" = any)
    #[arg(long, default_value = "")]
    output_tag: String,

    /// Input item tag/name pattern
    #[arg(long, default_value = "")]
    input_tag: String,

    /// Non-consumed item: "mod:id[:variant]" or a name pattern
    #[arg(long, default_value = "")]
    non_consumed: String,

    /// Exclude recipes with a matching input
    #[arg(long, default_value = "")]
    blacklist_input: String,

    /// Exclude recipes with a matching output
    #[arg(long, default_value = "")]
    blacklist_output: String,

    /// Voltage tier (0 = ULV)
    #[arg(long)]
    tier: Option<u8>,

    /// Exact category id
    #[arg(long)]
    category: Option<String>,
}

impl FilterArgs {
    fn into_spec(self) -> FilterSpec {
        FilterSpec {
            output_tag: self.output_tag,
            input_tag: self.input_tag,
            non_consumed: self.non_consumed,
            blacklist_input: self.blacklist_input,
            blacklist_output: self.blacklist_output,
            tier: self.tier.map_or(TierSelector::Any, TierSelector::Exact),
            category: self.category,
        }
    }
}

fn main() -> Result<()> {
    // dev-time convenience; a missing file is fine
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    let ctx = commands::Context::load(
        &cli.config_paths,
        cli.catalog.as_deref(),
        &cli.requester,
        cli.strict_config,
    )?;

    match cli.cmd {
        Commands::ConfigHash => commands::print_config_hash(&ctx),
        Commands::Categories => commands::list_categories(&ctx),
        Commands::Machines => commands::list_machines(&ctx),
        Commands::Count {
            keyword,
            machine,
            filters,
        } => commands::count(
            &ctx,
            &commands::Target::from_args(keyword, machine),
            &filters.into_spec(),
        ),
        Commands::Generate {
            keyword,
            machine,
            filters,
            blanks,
            pool,
        } => commands::generate::run(
            &ctx,
            &commands::Target::from_args(keyword, machine),
            filters.into_spec(),
            commands::generate::Supplies { blanks, pool },
        ),
        Commands::Storage { cmd } => match cmd {
            StorageCmd::Summary => commands::storage::summary(&ctx),
            StorageCmd::Page { page } => commands::storage::page(&ctx, page),
            StorageCmd::Detail { index } => commands::storage::detail(&ctx, index),
            StorageCmd::Extract { count } => commands::storage::extract(&ctx, count),
            StorageCmd::Delete { index } => commands::storage::delete(&ctx, index),
            StorageCmd::Clear => commands::storage::clear(&ctx),
        },
    }
}

fn init_tracing() {
    // PGEN_LOG wins over RUST_LOG; logs go to stderr so stdout stays parseable.
    let filter = tracing_subscriber::EnvFilter::try_from_env("PGEN_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
