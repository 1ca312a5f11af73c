//! mpq-cli - command-line tool for inspecting MPQ archives

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;

mod commands;
mod config;
mod output;

// Global context for commands to access
pub static GLOBAL_OPTS: OnceLock<GlobalOptions> = OnceLock::new();

#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub output: OutputFormat,
    pub verbose: u8,
    pub quiet: bool,
    pub no_color: bool,
    pub wrap_probes: bool,
}

/// Options in effect for this run
pub fn global_opts() -> &'static GlobalOptions {
    GLOBAL_OPTS.get_or_init(GlobalOptions::default)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "mpq-cli",
    about = "Command-line tool for inspecting MPQ archives",
    long_about = None,
    after_help = "EXAMPLES:
    # List files in an archive
    mpq-cli list game.mpq

    # Show header and table layout
    mpq-cli info game.mpq

    # Resolve a single name
    mpq-cli find game.mpq war3map.j

    # Extract everything the listfile names
    mpq-cli extract game.mpq -t extracted/

    # Hash a name the way the tables do
    mpq-cli hash \"Units\\Human\\Footman.mdx\"

    # Generate shell completions
    mpq-cli completion bash > ~/.bash_completion.d/mpq-cli.bash"
)]
#[command(version)]
struct Cli {
    /// Output format
    #[arg(global = true, short = 'o', long, value_enum)]
    output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(global = true, short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(global = true, short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,

    /// Disable colored output
    #[arg(global = true, long)]
    no_color: bool,

    /// Configuration file (defaults to ~/.mpq-cli/config.toml)
    #[arg(global = true, long)]
    config: Option<PathBuf>,

    /// Let table probes wrap around to the start of the table
    #[arg(global = true, long)]
    wrap_probes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List files in an archive
    List {
        /// Path to the MPQ archive
        archive: String,
        /// Only show names matching this glob pattern
        #[arg(short, long)]
        filter: Option<String>,
        /// Show size, compressed size and flags for each file
        #[arg(short, long)]
        long: bool,
    },
    /// Show archive header and table information
    Info {
        /// Path to the MPQ archive
        archive: String,
    },
    /// Resolve a file name and show its record
    Find {
        /// Path to the MPQ archive
        archive: String,
        /// Filename to look up
        filename: String,
    },
    /// Extract files from an archive
    Extract {
        /// Path to the MPQ archive
        archive: String,
        /// Target directory
        #[arg(short, long)]
        target: Option<PathBuf>,
        /// Specific file to extract (if not specified, extracts all listed files)
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Generate hash values for a filename
    Hash {
        /// Filename to hash
        filename: String,
        /// Hash slot to print on its own
        #[arg(short = 't', long, value_enum)]
        hash_type: Option<HashType>,
        /// Also compute the table slot for a hash table of this size
        #[arg(long)]
        table_size: Option<u32>,
    },
    /// Display table contents
    Tables {
        /// Path to the MPQ archive
        archive: String,
        /// Table to show (defaults to every table present)
        #[arg(short = 't', long, value_enum)]
        table_type: Option<TableType>,
        /// Limit number of entries shown
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Skip empty hash table slots and HET slots
        #[arg(long)]
        occupied_only: bool,
    },
    /// Generate shell completion scripts
    #[command(about = "Generate completion scripts for your shell")]
    Completion {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HashType {
    TableOffset,
    NameA,
    NameB,
    FileKey,
    Jenkins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TableType {
    Hash,
    Block,
    HiBlock,
    Het,
    Bet,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;

    let output = match cli.output {
        Some(format) => format,
        None => config.output_format()?,
    };

    // Set up colored output based on flags
    if cli.no_color || output != OutputFormat::Text {
        colored::control::set_override(false);
    }

    // Configure logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let global_opts = GlobalOptions {
        output,
        verbose: cli.verbose,
        quiet: cli.quiet,
        no_color: cli.no_color,
        wrap_probes: cli.wrap_probes || config.wrap_probes.unwrap_or(false),
    };
    if GLOBAL_OPTS.set(global_opts).is_err() {
        anyhow::bail!("global options initialized twice");
    }

    match cli.command {
        Commands::List {
            archive,
            filter,
            long,
        } => commands::list::list(&archive, filter.as_deref(), long)?,
        Commands::Info { archive } => commands::info::info(&archive)?,
        Commands::Find { archive, filename } => commands::find::find(&archive, &filename)?,
        Commands::Extract {
            archive,
            target,
            file,
        } => {
            let target = target
                .or_else(|| config.extract_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            commands::extract::extract(&archive, &target, file.as_deref())?;
        }
        Commands::Hash {
            filename,
            hash_type,
            table_size,
        } => commands::hash::generate(&filename, hash_type, table_size)?,
        Commands::Tables {
            archive,
            table_type,
            limit,
            occupied_only,
        } => commands::tables::show(&archive, table_type, limit, occupied_only)?,
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
    }

    Ok(())
}
