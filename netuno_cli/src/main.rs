//! Command-line interface for the Netuno compiler

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod build;

/// Netuno compiler CLI
#[derive(Parser)]
#[command(name = "netuno")]
#[command(about = "Netuno compiler CLI", long_about = None)]
struct Cli {
    /// Sets the level of verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile Netuno source files
    Build {
        /// Source files to compile
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print the lowered IR of each module
        #[arg(long)]
        print_ir: bool,

        /// Dump the parsed AST of each module as JSON
        #[arg(long)]
        dump_ast: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();

    match cli.verbose {
        0 => log::set_max_level(log::LevelFilter::Info),
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Build {
            files,
            print_ir,
            dump_ast,
        } => build::build_files(&files, print_ir, dump_ast),
    }
}
