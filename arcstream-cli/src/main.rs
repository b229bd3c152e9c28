//! arcstream CLI - composable archive pipelines from the shell.
//!
//! Reads files, directories and paths reaching into archives
//! (`backup.tar.gz/etc/hosts`), and writes TAR, ZIP, GZIP, BZIP2 and AR.

mod commands;
mod utils;

use clap::{ArgAction, Parser, Subcommand};
use commands::create::OutputFormat;
use commands::{CompressionLevel, SourceArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arcstream")]
#[command(author, version, about = "Composable streaming archive reader and writer")]
#[command(long_about = "
arcstream reads files, directories and archives through one virtual path
syntax: a path may continue inside an archive, and nested archives are
opened on request.
Supported formats: TAR, ZIP, GZIP, BZIP2, AR (and .tgz / .tbz / .deb)

Examples:
  arcstream list backup.tar.gz
  arcstream list -u all site.zip/assets/
  arcstream extract backup.tar.gz/etc/ -o restored
  arcstream cat backup.tar.gz/etc/hosts
  arcstream create docs.zip README.md docs/
  arcstream convert old.tar.bz2 new.zip
")]
struct Cli {
    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the entries below a path
    #[command(alias = "l")]
    List {
        #[command(flatten)]
        source: SourceArgs,

        /// Show size, time, mode and type
        #[arg(short, long)]
        long: bool,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },

    /// Extract the entries below a path
    #[command(alias = "x")]
    Extract {
        #[command(flatten)]
        source: SourceArgs,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Hide the progress spinner
        #[arg(long)]
        no_progress: bool,
    },

    /// Write the data of the entries below a path to stdout
    Cat {
        #[command(flatten)]
        source: SourceArgs,

        /// Emit Content-Type / Content-Disposition headers first
        #[arg(long)]
        headers: bool,
    },

    /// Create an archive from files and directories
    #[command(alias = "c")]
    Create {
        /// Output archive file
        archive: PathBuf,

        /// Files and directories to add
        inputs: Vec<PathBuf>,

        /// Archive format, taken from the archive name when omitted
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Compression level
        #[arg(short = 'l', long, value_enum, default_value = "normal")]
        compression: CompressionLevel,

        /// Show progress
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Copy the entries below a path into a new archive
    Convert {
        #[command(flatten)]
        source: SourceArgs,

        /// Output archive file
        output: PathBuf,

        /// Archive format, taken from the output name when omitted
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Compression level for output
        #[arg(short = 'l', long, value_enum, default_value = "normal")]
        compression: CompressionLevel,

        /// Show progress
        #[arg(short = 'P', long)]
        progress: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::List { source, long, json } => commands::cmd_list(&source, json, long),
        Commands::Extract {
            source,
            output,
            no_progress,
        } => commands::cmd_extract(&source, &output, !no_progress),
        Commands::Cat { source, headers } => commands::cmd_cat(&source, headers),
        Commands::Create {
            archive,
            inputs,
            format,
            compression,
            progress,
        } => commands::cmd_create(&archive, &inputs, format, compression, progress),
        Commands::Convert {
            source,
            output,
            format,
            compression,
            progress,
        } => commands::cmd_convert(&source, &output, format, compression, progress),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list() {
        let cli = Cli::try_parse_from([
            "arcstream", "-v", "list", "a.tgz/docs/", "-u", "all", "-d", "2", "-I", "*.md", "--json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::List { source, json, long } => {
                assert_eq!(source.url, "a.tgz/docs/");
                assert_eq!(source.uncompress, commands::Level(None));
                assert_eq!(source.depth, Some(2));
                assert_eq!(source.include, vec!["*.md"]);
                assert!(json);
                assert!(!long);
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_parse_create() {
        let cli = Cli::try_parse_from([
            "arcstream", "create", "out.zip", "a.txt", "dir", "-l", "best", "-f", "tgz",
        ])
        .unwrap();
        match cli.command {
            Commands::Create {
                archive,
                inputs,
                format,
                compression,
                ..
            } => {
                assert_eq!(archive, PathBuf::from("out.zip"));
                assert_eq!(inputs.len(), 2);
                assert_eq!(format, Some(OutputFormat::Tgz));
                assert_eq!(compression, CompressionLevel::Best);
            }
            _ => panic!("expected create"),
        }
    }
}
