use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sfs::DEFAULT_TOTAL_BLOCKS;

#[derive(Parser)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Formats a fresh image and copies every regular file of a directory into it
    Pack {
        /// Host directory to copy from
        #[arg(long, short)]
        source: PathBuf,

        /// Image file, created or truncated
        #[arg(long, short)]
        image: PathBuf,

        /// Volume size in blocks
        #[arg(long, short, default_value_t = DEFAULT_TOTAL_BLOCKS)]
        blocks: usize,
    },

    /// Lists the files of an image with their sizes
    List {
        #[arg(long, short)]
        image: PathBuf,
    },
}
