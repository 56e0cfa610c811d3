mod cli;

use std::fs;
use std::io;
use std::path::Path;

use clap::Parser;
use cli::{Cli, Command};
use sfs::SimpleFileSystem;

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Pack {
            source,
            image,
            blocks,
        } => pack(&source, &image, blocks),
        Command::List { image } => list(&image),
    }
}

fn pack(source: &Path, image: &Path, blocks: usize) -> io::Result<()> {
    println!("source={source:?}\nimage={image:?}");
    let mut sfs = sfs_fuse::format(image, blocks).map_err(to_io)?;

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            log::warn!("skipping {:?}: not UTF-8", entry.file_name());
            continue;
        };

        let data = fs::read(entry.path())?;
        println!("file: {name:?}, {} bytes", data.len());
        if let Err(err) = copy_in(&mut sfs, &name, &data) {
            log::warn!("skipping {name:?}: {err}");
        }
    }

    println!("{} blocks free", sfs.free_blocks());
    Ok(())
}

fn copy_in(sfs: &mut SimpleFileSystem, name: &str, data: &[u8]) -> sfs::Result<()> {
    let fd = sfs.open(name)?;
    let written = sfs.write(fd, data)?;
    if written < data.len() {
        log::warn!("{name:?} truncated to {written} bytes");
    }
    sfs.close(fd)
}

fn list(image: &Path) -> io::Result<()> {
    let sfs = sfs_fuse::mount(image).map_err(to_io)?;

    for name in sfs.names() {
        let size = sfs.file_size(name).map_err(to_io)?;
        println!("{size:>8} {name}");
    }

    Ok(())
}

fn to_io(err: sfs::Error) -> io::Error {
    io::Error::other(err)
}
