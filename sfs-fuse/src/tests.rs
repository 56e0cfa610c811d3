use std::fs;
use std::path::PathBuf;

use block_dev::BlockDevice;
use sfs::{BLOCK_SIZE, Error};

use crate::{BlockFile, format, mount};

fn image(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sfs-fuse-{}-{name}.img", std::process::id()))
}

#[test]
fn block_file() {
    let path = image("block-file");
    let dev = BlockFile::create(&path, BLOCK_SIZE, 8).unwrap();
    assert_eq!(8 * BLOCK_SIZE as u64, fs::metadata(&path).unwrap().len());

    dev.write_block(3, &[7; BLOCK_SIZE]).unwrap();
    assert!(dev.write_block(8, &[0; BLOCK_SIZE]).is_err());
    assert!(dev.write_block(0, &[0; 10]).is_err());
    drop(dev);

    let dev = BlockFile::open(&path, BLOCK_SIZE, 8).unwrap();
    let mut buf = [0; BLOCK_SIZE];
    dev.read_block(3, &mut buf).unwrap();
    assert_eq!([7; BLOCK_SIZE], buf);
    dev.read_block(2, &mut buf).unwrap();
    assert_eq!([0; BLOCK_SIZE], buf);

    assert!(BlockFile::open(&path, BLOCK_SIZE, 16).is_err());
    fs::remove_file(path).unwrap();
}

#[test]
fn image_survives_remount() {
    let path = image("remount");
    let data: Vec<u8> = (0..20_000).map(|i| (i % 251) as u8).collect();

    let mut sfs = format(&path, 256).unwrap();
    let fd = sfs.open("data.bin").unwrap();
    assert_eq!(data.len(), sfs.write(fd, &data).unwrap());
    sfs.open("empty").unwrap();
    sfs.remove("empty").unwrap();
    drop(sfs);

    let mut sfs = mount(&path).unwrap();
    assert_eq!(256, sfs.geometry().total_blocks());
    assert_eq!(vec!["data.bin"], sfs.names().collect::<Vec<_>>());
    let fd = sfs.open("data.bin").unwrap();
    sfs.seek(fd, 0).unwrap();
    assert_eq!(data, sfs.read_to_vec(fd, data.len()).unwrap());

    fs::remove_file(path).unwrap();
}

#[test]
fn missing_image() {
    assert_eq!(
        Some(Error::Device(block_dev::DeviceError::Io)),
        mount(image("missing")).err()
    );
}
