use sfs::{
    BLOCK_SIZE, DIR_ENTRY_SIZE, DIRECT_COUNT, Geometry, INDIRECT_COUNT, INODE_SIZE,
    INODE_TABLE_BLOCKS, MAX_FILE_SIZE, MAX_FILES,
};

#[test]
fn layout() {
    assert_eq!(56, INODE_SIZE);
    assert_eq!(24, DIR_ENTRY_SIZE);
    assert_eq!(256, INDIRECT_COUNT);
    assert_eq!((DIRECT_COUNT + INDIRECT_COUNT) * BLOCK_SIZE, MAX_FILE_SIZE);
    assert!(MAX_FILES * INODE_SIZE <= INODE_TABLE_BLOCKS * BLOCK_SIZE);
    assert_eq!(3, Geometry::ROOT_DIR_BLOCKS);
}
