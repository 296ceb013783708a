
pub mod builder;
pub mod error;

use std::fs::File;
use std::io::{Read, Write};
use std::io::{Seek, SeekFrom};
use std::sync::Mutex;

use lfs::BlockDevice;
use lfs::BSIZE;

pub struct BlockFile(pub Mutex<File>);

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> bool {
        let mut block = [0; BSIZE];
        let mut file = self.0.lock().unwrap();
        if file
            .seek(SeekFrom::Start((block_id * BSIZE) as u64))
            .is_err()
            || file.read_exact(&mut block).is_err()
        {
            return false;
        }
        buf.copy_from_slice(&block);
        true
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> bool {
        let mut file = self.0.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * BSIZE) as u64))
            .is_ok()
            && file.write_all(buf).is_ok()
    }
}
