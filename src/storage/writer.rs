use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::Result;

/// Writes one gzip-framed data block into a segment file and syncs it on
/// close. Segment files are write-once; the pair is only catalogued after
/// both halves close cleanly.
pub struct SegmentWriter {
    file: File,
}

impl SegmentWriter {
    /// Create the segment file; refuses to overwrite an existing one
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        Ok(Self { file })
    }

    /// Compress `data` at the maximum gzip level into the file
    pub fn write_data_block(&mut self, data: &[u8]) -> Result<()> {
        let mut encoder = GzEncoder::new(BufWriter::new(&mut self.file), Compression::new(9));
        encoder.write_all(data)?;
        encoder.finish()?.flush()?;
        Ok(())
    }

    /// Fsync and drop the handle
    pub fn close(self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
