use std::fs::File;
use std::io::{BufReader, Read};

use flate2::read::GzDecoder;

use crate::analyzer::Analyzer;
use crate::error::{Result, SepiaError};
use crate::index::{Hnsw, InvertedIndex};

/// Reads one gzip-framed data block from a segment file. Anything wrong with
/// the frame or the decoded payload is a codec error, which is fatal when it
/// happens during startup segment loading.
pub struct SegmentReader {
    file: File,
}

impl SegmentReader {
    pub fn new(file: File) -> Self {
        Self { file }
    }

    pub fn read_data_block(self) -> Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(BufReader::new(self.file));
        let mut data = Vec::new();
        decoder
            .read_to_end(&mut data)
            .map_err(|e| SepiaError::Codec(format!("gzip frame: {e}")))?;
        Ok(data)
    }

    /// Decode the lexical half of a segment
    pub fn load_inverted_index(self, analyzer: Analyzer, seed: u64) -> Result<InvertedIndex> {
        let data = self.read_data_block()?;
        InvertedIndex::decode(&data, analyzer, seed)
    }

    /// Decode the vector half of a segment
    pub fn load_vector_index(self) -> Result<Hnsw> {
        let data = self.read_data_block()?;
        Hnsw::decode(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_corrupt_frame_is_a_codec_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("000001.segment");
        std::fs::write(&path, b"this is not gzip").unwrap();

        let reader = SegmentReader::new(File::open(&path).unwrap());
        match reader.read_data_block() {
            Err(SepiaError::Codec(_)) => {}
            other => panic!("expected a codec error, got {:?}", other),
        }
    }
}
