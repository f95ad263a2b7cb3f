use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Directory holding the lexical half of every segment
pub const INVERTED_SEGMENT_DIR: &str = "invertedindex";
/// Directory holding the vector half of every segment
pub const VECTOR_SEGMENT_DIR: &str = "vectorindex";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    Unknown,
    Segment,
}

/// Catalogue entry for one on-disk segment pair
#[derive(Clone, Copy, Debug)]
pub struct FileMetadata {
    file_num: u64,
    file_type: FileType,
}

impl FileMetadata {
    pub fn is_segment(&self) -> bool {
        self.file_type == FileType::Segment
    }

    pub fn file_num(&self) -> u64 {
        self.file_num
    }
}

/// Owns the on-disk layout and allocates monotonically increasing segment
/// file numbers. Both halves of a pair share one number:
/// `<dataDir>/invertedindex/NNNNNN.segment` and
/// `<dataDir>/vectorindex/NNNNNN.segment`.
pub struct Provider {
    data_dir: PathBuf,
    file_num: u64,
}

impl Provider {
    pub fn new(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir.join(INVERTED_SEGMENT_DIR))?;
        fs::create_dir_all(data_dir.join(VECTOR_SEGMENT_DIR))?;
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            file_num: 0,
        })
    }

    /// Enumerate existing segment files in ascending file-number order and
    /// advance the allocator past the highest one seen.
    pub fn list_files(&mut self) -> Result<Vec<FileMetadata>> {
        let mut metas = Vec::new();
        for entry in fs::read_dir(self.data_dir.join(INVERTED_SEGMENT_DIR))? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(meta) = parse_file_name(name) else {
                continue;
            };
            metas.push(meta);
        }
        metas.sort_by_key(|m| m.file_num);
        if let Some(last) = metas.last() {
            self.file_num = self.file_num.max(last.file_num);
        }
        Ok(metas)
    }

    /// Allocate the next segment file number
    pub fn prepare_new_file(&mut self) -> FileMetadata {
        self.file_num += 1;
        FileMetadata {
            file_num: self.file_num,
            file_type: FileType::Segment,
        }
    }

    pub fn segment_path(&self, meta: &FileMetadata, kind: &str) -> PathBuf {
        self.data_dir
            .join(kind)
            .join(format!("{:06}.segment", meta.file_num))
    }

    pub fn open_for_reading(&self, meta: &FileMetadata, kind: &str) -> Result<File> {
        let file = File::open(self.segment_path(meta, kind))?;
        Ok(file)
    }
}

fn parse_file_name(name: &str) -> Option<FileMetadata> {
    let (stem, extension) = name.split_once('.')?;
    if stem.len() != 6 {
        return None;
    }
    let file_num = stem.parse::<u64>().ok()?;
    let file_type = if extension == "segment" {
        FileType::Segment
    } else {
        FileType::Unknown
    };
    Some(FileMetadata {
        file_num,
        file_type,
    })
}
