//! Input file plumbing: open, stat, mmap, advise.
//!
//! The viewer reads the input strictly through a read-only shared mapping;
//! the cache borrows from it for the lifetime of the process.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use thiserror::Error;

/// Errors from opening and mapping the input file.
///
/// All of these are configuration/I-O failures and map to the input-file
/// exit code.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("input file '{path}' is not a regular file")]
    NotRegular { path: PathBuf },

    #[error("unable to {action} input file '{path}': {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },
}

/// A read-only memory mapping of the input file.
#[derive(Debug)]
pub struct MappedFile {
    map: Mmap,
}

impl MappedFile {
    /// Open `path`, verify it is a regular file, and map it read-only.
    ///
    /// The mapping is advised `WillNeed` (and `DontDump` on Linux) where the
    /// platform supports it.
    pub fn open(path: &Path) -> Result<Self, FileError> {
        let io_err = |action: &'static str| {
            let path = path.to_path_buf();
            move |source: io::Error| FileError::Io {
                action,
                path,
                source,
            }
        };

        let metadata = std::fs::metadata(path).map_err(io_err("stat"))?;
        if !metadata.file_type().is_file() {
            return Err(FileError::NotRegular {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path).map_err(io_err("open"))?;

        // Re-check on the opened handle: no pipes or other funny business
        // swapped in between stat and open.
        let metadata = file.metadata().map_err(io_err("fstat"))?;
        if !metadata.file_type().is_file() {
            return Err(FileError::NotRegular {
                path: path.to_path_buf(),
            });
        }

        // Safety: the mapping is read-only and the file is required to be a
        // regular file; the process keeps the mapping for its whole lifetime.
        let map = unsafe { Mmap::map(&file) }.map_err(io_err("mmap"))?;

        #[cfg(unix)]
        {
            map.advise(memmap2::Advice::WillNeed)
                .map_err(io_err("madvise"))?;
            #[cfg(target_os = "linux")]
            map.advise(memmap2::Advice::DontDump)
                .map_err(io_err("madvise"))?;
        }

        Ok(Self { map })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl AsRef<[u8]> for MappedFile {
    fn as_ref(&self) -> &[u8] {
        &self.map
    }
}
