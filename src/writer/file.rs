// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::Error;
use crate::packer::JsonPacker;
use crate::packer::Packer;
use crate::record::Record;
use crate::writer::Writer;
use crate::writer::create_parent_dir;

/// A writer appending one packed record per line to a file, opening the file for every record.
///
/// No handle is kept between writes, so the file may be rotated or removed by another process
/// at any time. Each append holds an exclusive advisory lock on the file, so lines written by
/// concurrent processes never interleave.
#[derive(Debug)]
pub struct FileWriter {
    path: PathBuf,
    packer: Box<dyn Packer>,
}

impl fmt::Display for FileWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileWriter ({})", self.path.display())
    }
}

impl FileWriter {
    /// Create a writer for `path`, creating missing parent directories right away.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        create_parent_dir(&path)?;
        Ok(Self {
            path,
            packer: Box::new(JsonPacker::default()),
        })
    }

    /// Set the packer.
    ///
    /// Default to [`JsonPacker`].
    pub fn packer(mut self, packer: impl Into<Box<dyn Packer>>) -> Self {
        self.packer = packer.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Writer for FileWriter {
    fn write(&self, record: &Record) -> Result<(), Error> {
        let mut entry = self.packer.pack(record)?;
        entry.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| {
                Error::connection(format!(
                    "Failed to open log file \"{}\"",
                    self.path.display()
                ))
                .with_source(err)
            })?;

        let failed = |err: io::Error| {
            Error::delivery(format!(
                "Failed to write log to file \"{}\"",
                self.path.display()
            ))
            .with_source(err)
        };

        file.lock().map_err(failed)?;
        let written = file.write_all(entry.as_bytes()).map_err(failed);
        // closing the file releases the lock as well
        let _ = file.unlock();
        written
    }
}
