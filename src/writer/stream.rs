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
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::Error;
use crate::packer::JsonPacker;
use crate::packer::Packer;
use crate::record::Record;
use crate::writer::Handle;
use crate::writer::Ownership;
use crate::writer::Writer;
use crate::writer::create_parent_dir;

/// A writer appending one packed record per line to a stream.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use flogger::packer::LinePacker;
/// use flogger::writer::Handle;
/// use flogger::writer::StreamWriter;
///
/// let writer = StreamWriter::borrowed(Arc::new(Handle::stderr())).packer(LinePacker::default());
/// ```
pub struct StreamWriter {
    handle: Arc<Handle>,
    ownership: Ownership,
    packer: Box<dyn Packer>,
}

impl fmt::Debug for StreamWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamWriter")
            .field("handle", &self.handle)
            .field("ownership", &self.ownership)
            .field("packer", &self.packer)
            .finish()
    }
}

impl fmt::Display for StreamWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamWriter ({})", self.handle.identity())
    }
}

impl StreamWriter {
    /// Open `uri`, a plain path or a `file://` URI, in append mode.
    ///
    /// Missing parent directories are created. The writer owns the file and closes it on drop.
    pub fn open(uri: &str) -> Result<Self, Error> {
        let path = match uri.strip_prefix("file://") {
            Some(path) => path,
            None if uri.contains("://") => {
                return Err(Error::configuration(format!(
                    "Unsupported stream scheme: \"{uri}\""
                )));
            }
            None => uri,
        };

        let path = Path::new(path);
        create_parent_dir(path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| {
                Error::connection(format!("Failed to open log stream \"{uri}\"")).with_source(err)
            })?;

        Ok(Self::new(Arc::new(Handle::from_file(file, path)), Ownership::Owned))
    }

    /// Write to a stream opened elsewhere. The handle is never closed on drop.
    pub fn borrowed(handle: Arc<Handle>) -> Self {
        Self::new(handle, Ownership::Borrowed)
    }

    fn new(handle: Arc<Handle>, ownership: Ownership) -> Self {
        Self {
            handle,
            ownership,
            packer: Box::new(JsonPacker::default()),
        }
    }

    /// Set the packer.
    ///
    /// Default to [`JsonPacker`].
    pub fn packer(mut self, packer: impl Into<Box<dyn Packer>>) -> Self {
        self.packer = packer.into();
        self
    }

    pub fn handle(&self) -> &Arc<Handle> {
        &self.handle
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    fn closed(&self) -> Error {
        Error::delivery(format!("Stream \"{}\" is closed", self.handle.identity()))
    }
}

impl Writer for StreamWriter {
    fn write(&self, record: &Record) -> Result<(), Error> {
        if self.handle.is_closed() {
            return Err(self.closed());
        }

        let mut entry = self.packer.pack(record)?;
        entry.push('\n');

        let mut sink = self.handle.sink();
        let Some(stream) = sink.as_mut() else {
            return Err(self.closed());
        };

        if let Err(err) = stream
            .write_all(entry.as_bytes())
            .and_then(|()| stream.flush())
        {
            *sink = None;
            return Err(Error::delivery(format!(
                "Failed to write log record to stream \"{}\"",
                self.handle.identity()
            ))
            .with_source(err));
        }

        Ok(())
    }
}

impl Drop for StreamWriter {
    fn drop(&mut self) {
        if self.ownership == Ownership::Owned {
            self.handle.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::ErrorKind;
    use crate::packer::LinePacker;
    use crate::packer::testing::record;
    use crate::value::Map;
    use crate::writer::HandleKind;
    use crate::writer::testing::ScriptedSink;

    fn sample(message: &str) -> Record {
        record("app", "info", Map::from([("message", message)]), Map::new())
    }

    #[test]
    fn test_open_appends_lines() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("logs").join("app.log");
        let uri = format!("file://{}", path.display());

        let writer = StreamWriter::open(&uri)
            .unwrap()
            .packer(LinePacker::new("{tag} {payload:message}").unwrap());
        assert_eq!(writer.ownership(), Ownership::Owned);
        writer.write(&sample("first")).unwrap();
        writer.write(&sample("second")).unwrap();
        let handle = writer.handle().clone();
        drop(writer);
        assert!(handle.is_closed());

        // reopening appends
        let writer = StreamWriter::open(path.to_str().unwrap())
            .unwrap()
            .packer(LinePacker::new("{tag} {payload:message}").unwrap());
        writer.write(&sample("third")).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "info first\ninfo second\ninfo third\n");
    }

    #[test]
    fn test_default_packer_is_json() {
        let sink = ScriptedSink::new(vec![]);
        let handle = Arc::new(Handle::new("mock://sink", HandleKind::Custom, sink.clone()));
        let writer = StreamWriter::borrowed(handle);
        writer.write(&sample("hello")).unwrap();

        let accepted = String::from_utf8(sink.accepted()).unwrap();
        let line = accepted.strip_suffix('\n').unwrap();
        let decoded: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(decoded["payload"]["message"], "hello");
    }

    #[test]
    fn test_failed_write_closes_borrowed_handle() {
        let sink = ScriptedSink::new(vec![Err(io::ErrorKind::BrokenPipe.into())]);
        let handle = Arc::new(Handle::new("mock://sink", HandleKind::Custom, sink.clone()));
        let writer = StreamWriter::borrowed(handle.clone());

        let err = writer.write(&sample("lost")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Delivery);
        assert!(handle.is_closed());

        let err = writer.write(&sample("lost")).unwrap_err();
        assert_eq!(err.message(), "Stream \"mock://sink\" is closed");
        assert_eq!(sink.attempts(), 1);
    }

    #[test]
    fn test_borrowed_handle_survives_drop() {
        let handle = Arc::new(Handle::new(
            "mock://sink",
            HandleKind::Custom,
            ScriptedSink::new(vec![]),
        ));
        drop(StreamWriter::borrowed(handle.clone()));
        assert!(!handle.is_closed());
    }

    #[test]
    fn test_open_rejects_other_schemes() {
        let err = StreamWriter::open("http://example.com/log").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_open_fails_when_directory_cannot_be_created() {
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let path = blocker.path().join("app.log");
        let err = StreamWriter::open(path.to_str().unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.to_string().contains("Unable to create directory"));
    }
}
