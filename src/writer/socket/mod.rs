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

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::io::Write;
use std::sync::Arc;
use std::sync::LazyLock;
use std::sync::Mutex;
use std::time::Duration;

use crate::Error;
use crate::packer::JsonPacker;
use crate::packer::Packer;
use crate::record::Record;
use crate::value::Value;
use crate::writer::Handle;
use crate::writer::Ownership;
use crate::writer::Writer;

mod options;

pub use self::options::SocketOptions;

/// Connections opened with [`SocketOptions::persistent`], keyed by URI.
static PERSISTENT: LazyLock<Mutex<HashMap<String, Arc<Handle>>>> = LazyLock::new(Default::default);

/// What a [`SocketWriter`] writes to.
#[derive(Debug, Clone)]
pub enum SocketTarget {
    /// `tcp://host:port`, `host:port` or `unix:///path`, connected by the writer.
    Uri(String),
    /// An established connection, borrowed by the writer.
    Handle(Arc<Handle>),
}

impl From<&str> for SocketTarget {
    fn from(uri: &str) -> Self {
        SocketTarget::Uri(uri.to_string())
    }
}

impl From<String> for SocketTarget {
    fn from(uri: String) -> Self {
        SocketTarget::Uri(uri)
    }
}

impl From<Arc<Handle>> for SocketTarget {
    fn from(handle: Arc<Handle>) -> Self {
        SocketTarget::Handle(handle)
    }
}

/// Read a target from loosely typed configuration. Only strings are accepted.
impl TryFrom<&Value> for SocketTarget {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(uri) => Ok(SocketTarget::Uri(uri.clone())),
            Value::Resource(kind) => Err(Error::configuration(format!(
                "Unsupported socket resource type: {kind}"
            ))),
            other => Err(Error::configuration(format!(
                "Invalid socket parameter, expecting string or handle but got {}",
                other.kind()
            ))),
        }
    }
}

/// A writer sending packed records over a socket, retrying failed sends with exponential
/// backoff.
///
/// Each record is sent as the packer renders it, without a delimiter. Once the retry budget is
/// exhausted the connection is closed and every later write fails.
///
/// # Examples
///
/// ```no_run
/// use flogger::packer::FluentdPacker;
/// use flogger::writer::SocketOptions;
/// use flogger::writer::SocketWriter;
///
/// let writer = SocketWriter::new("tcp://127.0.0.1:24224", SocketOptions::default())
///     .unwrap()
///     .packer(FluentdPacker::default());
/// ```
pub struct SocketWriter {
    handle: Arc<Handle>,
    ownership: Ownership,
    packer: Box<dyn Packer>,
    options: SocketOptions,
    backoff: Backoff,
}

impl fmt::Debug for SocketWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketWriter")
            .field("handle", &self.handle)
            .field("ownership", &self.ownership)
            .field("packer", &self.packer)
            .field("options", &self.options)
            .finish()
    }
}

impl fmt::Display for SocketWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SocketWriter ({})", self.handle.identity())
    }
}

impl SocketWriter {
    /// Create a writer for `target`, validating `options` first.
    ///
    /// A URI target is connected right away. Without [`SocketOptions::persistent`] the writer
    /// owns the connection and closes it on drop. A handle target is borrowed and never closed
    /// on drop.
    pub fn new(target: impl Into<SocketTarget>, options: SocketOptions) -> Result<Self, Error> {
        options.validate()?;

        let (handle, ownership) = match target.into() {
            SocketTarget::Handle(handle) => (handle, Ownership::Borrowed),
            SocketTarget::Uri(uri) if options.persistent => {
                (persistent(&uri, &options)?, Ownership::Borrowed)
            }
            SocketTarget::Uri(uri) => {
                let handle =
                    Handle::connect(&uri, options.connect_timeout(), options.io_timeout())?;
                (Arc::new(handle), Ownership::Owned)
            }
        };

        Ok(Self {
            handle,
            ownership,
            packer: Box::new(JsonPacker::default()),
            options,
            backoff: Backoff::Thread,
        })
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

    /// Close the connection, whoever owns it.
    pub fn close(&self) {
        self.handle.close();
    }

    fn closed(&self) -> Error {
        Error::delivery(format!("Socket \"{}\" is closed", self.handle.identity()))
    }

    fn send(&self, sink: &mut dyn Write, content: &[u8]) -> Result<(), Failure> {
        let mut remaining = content;
        let mut retry = 0;

        while !remaining.is_empty() {
            let source = match sink.write(remaining) {
                Ok(0) => None,
                Ok(n) => {
                    remaining = &remaining[n..];
                    continue;
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => Some(err),
            };

            retry += 1;
            if self.options.write_retry_count == 0 || retry > self.options.write_retry_count {
                return Err(Failure {
                    attempts: retry,
                    source,
                });
            }

            let delay = self.options.retry_delay(retry);
            log::debug!(
                "send to {} failed ({} bytes left), retry {retry} in {delay:?}",
                self.handle.identity(),
                remaining.len()
            );
            self.backoff.sleep(delay);
        }

        sink.flush().map_err(|err| Failure {
            attempts: retry + 1,
            source: Some(err),
        })
    }
}

struct Failure {
    attempts: u32,
    source: Option<io::Error>,
}

impl Writer for SocketWriter {
    fn write(&self, record: &Record) -> Result<(), Error> {
        if self.handle.is_closed() {
            return Err(self.closed());
        }

        let content = self.packer.pack(record)?;

        let mut sink = self.handle.sink();
        let result = match sink.as_mut() {
            Some(writer) => self.send(writer.as_mut(), content.as_bytes()),
            None => return Err(self.closed()),
        };

        let Err(failure) = result else {
            return Ok(());
        };

        // the connection is unusable from here on
        *sink = None;
        log::warn!(
            "closed socket {} after {} failed attempts",
            self.handle.identity(),
            failure.attempts
        );

        let mut err = Error::delivery(format!(
            "Error writing to socket \"{}\"",
            self.handle.identity()
        ))
        .with_context("attempts", failure.attempts);
        if let Some(source) = failure.source {
            err = err.with_source(source);
        }
        Err(err)
    }
}

impl Drop for SocketWriter {
    fn drop(&mut self) {
        if self.ownership == Ownership::Owned {
            self.handle.close();
        }
    }
}

fn persistent(uri: &str, options: &SocketOptions) -> Result<Arc<Handle>, Error> {
    let mut registry = PERSISTENT.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(handle) = registry.get(uri).filter(|handle| !handle.is_closed()) {
        return Ok(handle.clone());
    }

    let handle = Arc::new(Handle::connect(
        uri,
        options.connect_timeout(),
        options.io_timeout(),
    )?);
    registry.insert(uri.to_string(), handle.clone());
    Ok(handle)
}

#[derive(Debug)]
enum Backoff {
    Thread,
    #[cfg(test)]
    Recording(Arc<Mutex<Vec<Duration>>>),
}

impl Backoff {
    fn sleep(&self, delay: Duration) {
        match self {
            Backoff::Thread => std::thread::sleep(delay),
            #[cfg(test)]
            Backoff::Recording(sleeps) => sleeps.lock().unwrap().push(delay),
        }
    }
}
