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
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use fasyslog::Severity;
use fasyslog::format::SyslogContext;
use fasyslog::sender::SyslogSender;

use crate::Error;
use crate::packer::LinePacker;
use crate::packer::Packer;
use crate::record::Level;
use crate::record::Record;
use crate::writer::Writer;

/// The well-known path of the local syslog socket.
pub const DEFAULT_SYSLOG_PATH: &str = "/dev/log";

/// Where a [`SystemLogWriter`] sends records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemLogChannel {
    /// The local syslog daemon.
    System,
    /// The standard error of the host process.
    Sapi,
}

impl fmt::Display for SystemLogChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemLogChannel::System => f.write_str("system"),
            SystemLogChannel::Sapi => f.write_str("sapi"),
        }
    }
}

/// A writer sending packed records to the system log.
///
/// With [`SystemLogChannel::System`], each record becomes an RFC 3164 message whose severity is
/// read from the last dot-separated segment of the tag (`log.error` is an error). Tags that do not
/// name a level are sent as informational. The syslog socket is connected on first write and
/// reconnected after a failed send.
///
/// # Examples
///
/// ```
/// use flogger::packer::JsonPacker;
/// use flogger::writer::SystemLogWriter;
///
/// let writer = SystemLogWriter::system().packer(JsonPacker::default());
/// ```
pub struct SystemLogWriter {
    channel: SystemLogChannel,
    path: PathBuf,
    context: SyslogContext,
    sender: Mutex<Option<SyslogSender>>,
    packer: Box<dyn Packer>,
}

impl fmt::Debug for SystemLogWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemLogWriter")
            .field("channel", &self.channel)
            .field("path", &self.path)
            .field("packer", &self.packer)
            .finish()
    }
}

impl fmt::Display for SystemLogWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SystemLogWriter (channel={})", self.channel)
    }
}

impl Default for SystemLogWriter {
    fn default() -> Self {
        Self::new(SystemLogChannel::System)
    }
}

impl SystemLogWriter {
    pub fn new(channel: SystemLogChannel) -> Self {
        Self {
            channel,
            path: PathBuf::from(DEFAULT_SYSLOG_PATH),
            context: SyslogContext::default(),
            sender: Mutex::new(None),
            packer: Box::new(LinePacker::default()),
        }
    }

    /// Write to the local syslog daemon.
    pub fn system() -> Self {
        Self::new(SystemLogChannel::System)
    }

    /// Write to the standard error of the process.
    pub fn sapi() -> Self {
        Self::new(SystemLogChannel::Sapi)
    }

    /// Set the path of the syslog socket.
    ///
    /// Default to [`DEFAULT_SYSLOG_PATH`].
    pub fn socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the packer.
    ///
    /// Default to [`LinePacker`] with its default pattern.
    pub fn packer(mut self, packer: impl Into<Box<dyn Packer>>) -> Self {
        self.packer = packer.into();
        self
    }

    pub fn channel(&self) -> SystemLogChannel {
        self.channel
    }

    fn send_syslog(&self, severity: Severity, message: &str) -> Result<(), Error> {
        let mut sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let connected = match &mut *sender {
            Some(connected) => connected,
            None => sender.insert(connect(&self.path)?),
        };

        let formatted = format!("{}", self.context.format_rfc3164(severity, Some(message)));
        let result = connected
            .send_formatted(formatted.as_bytes())
            .and_then(|()| connected.flush());
        if let Err(err) = result {
            *sender = None;
            return Err(Error::delivery(format!(
                "Failed writing to system log \"{}\"",
                self.path.display()
            ))
            .with_source(err));
        }
        Ok(())
    }
}

#[cfg(unix)]
fn connect(path: &std::path::Path) -> Result<SyslogSender, Error> {
    fasyslog::sender::unix(path).map_err(|err| {
        Error::connection(format!(
            "Failed connecting to system log \"{}\"",
            path.display()
        ))
        .with_source(err)
    })
}

#[cfg(not(unix))]
fn connect(path: &std::path::Path) -> Result<SyslogSender, Error> {
    Err(Error::connection(format!(
        "Failed connecting to system log \"{}\"",
        path.display()
    ))
    .with_source(io::Error::from(io::ErrorKind::Unsupported)))
}

fn severity(tag: &str) -> Severity {
    let name = tag.rsplit('.').next().unwrap_or(tag);
    match name.parse::<Level>() {
        Ok(Level::Emergency) => Severity::EMERGENCY,
        Ok(Level::Alert) => Severity::ALERT,
        Ok(Level::Critical) => Severity::CRITICAL,
        Ok(Level::Error) => Severity::ERROR,
        Ok(Level::Warning) => Severity::WARNING,
        Ok(Level::Notice) => Severity::NOTICE,
        Ok(Level::Info) | Err(_) => Severity::INFORMATIONAL,
        Ok(Level::Debug) => Severity::DEBUG,
    }
}

impl Writer for SystemLogWriter {
    fn write(&self, record: &Record) -> Result<(), Error> {
        let message = self.packer.pack(record)?;
        match self.channel {
            SystemLogChannel::System => self.send_syslog(severity(record.tag()), &message),
            SystemLogChannel::Sapi => {
                let mut stderr = io::stderr().lock();
                writeln!(stderr, "{message}").map_err(|err| {
                    Error::delivery("Failed writing to standard error").with_source(err)
                })
            }
        }
    }
}
