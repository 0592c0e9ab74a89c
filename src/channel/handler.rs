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
use std::io::Write;
use std::sync::Arc;

use jiff::tz::TimeZone;

use crate::Error;
use crate::context::Context;
use crate::packer::JsonPacker;
use crate::record::Record;
use crate::value::Map;
use crate::value::Value;
use crate::writer::SystemLogWriter;
use crate::writer::Writer;

/// The tag of the records reporting a failed write.
pub const ERROR_TAG: &str = "log.error";

/// Receives the records a channel failed to write.
///
/// Handlers are the last resort: whatever they do, the channel does not look at the outcome.
pub trait ErrorHandler: fmt::Debug + Send + Sync + 'static {
    fn handle(&self, record: &Record, error: Error);
}

impl<T: ErrorHandler> From<T> for Box<dyn ErrorHandler> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// An error handler backed by a closure.
pub struct CustomErrorHandler {
    f: Box<dyn Fn(&Record, Error) + Send + Sync + 'static>,
}

impl fmt::Debug for CustomErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CustomErrorHandler {{ ... }}")
    }
}

impl CustomErrorHandler {
    pub fn new(handler: impl Fn(&Record, Error) + Send + Sync + 'static) -> Self {
        CustomErrorHandler {
            f: Box::new(handler),
        }
    }
}

impl ErrorHandler for CustomErrorHandler {
    fn handle(&self, record: &Record, error: Error) {
        (self.f)(record, error)
    }
}

/// The handler channels use unless configured otherwise.
///
/// It reports the failed record as a `log.error` record of the same channel, whose payload holds
/// the failed tag and payload plus the dump of the error, written as JSON to the system log.
/// When that fails too, the report goes to standard error. If standard error fails, it panics.
#[derive(Debug)]
pub struct DefaultErrorHandler {
    channel: String,
    timezone: TimeZone,
    context: Arc<dyn Context>,
    writer: Box<dyn Writer>,
}

impl DefaultErrorHandler {
    pub fn new(channel: impl Into<String>, timezone: TimeZone, context: Arc<dyn Context>) -> Self {
        Self {
            channel: channel.into(),
            timezone,
            context,
            writer: Box::new(SystemLogWriter::system().packer(JsonPacker::default())),
        }
    }

    /// Set the writer of the reports.
    ///
    /// Default to a [`SystemLogWriter`] packing JSON.
    pub fn writer(mut self, writer: impl Into<Box<dyn Writer>>) -> Self {
        self.writer = writer.into();
        self
    }

    fn report(&self, record: &Record, error: Error) -> Record {
        let payload = Map::from([
            ("tag", Value::from(record.tag())),
            ("payload", Value::Map(record.payload().clone())),
            ("error", Value::fault(error)),
        ]);
        Record::now(
            &self.timezone,
            self.channel.as_str(),
            ERROR_TAG,
            payload,
            self.context.map(),
        )
    }
}

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, record: &Record, error: Error) {
        let report = self.report(record, error);
        let Err(err) = self.writer.write(&report) else {
            return;
        };

        log::warn!("failed to report a log error, falling back to stderr: {err}");
        handle_report_error(&report, err);
    }
}

fn handle_report_error(report: &Record, error: Error) {
    let Err(fallback_error) = write!(
        std::io::stderr(),
        r###"
Error reporting a failed log write.
    Report: {report}
    Error: {error:?}
"###,
        report = crate::json::to_string(&report.to_value()),
    ) else {
        return;
    };

    panic!(
        r###"
Error performing stderr logging after error occurred during log error report.
    Report: {report}
    Error: {error:?}
    Fallback error: {fallback_error}
"###,
        report = crate::json::to_string(&report.to_value()),
    );
}
