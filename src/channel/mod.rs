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

//! Channels tie a filter, a context and a writer together.

use std::fmt;
use std::sync::Arc;

use jiff::tz::TimeZone;

use crate::context::Context;
use crate::context::SimpleContext;
use crate::filter::Filter;
use crate::json;
use crate::json::EncodeOptions;
use crate::record::Record;
use crate::value::Map;
use crate::writer::Writer;

mod handler;
mod logger;

pub use self::handler::CustomErrorHandler;
pub use self::handler::DefaultErrorHandler;
pub use self::handler::ERROR_TAG;
pub use self::handler::ErrorHandler;
pub use self::logger::Logger;
pub use self::logger::NullLogger;

/// A named logging pipeline.
///
/// Posting a record runs: filter check on the tag, record construction (timestamp in the channel
/// time zone plus a snapshot of the context), write, and on failure the error handler. Failures
/// never reach the caller.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use flogger::Channel;
/// use flogger::Context;
/// use flogger::Logger;
/// use flogger::Map;
/// use flogger::Value;
/// use flogger::context::SimpleContext;
/// use flogger::filter::EqualsFilter;
/// use flogger::writer::Handle;
/// use flogger::writer::StreamWriter;
///
/// let context = Arc::new(SimpleContext::default());
/// let channel = Channel::builder("app", StreamWriter::borrowed(Arc::new(Handle::stderr())))
///     .context(context.clone())
///     .filter(EqualsFilter::new("debug").deny())
///     .build();
///
/// context.put("request_id", Value::from("f00"));
/// channel.info("user {user} logged in", Map::from([("user", "zoid")]));
/// ```
#[derive(Debug)]
pub struct Channel {
    name: String,
    timezone: TimeZone,
    writer: Box<dyn Writer>,
    context: Arc<dyn Context>,
    filter: Option<Box<dyn Filter>>,
    handler: Box<dyn ErrorHandler>,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Channel ({})", self.name)
    }
}

impl Channel {
    /// Start building a channel named `name`, writing to `writer`.
    pub fn builder(name: impl Into<String>, writer: impl Into<Box<dyn Writer>>) -> ChannelBuilder {
        ChannelBuilder::new(name, writer)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timezone(&self) -> &TimeZone {
        &self.timezone
    }

    pub fn context(&self) -> &Arc<dyn Context> {
        &self.context
    }

    fn accepts(&self, tag: &str) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter.accept(tag))
    }

    fn dispatch(&self, tag: &str, payload: Map) {
        let record = Record::now(
            &self.timezone,
            self.name.as_str(),
            tag,
            payload,
            self.context.map(),
        );
        if let Err(err) = self.writer.write(&record) {
            self.handler.handle(&record, err);
        }
    }
}

impl Logger for Channel {
    fn post(&self, tag: &str, payload: Map) {
        if self.accepts(tag) {
            self.dispatch(tag, payload);
        }
    }

    fn log(&self, level: &str, message: &str, vars: Map) {
        if !self.accepts(level) {
            return;
        }

        let mut vars = vars;
        let message = interpolate(message, &mut vars);
        vars.insert("message", message);
        self.dispatch(level, vars);
    }
}

/// Replace each `{key}` of `message` naming an entry of `vars` with the quote-trimmed JSON
/// encoding of the entry, which is removed from `vars`.
///
/// Replacements are made in one pass; replaced text is never scanned again.
fn interpolate(message: &str, vars: &mut Map) -> String {
    if !message.contains('{') {
        return message.to_string();
    }

    let options = EncodeOptions::default();
    let mut used = vec![];
    let mut output = String::with_capacity(message.len());
    let mut rest = message;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let candidate = &rest[open..];
        let key = candidate[1..]
            .find('}')
            .map(|close| &candidate[1..close + 1]);

        match key.and_then(|key| vars.get(key).map(|value| (key, value))) {
            Some((key, value)) => {
                output.push_str(json::encode(value, &options).trim_matches('"'));
                used.push(key);
                rest = &candidate[key.len() + 2..];
            }
            None => {
                output.push('{');
                rest = &candidate[1..];
            }
        }
    }
    output.push_str(rest);

    for key in used {
        vars.remove(key);
    }
    output
}

/// A builder of [`Channel`]s.
#[must_use = "call `build` to create the channel"]
#[derive(Debug)]
pub struct ChannelBuilder {
    name: String,
    timezone: TimeZone,
    writer: Box<dyn Writer>,
    context: Option<Arc<dyn Context>>,
    filter: Option<Box<dyn Filter>>,
    handler: Option<Box<dyn ErrorHandler>>,
}

impl ChannelBuilder {
    pub fn new(name: impl Into<String>, writer: impl Into<Box<dyn Writer>>) -> Self {
        Self {
            name: name.into(),
            timezone: TimeZone::system(),
            writer: writer.into(),
            context: None,
            filter: None,
            handler: None,
        }
    }

    /// Set the time zone of record timestamps.
    ///
    /// Default to the system time zone.
    pub fn timezone(mut self, timezone: TimeZone) -> Self {
        self.timezone = timezone;
        self
    }

    /// Set the context attached to every record.
    ///
    /// Default to an empty [`SimpleContext`].
    pub fn context(mut self, context: Arc<dyn Context>) -> Self {
        self.context = Some(context);
        self
    }

    /// Set the filter on record tags. Without a filter, every tag is accepted.
    pub fn filter(mut self, filter: impl Into<Box<dyn Filter>>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set the handler of failed writes.
    ///
    /// Default to a [`DefaultErrorHandler`] for this channel.
    pub fn error_handler(mut self, handler: impl Into<Box<dyn ErrorHandler>>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    pub fn build(self) -> Channel {
        let context: Arc<dyn Context> = match self.context {
            Some(context) => context,
            None => Arc::new(SimpleContext::default()),
        };
        let handler: Box<dyn ErrorHandler> = match self.handler {
            Some(handler) => handler,
            None => Box::new(DefaultErrorHandler::new(
                self.name.as_str(),
                self.timezone.clone(),
                context.clone(),
            )),
        };

        Channel {
            name: self.name,
            timezone: self.timezone,
            writer: self.writer,
            context,
            filter: self.filter,
            handler,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use crate::Error;
    use crate::record::Record;
    use crate::writer::Writer;

    /// A writer keeping every record it is given.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordingWriter {
        records: Arc<Mutex<Vec<Record>>>,
    }

    impl RecordingWriter {
        pub(crate) fn records(&self) -> Vec<Record> {
            self.records.lock().unwrap().clone()
        }
    }

    impl Writer for RecordingWriter {
        fn write(&self, record: &Record) -> Result<(), Error> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    /// A writer failing every write.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct FailingWriter {
        attempts: Arc<AtomicUsize>,
    }

    impl FailingWriter {
        pub(crate) fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl Writer for FailingWriter {
        fn write(&self, _: &Record) -> Result<(), Error> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(Error::delivery("Socket \"mock://sink\" is closed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::testing::FailingWriter;
    use super::testing::RecordingWriter;
    use super::*;
    use crate::Error;
    use crate::filter::CustomFilter;
    use crate::filter::EqualsFilter;
    use crate::value::Value;

    #[derive(Debug, Default)]
    struct CountingContext {
        inner: SimpleContext,
        reads: AtomicUsize,
    }

    impl Context for CountingContext {
        fn map(&self) -> Map {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.map()
        }

        fn value(&self, key: &str) -> Option<Value> {
            self.inner.value(key)
        }

        fn put(&self, key: &str, value: Value) {
            self.inner.put(key, value)
        }

        fn remove(&self, keys: &[&str]) {
            self.inner.remove(keys)
        }
    }

    fn channel(writer: &RecordingWriter) -> ChannelBuilder {
        Channel::builder("app", writer.clone()).timezone(TimeZone::UTC)
    }

    #[test]
    fn test_post_builds_record() {
        let writer = RecordingWriter::default();
        let context = Arc::new(SimpleContext::new(Map::from([("pid", 42)])));
        let channel = channel(&writer).context(context.clone()).build();

        channel.post("audit", Map::from([("user", "zoid")]));
        context.put("pid", Value::from(43));

        let records = writer.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].channel(), "app");
        assert_eq!(records[0].tag(), "audit");
        assert_eq!(records[0].payload(), &Map::from([("user", "zoid")]));
        assert_eq!(records[0].context(), &Map::from([("pid", 42)]));
        assert!(records[0].formatted_timestamp().ends_with("+00:00"));
        assert_eq!(channel.to_string(), "Channel (app)");
    }

    #[test]
    fn test_rejected_tag_reads_no_context() {
        let writer = RecordingWriter::default();
        let context = Arc::new(CountingContext::default());
        let channel = channel(&writer)
            .context(context.clone())
            .filter(EqualsFilter::new("debug").deny())
            .build();

        channel.post("debug", Map::new());
        channel.debug("dropped", Map::new());
        assert_eq!(context.reads.load(Ordering::SeqCst), 0);
        assert!(writer.records().is_empty());

        channel.info("kept", Map::new());
        assert_eq!(context.reads.load(Ordering::SeqCst), 1);
        assert_eq!(writer.records().len(), 1);
    }

    #[test]
    fn test_log_interpolates_message() {
        let writer = RecordingWriter::default();
        let channel = channel(&writer).build();

        channel.log(
            "alert",
            "foo = {foo}",
            Map::from([("foo", "bar"), ("zig", "zag")]),
        );

        let records = writer.records();
        assert_eq!(records[0].tag(), "alert");
        assert_eq!(
            records[0].payload(),
            &Map::from([("zig", "zag"), ("message", "foo = bar")])
        );
    }

    #[test]
    fn test_interpolate() {
        let mut vars = Map::from([
            ("n", Value::from(42)),
            ("list", Value::from(vec![1, 2])),
            ("s", Value::from("{n}")),
            ("unused", Value::from(true)),
        ]);
        let message = interpolate("n={n} list={list} s={s} {missing} {n", &mut vars);
        assert_eq!(message, "n=42 list=[1,2] s={n} {missing} {n");
        assert_eq!(vars, Map::from([("unused", true)]));

        let mut vars = Map::from([("a", "b")]);
        assert_eq!(interpolate("no braces", &mut vars), "no braces");
        assert_eq!(vars.len(), 1);

        let mut vars = Map::from([("a", "x")]);
        assert_eq!(interpolate("{{a}}", &mut vars), "{x}");
    }

    #[test]
    fn test_write_failure_goes_to_handler() {
        let failures = Arc::new(Mutex::new(vec![]));
        let channel = Channel::builder("app", FailingWriter::default())
            .error_handler(CustomErrorHandler::new({
                let failures = failures.clone();
                move |record: &Record, error: Error| {
                    failures
                        .lock()
                        .unwrap()
                        .push((record.tag().to_string(), error.to_string()));
                }
            }))
            .build();

        channel.error("boom", Map::new());
        let failures = failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "error");
        assert!(failures[0].1.contains("is closed"));
    }

    #[test]
    fn test_level_helpers_use_level_tags() {
        let writer = RecordingWriter::default();
        let tags = Arc::new(Mutex::new(vec![]));
        let channel = channel(&writer)
            .filter(CustomFilter::new({
                let tags = tags.clone();
                move |tag| {
                    tags.lock().unwrap().push(tag.to_string());
                    true
                }
            }))
            .build();

        channel.emergency("m", Map::new());
        channel.alert("m", Map::new());
        channel.critical("m", Map::new());
        channel.error("m", Map::new());
        channel.warning("m", Map::new());
        channel.notice("m", Map::new());
        channel.info("m", Map::new());
        channel.debug("m", Map::new());

        assert_eq!(
            *tags.lock().unwrap(),
            vec![
                "emergency",
                "alert",
                "critical",
                "error",
                "warning",
                "notice",
                "info",
                "debug"
            ]
        );
        assert_eq!(writer.records().len(), 8);
    }

    #[test]
    fn test_null_logger() {
        let logger: Box<dyn Logger> = Box::new(NullLogger);
        logger.post("tag", Map::new());
        logger.info("message", Map::new());
    }
}
