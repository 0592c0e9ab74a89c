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

//! Forward the records of the [`log`] crate to a [`Channel`].

use crate::channel::Channel;
use crate::channel::Logger;
use crate::record::Level;
use crate::value::Map;
use crate::value::Value;

/// A [`log::Log`] implementation posting every record to a channel.
///
/// The record message goes through [`Logger::log`] under the tag named after its level; key-values
/// become the vars. Records emitted by this crate itself are ignored, so that a failing channel
/// cannot feed itself.
#[derive(Debug)]
pub struct LogBridge {
    channel: Channel,
}

impl LogBridge {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }
}

fn level_tag(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => Level::Error.as_str(),
        log::Level::Warn => Level::Warning.as_str(),
        log::Level::Info => Level::Info.as_str(),
        log::Level::Debug | log::Level::Trace => Level::Debug.as_str(),
    }
}

fn is_internal(target: &str) -> bool {
    let crate_name = env!("CARGO_PKG_NAME");
    target
        .strip_prefix(crate_name)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

fn to_value(value: &log::kv::Value) -> Value {
    if let Some(b) = value.to_bool() {
        Value::Bool(b)
    } else if let Some(i) = value.to_i64() {
        Value::Int(i)
    } else if let Some(u) = value.to_u64() {
        Value::from(u)
    } else if let Some(f) = value.to_f64() {
        Value::Float(f)
    } else if let Some(s) = value.to_borrowed_str() {
        Value::from(s)
    } else {
        Value::String(value.to_string())
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        !is_internal(metadata.target())
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        struct KeyValueVisitor<'a> {
            vars: &'a mut Map,
        }

        impl<'kvs> log::kv::VisitSource<'kvs> for KeyValueVisitor<'_> {
            fn visit_pair(
                &mut self,
                key: log::kv::Key<'kvs>,
                value: log::kv::Value<'kvs>,
            ) -> Result<(), log::kv::Error> {
                self.vars.insert(key.as_str(), to_value(&value));
                Ok(())
            }
        }

        let mut vars = Map::new();
        let mut visitor = KeyValueVisitor { vars: &mut vars };
        // the visitor itself never fails
        let _ = record.key_values().visit(&mut visitor);

        let message = record.args().to_string();
        self.channel.log(level_tag(record.level()), &message, vars);
    }

    fn flush(&self) {}
}

/// Set up the log crate global logger, forwarding to `channel`.
///
/// This function will set the global maximum log level to `Trace`. To override this, call
/// [`log::set_max_level`] after this function.
///
/// # Errors
///
/// Return an error if the log crate global logger has already been set.
pub fn try_setup_log_crate(channel: Channel) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(LogBridge::new(channel)))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

/// Set up the log crate global logger, forwarding to `channel`.
///
/// # Panics
///
/// Panic if the log crate global logger has already been set.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use flogger::Channel;
/// use flogger::packer::LinePacker;
/// use flogger::writer::Handle;
/// use flogger::writer::StreamWriter;
///
/// let writer = StreamWriter::borrowed(Arc::new(Handle::stderr())).packer(LinePacker::default());
/// flogger::bridge::setup_log_crate(Channel::builder("app", writer).build());
///
/// log::info!(user = "zoid"; "hello {{user}}");
/// ```
pub fn setup_log_crate(channel: Channel) {
    try_setup_log_crate(channel).expect(
        "flogger::bridge::setup_log_crate must be called before the log crate global logger initialized",
    )
}
