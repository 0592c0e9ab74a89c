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

//! Flogger is a structured logging pipeline: tagged, payload-bearing records are filtered,
//! timestamped, enriched with ambient context, packed and written to a file, a stream, a socket or
//! the system log.
//!
//! # Overview
//!
//! A [`Channel`] ties together a [`Filter`] on record tags, a [`Context`] attached to every
//! record, and a [`Writer`] delivering records packed by a [`Packer`]. Write failures go to an
//! [`ErrorHandler`] and never reach the caller.
//!
//! Values are encoded by [`json::encode`], which never fails: cycles, excessive depth, non-finite
//! floats, malformed text and opaque objects are replaced by placeholders.
//!
//! # Examples
//!
//! Post JSON records to a Fluentd-style collector:
//!
//! ```no_run
//! use flogger::Channel;
//! use flogger::Logger;
//! use flogger::Map;
//! use flogger::packer::FluentdPacker;
//! use flogger::writer::SocketOptions;
//! use flogger::writer::SocketWriter;
//!
//! let writer = SocketWriter::new("tcp://127.0.0.1:24224", SocketOptions::default())
//!     .unwrap()
//!     .packer(FluentdPacker::default());
//! let channel = Channel::builder("app", writer).build();
//!
//! channel.post("app.access", Map::from([("path", "/"), ("status", "200")]));
//! ```
//!
//! Log text lines to a file:
//!
//! ```
//! use flogger::Channel;
//! use flogger::Logger;
//! use flogger::Map;
//! use flogger::packer::LinePacker;
//! use flogger::writer::FileWriter;
//!
//! let dir = std::env::temp_dir().join("flogger-doc");
//! let writer = FileWriter::new(dir.join("app.log"))
//!     .unwrap()
//!     .packer(LinePacker::new("[{timestamp}] {channel}.{tag}: {payload:message}").unwrap());
//! let channel = Channel::builder("app", writer).build();
//!
//! channel.warning("disk {disk} is full", Map::from([("disk", "/dev/sda1")]));
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod channel;
pub mod context;
pub mod filter;
pub mod json;
pub mod packer;
pub mod writer;

#[cfg(feature = "bridge-log")]
pub mod bridge;

mod error;
mod fault;
mod record;
mod value;

pub use self::channel::Channel;
pub use self::channel::ChannelBuilder;
pub use self::channel::ErrorHandler;
pub use self::channel::Logger;
pub use self::channel::NullLogger;
pub use self::context::Context;
pub use self::error::Error;
pub use self::error::ErrorKind;
pub use self::fault::Fault;
pub use self::fault::FaultDump;
pub use self::fault::FaultFrame;
pub use self::filter::Filter;
pub use self::packer::Packer;
pub use self::record::Level;
pub use self::record::Record;
pub use self::record::TIMESTAMP_FORMAT;
pub use self::value::Describe;
pub use self::value::Map;
pub use self::value::Value;
pub use self::writer::Writer;
