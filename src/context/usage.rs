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
use std::time::Instant;

use crate::value::Describe;
use crate::value::Value;

const THRESHOLDS: [(&str, i64); 3] = [("GB", 1 << 30), ("MB", 1 << 20), ("KB", 1 << 10)];

/// Render a byte count with the largest binary unit it reaches, rounded to 3 decimals.
///
/// Negative counts are treated as 0.
///
/// # Examples
///
/// ```
/// use flogger::context::format_bytes;
///
/// assert_eq!(format_bytes(1023), "1023 B");
/// assert_eq!(format_bytes(1536), "1.5 KB");
/// assert_eq!(format_bytes(-1), "0 B");
/// ```
pub fn format_bytes(bytes: i64) -> String {
    let bytes = bytes.max(0);
    for (suffix, threshold) in THRESHOLDS {
        if bytes >= threshold {
            let scaled = ((bytes as f64 / threshold as f64) * 1000.0).round() / 1000.0;
            return format!("{scaled} {suffix}");
        }
    }
    format!("{bytes} B")
}

/// A context value rendering the seconds elapsed since its creation.
///
/// Put it in a context once; every record then carries the time elapsed when it was encoded.
#[derive(Debug, Clone, Copy)]
pub struct ElapsedTime {
    start: Instant,
    decimals: usize,
}

impl Default for ElapsedTime {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ElapsedTime {
    pub fn new(decimals: usize) -> Self {
        Self {
            start: Instant::now(),
            decimals,
        }
    }

    pub fn value(&self) -> String {
        format!("{:.*}", self.decimals, self.start.elapsed().as_secs_f64())
    }
}

impl Describe for ElapsedTime {
    fn describe(&self) -> Value {
        Value::String(self.value())
    }
}

impl fmt::Display for ElapsedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElapsedTime ({})", self.value())
    }
}

/// A context value rendering the peak resident memory of the process, such as `"12.5 MB"`.
///
/// Renders null on platforms that do not expose the figure.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryPeakUsage;

impl MemoryPeakUsage {
    pub fn value(&self) -> Option<String> {
        peak_resident_bytes().map(format_bytes)
    }
}

impl Describe for MemoryPeakUsage {
    fn describe(&self) -> Value {
        self.value().map(Value::String).unwrap_or_default()
    }
}

impl fmt::Display for MemoryPeakUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(value) => write!(f, "MemoryPeakUsage ({value})"),
            None => f.write_str("MemoryPeakUsage"),
        }
    }
}

#[cfg(target_os = "linux")]
fn peak_resident_bytes() -> Option<i64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_hwm(&status)
}

#[cfg(not(target_os = "linux"))]
fn peak_resident_bytes() -> Option<i64> {
    None
}

/// Read the `VmHWM` line of `/proc/self/status`, given in kB.
#[cfg_attr(not(any(target_os = "linux", test)), allow(dead_code))]
fn parse_vm_hwm(status: &str) -> Option<i64> {
    let line = status.lines().find(|line| line.starts_with("VmHWM:"))?;
    let kb: i64 = line["VmHWM:".len()..]
        .trim()
        .trim_end_matches("kB")
        .trim()
        .parse()
        .ok()?;
    kb.checked_mul(1024)
}
