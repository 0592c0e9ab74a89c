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

//! Writers deliver packed records to a sink.

use std::fmt;
use std::fs::DirBuilder;
use std::path::Path;

use crate::Error;
use crate::record::Record;

mod file;
mod handle;
mod socket;
mod stream;
mod system;

pub use self::file::FileWriter;
pub use self::handle::Handle;
pub use self::handle::HandleKind;
pub use self::socket::SocketOptions;
pub use self::socket::SocketTarget;
pub use self::socket::SocketWriter;
pub use self::stream::StreamWriter;
pub use self::system::SystemLogChannel;
pub use self::system::SystemLogWriter;

/// A writer delivers records to a sink.
pub trait Writer: fmt::Debug + Send + Sync + 'static {
    /// Pack `record` and deliver it.
    fn write(&self, record: &Record) -> Result<(), Error>;
}

impl<T: Writer> From<T> for Box<dyn Writer> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// Whether a writer closes its sink handle on drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The writer opened the handle and closes it on drop.
    Owned,
    /// The handle belongs to someone else and is never closed on drop.
    Borrowed,
}

/// Create the parent directory of `path` with mode 0755, if missing.
pub(crate) fn create_parent_dir(path: &Path) -> Result<(), Error> {
    let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
        return Ok(());
    };
    if dir.is_dir() {
        return Ok(());
    }

    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(dir).map_err(|err| {
        Error::connection(format!("Unable to create directory \"{}\"", dir.display()))
            .with_source(err)
    })
}
