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
use std::fs::File;
use std::io;
use std::io::Write;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use crate::Error;

/// The kind of stream behind a [`Handle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Tcp,
    Unix,
    File,
    Stdout,
    Stderr,
    /// Any other [`Write`] implementation.
    Custom,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleKind::Tcp => "tcp",
            HandleKind::Unix => "unix",
            HandleKind::File => "file",
            HandleKind::Stdout => "stdout",
            HandleKind::Stderr => "stderr",
            HandleKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

type Sink = Option<Box<dyn Write + Send>>;

/// A shareable, closable stream.
///
/// Writers hold handles behind an [`Arc`](std::sync::Arc). Closing a handle from anywhere makes
/// every writer using it fail with a "closed" error from then on.
pub struct Handle {
    identity: String,
    kind: HandleKind,
    sink: Mutex<Sink>,
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("identity", &self.identity)
            .field("kind", &self.kind)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.identity)
    }
}

impl Handle {
    /// Wrap any stream. `identity` names it in diagnostics.
    pub fn new(
        identity: impl Into<String>,
        kind: HandleKind,
        sink: impl Write + Send + 'static,
    ) -> Self {
        Self {
            identity: identity.into(),
            kind,
            sink: Mutex::new(Some(Box::new(sink))),
        }
    }

    pub fn from_tcp(stream: TcpStream) -> Self {
        let identity = match stream.peer_addr() {
            Ok(addr) => format!("tcp://{addr}"),
            Err(_) => "tcp://???".to_string(),
        };
        Self::new(identity, HandleKind::Tcp, stream)
    }

    #[cfg(unix)]
    pub fn from_unix(stream: UnixStream) -> Self {
        let identity = stream
            .peer_addr()
            .ok()
            .and_then(|addr| addr.as_pathname().map(|p| format!("unix://{}", p.display())))
            .unwrap_or_else(|| "unix://???".to_string());
        Self::new(identity, HandleKind::Unix, stream)
    }

    pub fn from_file(file: File, path: impl AsRef<Path>) -> Self {
        let identity = format!("file://{}", path.as_ref().display());
        Self::new(identity, HandleKind::File, file)
    }

    pub fn stdout() -> Self {
        Self::new("stdout", HandleKind::Stdout, io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new("stderr", HandleKind::Stderr, io::stderr())
    }

    /// Connect to `tcp://host:port`, `host:port` or `unix:///path`.
    ///
    /// `connect_timeout` bounds TCP connects only, since [`UnixStream::connect`] takes no timeout.
    /// `socket_timeout` is applied to reads and writes of the established connection.
    pub fn connect(
        uri: &str,
        connect_timeout: Duration,
        socket_timeout: Duration,
    ) -> Result<Self, Error> {
        let failed = |err: io::Error| {
            Error::connection(format!("Failed connecting to socket \"{uri}\"")).with_source(err)
        };

        if let Some(path) = uri.strip_prefix("unix://") {
            #[cfg(unix)]
            {
                let stream = UnixStream::connect(path).map_err(failed)?;
                stream.set_write_timeout(Some(socket_timeout)).map_err(failed)?;
                stream.set_read_timeout(Some(socket_timeout)).map_err(failed)?;
                return Ok(Self::new(uri, HandleKind::Unix, stream));
            }
            #[cfg(not(unix))]
            {
                let _ = (path, connect_timeout, socket_timeout);
                return Err(Error::configuration(
                    "unix domain sockets are not supported on this platform",
                )
                .with_context("uri", uri));
            }
        }

        let address = match uri.strip_prefix("tcp://") {
            Some(address) => address,
            None if uri.contains("://") => {
                return Err(Error::configuration(format!(
                    "Unsupported socket scheme: \"{uri}\""
                )));
            }
            None => uri,
        };

        let stream = connect_tcp(address, connect_timeout).map_err(failed)?;
        stream.set_write_timeout(Some(socket_timeout)).map_err(failed)?;
        stream.set_read_timeout(Some(socket_timeout)).map_err(failed)?;
        Ok(Self::new(uri, HandleKind::Tcp, stream))
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    pub fn is_closed(&self) -> bool {
        self.sink().is_none()
    }

    /// Flush and release the stream. Closing a closed handle does nothing.
    pub fn close(&self) {
        if let Some(mut sink) = self.sink().take() {
            let _ = sink.flush();
        }
    }

    pub(crate) fn sink(&self) -> MutexGuard<'_, Sink> {
        self.sink.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn connect_tcp(address: &str, timeout: Duration) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in address.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no address resolved for {address}"),
        )
    }))
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::net::TcpListener;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_connect_tcp_and_close() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let addr = listener.local_addr().unwrap();

        let uri = format!("tcp://{addr}");
        let timeout = Duration::from_secs(1);
        let handle = Handle::connect(&uri, timeout, timeout).unwrap();
        assert_eq!(handle.identity(), uri);
        assert_eq!(handle.kind(), HandleKind::Tcp);

        let (mut server, _) = listener.accept().unwrap();
        handle.sink().as_mut().unwrap().write_all(b"ping").unwrap();
        handle.close();
        handle.close();
        assert!(handle.is_closed());

        let mut received = String::new();
        server.read_to_string(&mut received).unwrap();
        assert_eq!(received, "ping");
    }

    #[test]
    fn test_connect_refused() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = Handle::connect(&addr.to_string(), Duration::from_secs(1), Duration::from_secs(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.to_string().contains(&addr.to_string()));
    }

    #[test]
    fn test_connect_unsupported_scheme() {
        let timeout = Duration::from_secs(1);
        let err = Handle::connect("curl://example.com", timeout, timeout).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
