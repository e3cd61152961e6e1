//! Handler outputs.
//!
//! # Responsibilities
//! - Own the writer behind each configured handler
//! - Flush after every record
//! - Close exactly once; writes after close are dropped
//!
//! # Design Decisions
//! - One mutex per sink; setup and teardown are single-threaded, the lock
//!   only satisfies the `MakeWriter` contract
//! - The TCP sink connects lazily and goes quiet after its first failure so a
//!   dead log server cannot stall the job

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing_subscriber::fmt::MakeWriter;

use crate::config::validation::ConsoleStream;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

enum SinkState {
    Open(Box<dyn Write + Send>),
    Closed,
}

/// A named handler output.
pub struct Sink {
    name: String,
    state: Mutex<SinkState>,
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Sink {
    fn new(name: &str, writer: Box<dyn Write + Send>) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(SinkState::Open(writer)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write one complete record and flush it.
    pub fn write_record(&self, bytes: &[u8]) {
        if let SinkState::Open(writer) = &mut *self.lock() {
            let _ = writer.write_all(bytes).and_then(|_| writer.flush());
        }
    }

    pub fn flush(&self) {
        if let SinkState::Open(writer) = &mut *self.lock() {
            let _ = writer.flush();
        }
    }

    /// Flush and release the writer. Returns `false` if already closed.
    pub fn close(&self) -> bool {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, SinkState::Closed) {
            SinkState::Open(mut writer) => {
                let _ = writer.flush();
                true
            }
            SinkState::Closed => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.lock(), SinkState::Closed)
    }
}

/// Shared handle to a [`Sink`], usable as a tracing writer.
#[derive(Debug, Clone)]
pub struct SinkHandle(Arc<Sink>);

impl SinkHandle {
    pub fn console(name: &str, stream: ConsoleStream) -> Self {
        let writer: Box<dyn Write + Send> = match stream {
            ConsoleStream::Stdout => Box::new(io::stdout()),
            ConsoleStream::Stderr => Box::new(io::stderr()),
        };
        Self(Arc::new(Sink::new(name, writer)))
    }

    /// Open (or create) a log file.
    pub fn file(name: &str, path: &Path, append: bool) -> io::Result<Self> {
        let file: File = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        Ok(Self(Arc::new(Sink::new(name, Box::new(BufWriter::new(file))))))
    }

    /// TCP stream to `host:port`, connected on first write.
    pub fn tcp(name: &str, host: &str, port: u16) -> Self {
        let writer = TcpWriter {
            host: host.to_string(),
            port,
            stream: None,
            disabled: false,
        };
        Self(Arc::new(Sink::new(name, Box::new(writer))))
    }

    pub fn sink(&self) -> &Sink {
        &self.0
    }
}

impl<'a> MakeWriter<'a> for SinkHandle {
    type Writer = SinkWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter(&self.0)
    }
}

/// Per-event writer borrowed from a [`SinkHandle`].
pub struct SinkWriter<'a>(&'a Sink);

impl Write for SinkWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write_record(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush();
        Ok(())
    }
}

struct TcpWriter {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
    disabled: bool,
}

impl TcpWriter {
    fn connect(&self) -> io::Result<TcpStream> {
        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no address resolved");
        for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    fn disable(&mut self, err: &io::Error) {
        eprintln!(
            "log handler {}:{} unavailable, dropping further records: {}",
            self.host, self.port, err
        );
        self.stream = None;
        self.disabled = true;
    }
}

impl Write for TcpWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.disabled {
            return Ok(buf.len());
        }
        if self.stream.is_none() {
            match self.connect() {
                Ok(stream) => self.stream = Some(stream),
                Err(e) => {
                    self.disable(&e);
                    return Ok(buf.len());
                }
            }
        }
        if let Some(stream) = self.stream.as_mut() {
            if let Err(e) = stream.write_all(buf) {
                self.disable(&e);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream.as_mut() {
            Some(stream) => stream.flush(),
            None => Ok(()),
        }
    }
}
