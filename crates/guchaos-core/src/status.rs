//! Kernel entropy counters: how much is available and how much fits.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::StatusError;

/// Bits of entropy currently credited to the input pool.
pub const ENTROPY_AVAIL_PATH: &str = "/proc/sys/kernel/random/entropy_avail";
/// Size of the input pool in bits.
pub const POOLSIZE_PATH: &str = "/proc/sys/kernel/random/poolsize";

/// Counter files are tiny; anything past this is ignored.
const MAX_COUNTER_LEN: u64 = 15;

/// One fresh reading of the two counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntropyStatus {
    pub available: u64,
    pub capacity: u64,
}

impl EntropyStatus {
    pub fn is_full(&self) -> bool {
        self.available == self.capacity
    }
}

impl std::fmt::Display for EntropyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.available, self.capacity)
    }
}

/// Decide whether another cycle is needed.
///
/// False exactly when the pool reports itself full. With `quiet` unset the
/// reading is also logged as a status line.
pub fn needs_more(status: &EntropyStatus, quiet: bool) -> bool {
    if !quiet {
        log::info!("status: {status}");
    }
    if status.is_full() {
        log::info!("available entropy is at the maximum ({})", status.capacity);
        return false;
    }
    true
}

/// Anything that can report the current pool status.
pub trait StatusReader {
    /// Read both counters. No caching: every call hits the source again.
    fn read_status(&mut self) -> Result<EntropyStatus, StatusError>;
}

/// Reads the counters from procfs (or any pair of files in the same format).
#[derive(Debug, Clone)]
pub struct ProcStatusReader {
    available_path: PathBuf,
    capacity_path: PathBuf,
}

impl ProcStatusReader {
    pub fn new(available_path: impl Into<PathBuf>, capacity_path: impl Into<PathBuf>) -> Self {
        Self {
            available_path: available_path.into(),
            capacity_path: capacity_path.into(),
        }
    }
}

impl Default for ProcStatusReader {
    fn default() -> Self {
        Self::new(ENTROPY_AVAIL_PATH, POOLSIZE_PATH)
    }
}

impl StatusReader for ProcStatusReader {
    fn read_status(&mut self) -> Result<EntropyStatus, StatusError> {
        let available = read_counter(&self.available_path)?;
        let capacity = read_counter(&self.capacity_path)?;
        log::debug!("entropy counters: available={available} capacity={capacity}");
        Ok(EntropyStatus {
            available,
            capacity,
        })
    }
}

/// Read a single newline-terminated decimal counter.
pub fn read_counter(path: &Path) -> Result<u64, StatusError> {
    let unavailable = |source| StatusError::Unavailable {
        path: path.to_path_buf(),
        source,
    };
    let mut raw = String::new();
    File::open(path)
        .and_then(|f| f.take(MAX_COUNTER_LEN).read_to_string(&mut raw))
        .map_err(unavailable)?;
    parse_counter(&raw).ok_or_else(|| {
        unavailable(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("not a decimal counter: {:?}", raw.trim()),
        ))
    })
}

/// Parse the leading decimal digits of a counter, ignoring surrounding whitespace.
pub fn parse_counter(raw: &str) -> Option<u64> {
    let trimmed = raw.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}
