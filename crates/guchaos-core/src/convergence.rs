//! Convergence loop: fetch → transform → inject until the pool is full.
//!
//! ```text
//! Checking ──full──────────────────────────────────────────▶ Done
//!    │ not full
//!    ▼
//! Fetching ──▶ Transforming ──▶ Injecting ──▶ Checking (loud)
//! ```
//!
//! Any component error ends the loop immediately; nothing is retried here.
//! The first check is quiet, every later one reports its status line.

use crate::device::PoolDevice;
use crate::error::CycleError;
use crate::http::BatchSource;
use crate::key::Key;
use crate::status::{EntropyStatus, StatusReader, needs_more};
use crate::transform::{TransformMode, transform};

/// Knobs for [`Convergence::run`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopOptions {
    /// Give up after this many fetch cycles. `None` loops until full.
    pub max_cycles: Option<u64>,
    pub mode: TransformMode,
}

/// Progress notifications emitted while the loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    StatusChecked { status: EntropyStatus, quiet: bool },
    Fetched { cycle: u64, len: usize },
    Transformed { cycle: u64, wide: &'a [u32] },
    Injected { cycle: u64, wide: &'a [u32] },
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Completed fetch/transform/inject cycles.
    pub cycles: u64,
    /// The reading that showed the pool full.
    pub status: EntropyStatus,
}

enum Phase {
    Checking { quiet: bool },
    Fetching,
    Transforming(Vec<u16>),
    Injecting(Vec<u32>),
}

/// The whole pipeline, generic over its three side-effecting stages.
pub struct Convergence<S, F, D> {
    status: S,
    source: F,
    device: D,
    key: Key,
    options: LoopOptions,
}

impl<S, F, D> Convergence<S, F, D>
where
    S: StatusReader,
    F: BatchSource,
    D: PoolDevice,
{
    pub fn new(status: S, source: F, device: D, key: Key, options: LoopOptions) -> Self {
        Self {
            status,
            source,
            device,
            key,
            options,
        }
    }

    pub fn status_reader(&self) -> &S {
        &self.status
    }

    pub fn source(&self) -> &F {
        &self.source
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Run until the pool reports full or a stage fails.
    pub fn run(&mut self, mut observe: impl FnMut(Event<'_>)) -> Result<Outcome, CycleError> {
        let mut cycles = 0u64;
        let mut phase = Phase::Checking { quiet: true };

        loop {
            phase = match phase {
                Phase::Checking { quiet } => {
                    let status = self.status.read_status()?;
                    observe(Event::StatusChecked { status, quiet });
                    if !needs_more(&status, quiet) {
                        return Ok(Outcome { cycles, status });
                    }
                    if self.options.max_cycles.is_some_and(|max| cycles >= max) {
                        return Err(CycleError::CycleLimitReached { cycles });
                    }
                    Phase::Fetching
                }
                Phase::Fetching => {
                    let narrow = self.source.fetch_batch()?;
                    cycles += 1;
                    log::debug!("cycle {cycles}: fetched {} integers", narrow.len());
                    observe(Event::Fetched {
                        cycle: cycles,
                        len: narrow.len(),
                    });
                    Phase::Transforming(narrow)
                }
                Phase::Transforming(narrow) => {
                    let wide = transform(narrow, &self.key, self.options.mode);
                    observe(Event::Transformed {
                        cycle: cycles,
                        wide: &wide,
                    });
                    Phase::Injecting(wide)
                }
                Phase::Injecting(wide) => {
                    self.device.inject(&wide)?;
                    observe(Event::Injected {
                        cycle: cycles,
                        wide: &wide,
                    });
                    Phase::Checking { quiet: false }
                }
            };
        }
    }
}
