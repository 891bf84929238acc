//! # guchaos-core
//!
//! **Give us chaos.**
//!
//! `guchaos-core` tops up the Linux kernel entropy pool with integers fetched
//! from random.org. Each cycle pulls 1024 16-bit integers over plain HTTP,
//! runs them through a keyed polynumeric substitution, folds pairs into
//! 32-bit words and credits them to `/dev/random` with `RNDADDENTROPY`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use guchaos_core::{
//!     Convergence, HttpSource, Key, LoopOptions, ProcStatusReader, RandomDevice, DEFAULT_KEY,
//! };
//!
//! let key = Key::parse(DEFAULT_KEY).expect("valid key");
//! let mut feeder = Convergence::new(
//!     ProcStatusReader::default(),
//!     HttpSource::default(),
//!     RandomDevice::default(),
//!     key,
//!     LoopOptions::default(),
//! );
//! let outcome = feeder.run(|_| {}).expect("pool filled");
//! println!("full after {} cycles ({})", outcome.cycles, outcome.status);
//! ```
//!
//! ## Architecture
//!
//! Status check → HTTP fetch → substitute + fold → ioctl → status check …
//!
//! The substitution is reversible and adds nothing cryptographically; the
//! data is only as good as the remote source and the plaintext link to it.
//!
//! Each side-effecting stage sits behind a trait ([`StatusReader`],
//! [`BatchSource`], [`PoolDevice`]) so the loop can run against scripted
//! implementations.

pub mod convergence;
pub mod device;
pub mod error;
pub mod http;
pub mod key;
pub mod status;
pub mod transform;

pub use convergence::{Convergence, Event, LoopOptions, Outcome};
pub use device::{PoolDevice, PoolInjectionRequest, RANDOM_DEVICE_PATH, RandomDevice};
pub use error::{ConfigError, CycleError, FetchError, InjectError, KeyError, StatusError};
pub use http::{BatchSource, FetchConfig, HttpSource, parse_integers, parse_response};
pub use key::{DEFAULT_KEY, Key};
pub use status::{
    ENTROPY_AVAIL_PATH, EntropyStatus, POOLSIZE_PATH, ProcStatusReader, StatusReader, needs_more,
};
pub use transform::{TransformMode, fold, reverse_substitute, substitute, transform};

/// Narrow integers requested per cycle.
pub const BATCH_LEN: usize = 1024;

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
