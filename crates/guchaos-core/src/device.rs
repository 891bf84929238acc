//! Pool injector: hand a wide batch to the kernel through `RNDADDENTROPY`.
//!
//! Writing to `/dev/random` mixes bytes in without crediting any entropy;
//! only the ioctl raises `entropy_avail`, and it requires `CAP_SYS_ADMIN`.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::InjectError;

pub const RANDOM_DEVICE_PATH: &str = "/dev/random";

/// `_IOW('R', 0x03, int[2])` from `<linux/random.h>`.
#[cfg(target_os = "linux")]
const RNDADDENTROPY: libc::c_ulong = 0x4008_5203;

/// Anything that accepts a wide batch as new entropy.
pub trait PoolDevice {
    fn inject(&mut self, wide: &[u32]) -> Result<(), InjectError>;
}

/// In-memory image of `struct rand_pool_info`.
///
/// Both declared counts equal the number of wide integers. That is the
/// accounting the device has always been fed: the kernel credits
/// `entropy_count` bits and reads `buf_size` bytes of the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolInjectionRequest {
    pub entropy_count: i32,
    pub buf_size: i32,
    payload: Vec<u32>,
}

impl PoolInjectionRequest {
    pub fn new(wide: &[u32]) -> Self {
        let count = i32::try_from(wide.len()).unwrap_or(i32::MAX);
        Self {
            entropy_count: count,
            buf_size: count,
            payload: wide.to_vec(),
        }
    }

    /// `entropy_count`, `buf_size`, then the payload words, laid out as the
    /// kernel expects them.
    pub fn to_words(&self) -> Vec<u32> {
        let mut words = Vec::with_capacity(self.payload.len() + 2);
        words.push(self.entropy_count as u32);
        words.push(self.buf_size as u32);
        words.extend_from_slice(&self.payload);
        words
    }
}

/// The kernel random device.
#[derive(Debug, Clone)]
pub struct RandomDevice {
    path: PathBuf,
}

impl RandomDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for RandomDevice {
    fn default() -> Self {
        Self::new(RANDOM_DEVICE_PATH)
    }
}

impl PoolDevice for RandomDevice {
    fn inject(&mut self, wide: &[u32]) -> Result<(), InjectError> {
        let request = PoolInjectionRequest::new(wide);
        let device = OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|e| open_error(&self.path, e))?;
        add_entropy(&device, &request).map_err(|e| ioctl_error(&self.path, e))?;
        log::debug!(
            "credited {} bits from {} words to {}",
            request.entropy_count,
            wide.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn open_error(path: &Path, e: io::Error) -> InjectError {
    match e.kind() {
        io::ErrorKind::PermissionDenied => InjectError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => InjectError::DeviceUnavailable {
            path: path.to_path_buf(),
            source: e,
        },
    }
}

/// Missing `CAP_SYS_ADMIN` shows up as `EPERM`; some LSMs answer `EACCES`.
fn ioctl_error(path: &Path, e: io::Error) -> InjectError {
    match e.raw_os_error() {
        Some(libc::EPERM) | Some(libc::EACCES) => InjectError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => InjectError::Rejected {
            path: path.to_path_buf(),
            source: e,
        },
    }
}

#[cfg(target_os = "linux")]
fn add_entropy(device: &std::fs::File, request: &PoolInjectionRequest) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let words = request.to_words();
    // SAFETY: `words` is a live, u32-aligned buffer laid out as
    // `struct rand_pool_info` whose payload is at least `buf_size` bytes long.
    // The fd stays open for the duration of the call.
    let ret = unsafe { libc::ioctl(device.as_raw_fd(), RNDADDENTROPY as _, words.as_ptr()) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn add_entropy(_device: &std::fs::File, _request: &PoolInjectionRequest) -> io::Result<()> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
}
