//! Random-source client: one plaintext HTTP/1.1 GET to random.org per batch.
//!
//! The request asks for `N` integers in `0..=65535`, one digit run each. The
//! response is read until the peer closes the connection, the header block is
//! skipped and the first `N` digit runs of the body become the batch.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::BATCH_LEN;
use crate::error::{ConfigError, FetchError};

pub const DEFAULT_HOST: &str = "www.random.org";
pub const DEFAULT_PORT: u16 = 80;
pub const INTEGERS_PATH: &str = "/integers/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// A full 1024-integer answer is under 8 KiB; 1 MiB leaves plenty of slack.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

const READ_CHUNK: usize = 4096;
const QUOTA_MARKER: &[u8] = b"Error";
const HEADER_END: &[u8] = b"\r\n\r\n";

/// Anything that can produce a batch of narrow integers.
pub trait BatchSource {
    fn fetch_batch(&mut self) -> Result<Vec<u16>, FetchError>;
}

/// Connection and request settings for [`HttpSource`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub host: String,
    pub port: u16,
    /// Integers requested per batch.
    pub batch_len: usize,
    /// Applied to connect, read and write. `None` (or zero) waits forever.
    pub timeout: Option<Duration>,
    pub max_response_bytes: usize,
    /// Extra connection attempts after a failed connect.
    pub connect_retries: u32,
    /// Delay before the first retry; doubles on every subsequent one.
    pub retry_backoff: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            batch_len: BATCH_LEN,
            timeout: Some(DEFAULT_TIMEOUT),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            connect_retries: 0,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl FetchConfig {
    /// Reject settings that would produce empty or unfoldable batches.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_len < 2 || self.batch_len % 2 != 0 {
            return Err(ConfigError::BatchLen {
                len: self.batch_len,
            });
        }
        Ok(())
    }

    /// Query string asking for `batch_len` integers, 4 columns, plain base 10.
    pub fn query(&self) -> String {
        format!(
            "num={}&min=0&max=65535&col=4&base=10&format=plain&md=new",
            self.batch_len
        )
    }

    /// Full request bytes. The `Host` header is mandatory; some front ends
    /// reject HTTP/1.1 requests without it.
    pub fn request(&self) -> String {
        format!(
            "GET {path}?{query} HTTP/1.1\r\n\
             Host: {host}\r\n\
             User-Agent: guchaos/{version}\r\n\
             Accept: text/plain\r\n\
             Connection: close\r\n\
             \r\n",
            path = INTEGERS_PATH,
            query = self.query(),
            host = self.host,
            version = crate::VERSION,
        )
    }
}

/// [`BatchSource`] backed by a blocking TCP connection per fetch.
#[derive(Debug, Clone, Default)]
pub struct HttpSource {
    config: FetchConfig,
}

impl HttpSource {
    /// Validate `config` and build a source from it. A zero timeout is
    /// treated as no timeout, since std refuses zero durations.
    pub fn new(mut config: FetchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        config.timeout = config.timeout.filter(|t| !t.is_zero());
        Ok(Self { config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn connect_error(&self, source: io::Error) -> FetchError {
        FetchError::Connect {
            host: self.config.host.clone(),
            port: self.config.port,
            source,
        }
    }

    fn connect(&self) -> Result<TcpStream, FetchError> {
        let addrs: Vec<SocketAddr> = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|e| self.connect_error(e))?
            .collect();

        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "host resolved to no address");
        for addr in &addrs {
            let attempt = match self.config.timeout {
                Some(t) => TcpStream::connect_timeout(addr, t),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    log::debug!("connected to {addr}");
                    return Ok(stream);
                }
                Err(e) => {
                    log::debug!("connect to {addr} failed: {e}");
                    last_err = e;
                }
            }
        }
        Err(self.connect_error(last_err))
    }

    fn connect_with_retry(&self) -> Result<TcpStream, FetchError> {
        let mut delay = self.config.retry_backoff;
        let mut attempt = 0;
        loop {
            match self.connect() {
                Ok(stream) => return Ok(stream),
                Err(e) if e.is_retryable() && attempt < self.config.connect_retries => {
                    attempt += 1;
                    log::warn!(
                        "{e}; retry {attempt}/{} in {delay:?}",
                        self.config.connect_retries
                    );
                    std::thread::sleep(delay);
                    delay = delay.saturating_mul(2);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn map_io(&self, e: io::Error) -> FetchError {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => FetchError::Timeout {
                host: self.config.host.clone(),
            },
            _ => FetchError::Io(e),
        }
    }

    /// Send the request and read the whole response.
    fn exchange(&self, mut stream: TcpStream) -> Result<Vec<u8>, FetchError> {
        stream
            .set_read_timeout(self.config.timeout)
            .and_then(|_| stream.set_write_timeout(self.config.timeout))
            .map_err(FetchError::Io)?;

        stream
            .write_all(self.config.request().as_bytes())
            .and_then(|_| stream.flush())
            .map_err(|e| self.map_io(e))?;

        let mut response = Vec::with_capacity(READ_CHUNK * 2);
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.map_io(e)),
            };
            if response.len() + n > self.config.max_response_bytes {
                return Err(FetchError::ResponseTooLarge {
                    limit: self.config.max_response_bytes,
                });
            }
            response.extend_from_slice(&chunk[..n]);
        }
        log::debug!("received {} bytes from {}", response.len(), self.config.host);
        Ok(response)
    }
}

impl BatchSource for HttpSource {
    fn fetch_batch(&mut self) -> Result<Vec<u16>, FetchError> {
        let stream = self.connect_with_retry()?;
        let response = self.exchange(stream)?;
        parse_response(&response, self.config.batch_len)
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Extract `count` narrow integers from a raw HTTP response.
pub fn parse_response(response: &[u8], count: usize) -> Result<Vec<u16>, FetchError> {
    let boundary = find(response, HEADER_END).ok_or(FetchError::MissingBody)?;
    let head = &response[..boundary];
    let raw_body = &response[boundary + HEADER_END.len()..];

    let body = if is_chunked(head) {
        dechunk(raw_body)?
    } else {
        raw_body.to_vec()
    };

    if body.starts_with(QUOTA_MARKER) {
        let message = String::from_utf8_lossy(&body);
        return Err(FetchError::QuotaExceeded {
            message: message.trim_end().to_string(),
        });
    }

    match status_code(head) {
        Some(code) if !(200..300).contains(&code) => {
            return Err(FetchError::HttpStatus { code });
        }
        _ => {}
    }

    parse_integers(&body, count)
}

/// Collect the first `count` maximal runs of ASCII digits, in order.
pub fn parse_integers(body: &[u8], count: usize) -> Result<Vec<u16>, FetchError> {
    let mut values = Vec::with_capacity(count);
    for run in body
        .split(|b| !b.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .take(count)
    {
        let text = String::from_utf8_lossy(run);
        let value = text
            .parse::<u16>()
            .map_err(|_| FetchError::ValueOutOfRange {
                index: values.len(),
                value: text.to_string(),
            })?;
        values.push(value);
    }
    if values.len() < count {
        return Err(FetchError::Parse {
            expected: count,
            found: values.len(),
        });
    }
    Ok(values)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn status_code(head: &[u8]) -> Option<u16> {
    let line = head.split(|&b| b == b'\n').next()?;
    let line = String::from_utf8_lossy(line);
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

fn is_chunked(head: &[u8]) -> bool {
    String::from_utf8_lossy(head).lines().any(|line| {
        line.split_once(':').is_some_and(|(name, value)| {
            name.trim().eq_ignore_ascii_case("transfer-encoding")
                && value.to_ascii_lowercase().contains("chunked")
        })
    })
}

/// Decode a `Transfer-Encoding: chunked` body. Trailers are ignored.
fn dechunk(mut raw: &[u8]) -> Result<Vec<u8>, FetchError> {
    let malformed = || {
        FetchError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            "malformed chunked body",
        ))
    };
    let mut body = Vec::with_capacity(raw.len());
    loop {
        let line_end = find(raw, b"\r\n").ok_or_else(malformed)?;
        let size_line = String::from_utf8_lossy(&raw[..line_end]);
        let size_hex = size_line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_hex, 16).map_err(|_| malformed())?;
        raw = &raw[line_end + 2..];
        if size == 0 {
            return Ok(body);
        }
        if raw.len() < size {
            return Err(malformed());
        }
        body.extend_from_slice(&raw[..size]);
        raw = raw[size..].strip_prefix(b"\r\n").ok_or_else(malformed)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_response(body: &str) -> Vec<u8> {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        )
        .into_bytes()
    }

    #[test]
    fn test_request_has_host_header_and_query() {
        let config = FetchConfig::default();
        let req = config.request();
        assert!(req.starts_with(
            "GET /integers/?num=1024&min=0&max=65535&col=4&base=10&format=plain&md=new HTTP/1.1\r\n"
        ));
        assert!(req.contains("\r\nHost: www.random.org\r\n"));
        assert!(req.contains("\r\nConnection: close\r\n"));
        assert!(req.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_query_follows_batch_len() {
        let config = FetchConfig {
            batch_len: 8,
            ..FetchConfig::default()
        };
        assert!(config.query().starts_with("num=8&"));
    }

    #[test]
    fn test_zero_and_odd_batch_lengths_are_rejected() {
        for len in [0, 1, 3, 1023] {
            let config = FetchConfig {
                batch_len: len,
                ..FetchConfig::default()
            };
            assert_eq!(config.validate(), Err(ConfigError::BatchLen { len }));
            assert!(matches!(
                HttpSource::new(config),
                Err(ConfigError::BatchLen { len: l }) if l == len
            ));
        }
        let config = FetchConfig {
            batch_len: 2,
            ..FetchConfig::default()
        };
        assert!(HttpSource::new(config).is_ok());
    }

    #[test]
    fn test_zero_timeout_means_no_timeout() {
        let config = FetchConfig {
            timeout: Some(Duration::ZERO),
            ..FetchConfig::default()
        };
        let source = HttpSource::new(config).unwrap();
        assert_eq!(source.config().timeout, None);

        let source = HttpSource::new(FetchConfig::default()).unwrap();
        assert_eq!(source.config().timeout, Some(DEFAULT_TIMEOUT));
    }

    #[test]
    fn test_parse_tab_separated_columns() {
        let resp = ok_response("1\t22\t333\t4444\n55555\t0\t65535\t7\n");
        let values = parse_response(&resp, 8).unwrap();
        assert_eq!(values, vec![1, 22, 333, 4444, 55555, 0, 65535, 7]);
    }

    #[test]
    fn test_parse_ignores_digits_in_headers() {
        let resp = b"HTTP/1.1 200 OK\r\nContent-Length: 9999\r\nX-Id: 12345\r\n\r\n4\t5\n".to_vec();
        assert_eq!(parse_response(&resp, 2).unwrap(), vec![4, 5]);
    }

    #[test]
    fn test_parse_takes_only_requested_count() {
        let resp = ok_response("1 2 3 4 5\n");
        assert_eq!(parse_response(&resp, 3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_short_body_is_parse_error() {
        let resp = ok_response("1\t2\t3\n");
        match parse_response(&resp, 4) {
            Err(FetchError::Parse { expected, found }) => {
                assert_eq!(expected, 4);
                assert_eq!(found, 3);
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_out_of_range_value() {
        let resp = ok_response("1\t70000\n");
        assert!(matches!(
            parse_response(&resp, 2),
            Err(FetchError::ValueOutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn test_parse_quota_error_body() {
        let body = "Error: You have used your quota of random bits for today.\n";
        let resp = format!("HTTP/1.1 503 Service Unavailable\r\n\r\n{body}").into_bytes();
        match parse_response(&resp, 4) {
            Err(FetchError::QuotaExceeded { message }) => {
                assert!(message.starts_with("Error: You have used your quota"));
            }
            other => panic!("expected QuotaExceeded, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_quota_error_even_with_200() {
        let resp = ok_response("Error: quota exceeded");
        assert!(matches!(
            parse_response(&resp, 4),
            Err(FetchError::QuotaExceeded { .. })
        ));
    }

    #[test]
    fn test_parse_non_success_status() {
        let resp = b"HTTP/1.1 404 Not Found\r\n\r\n<html>404 1 2 3</html>".to_vec();
        assert!(matches!(
            parse_response(&resp, 3),
            Err(FetchError::HttpStatus { code: 404 })
        ));
    }

    #[test]
    fn test_parse_missing_boundary() {
        let resp = b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n".to_vec();
        assert!(matches!(
            parse_response(&resp, 1),
            Err(FetchError::MissingBody)
        ));
    }

    #[test]
    fn test_parse_chunked_body() {
        // Chunk sizes (hex "a", "7") must not leak into the integers.
        let resp = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
                     a\r\n10\t20\t30\t\n\r\n7\r\n40\t50\t\n\r\n0\r\n\r\n"
            .to_vec();
        assert_eq!(parse_response(&resp, 5).unwrap(), vec![10, 20, 30, 40, 50]);
    }

    #[test]
    fn test_chunk_split_inside_number() {
        let resp = b"HTTP/1.1 200 OK\r\ntransfer-encoding: Chunked\r\n\r\n\
                     3\r\n123\r\n3\r\n45\n\r\n0\r\n\r\n"
            .to_vec();
        assert_eq!(parse_response(&resp, 1).unwrap(), vec![12345]);
    }

    #[test]
    fn test_malformed_chunk_is_error() {
        let resp = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n1\r\n".to_vec();
        assert!(parse_response(&resp, 1).is_err());
    }

    #[test]
    fn test_status_code_parsing() {
        assert_eq!(status_code(b"HTTP/1.1 200 OK"), Some(200));
        assert_eq!(status_code(b"HTTP/1.0 503 Busy\r"), Some(503));
        assert_eq!(status_code(b"garbage"), None);
    }
}
