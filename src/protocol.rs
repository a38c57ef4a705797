//! Fixed-size binary records exchanged over the channels.
//!
//! Every integer is little-endian. Path fields are NUL-padded byte arrays
//! of [`MAX_PATH`] bytes; the value ends at the first NUL, so at most
//! `MAX_PATH - 1` bytes of content fit.
//!
//! ```text
//! Request  (524 bytes): kind u32 | path [u8; 256] | reply_channel [u8; 256] | declared_size i64
//! Response  (70 bytes): status i32 | from_cache u8 | hash [u8; 65]
//! ```

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::error::{HashqError, Result};

pub const MAX_PATH: usize = 256;

/// 64 hex characters plus the terminating NUL.
pub const HASH_FIELD_LEN: usize = 65;

pub const REQUEST_LEN: usize = 4 + MAX_PATH + MAX_PATH + 8;
pub const RESPONSE_LEN: usize = 4 + 1 + HASH_FIELD_LEN;

/// Hash value sent back when the target file could not be hashed.
pub const FILE_NOT_FOUND_SENTINEL: &str = "ERROR_FILE_NOT_FOUND";

/// Sole line of a cache listing when there is nothing cached.
pub const EMPTY_CACHE_LINE: &str = "cache is empty";

const KIND_COMPUTE: u32 = 1;
const KIND_QUERY_CACHE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Compute,
    QueryCache,
    /// A code this server does not understand. Kept so the dispatcher can
    /// decide what to do with it instead of failing the decode.
    Unknown(u32),
}

impl RequestKind {
    fn code(self) -> u32 {
        match self {
            RequestKind::Compute => KIND_COMPUTE,
            RequestKind::QueryCache => KIND_QUERY_CACHE,
            RequestKind::Unknown(code) => code,
        }
    }

    fn from_code(code: u32) -> Self {
        match code {
            KIND_COMPUTE => RequestKind::Compute,
            KIND_QUERY_CACHE => RequestKind::QueryCache,
            other => RequestKind::Unknown(other),
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKind::Compute => write!(f, "compute"),
            RequestKind::QueryCache => write!(f, "query_cache"),
            RequestKind::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub kind: RequestKind,
    pub path: PathBuf,
    pub reply_channel: PathBuf,
    /// Client-asserted size of the target. Only used to rank admission.
    pub declared_size: i64,
}

impl Request {
    pub fn compute(
        path: impl Into<PathBuf>,
        reply_channel: impl Into<PathBuf>,
        declared_size: i64,
    ) -> Self {
        Self {
            kind: RequestKind::Compute,
            path: path.into(),
            reply_channel: reply_channel.into(),
            declared_size,
        }
    }

    pub fn query_cache(reply_channel: impl Into<PathBuf>) -> Self {
        Self {
            kind: RequestKind::QueryCache,
            path: PathBuf::new(),
            reply_channel: reply_channel.into(),
            declared_size: 0,
        }
    }

    pub fn encode(&self) -> Result<[u8; REQUEST_LEN]> {
        let mut buf = [0u8; REQUEST_LEN];
        buf[0..4].copy_from_slice(&self.kind.code().to_le_bytes());
        write_path_field(&mut buf[4..4 + MAX_PATH], &self.path, "path")?;
        write_path_field(
            &mut buf[4 + MAX_PATH..4 + 2 * MAX_PATH],
            &self.reply_channel,
            "reply_channel",
        )?;
        buf[4 + 2 * MAX_PATH..].copy_from_slice(&self.declared_size.to_le_bytes());
        Ok(buf)
    }

    pub fn decode(buf: &[u8; REQUEST_LEN]) -> Self {
        let mut code = [0u8; 4];
        code.copy_from_slice(&buf[0..4]);
        let mut size = [0u8; 8];
        size.copy_from_slice(&buf[4 + 2 * MAX_PATH..]);

        Self {
            kind: RequestKind::from_code(u32::from_le_bytes(code)),
            path: read_path_field(&buf[4..4 + MAX_PATH]),
            reply_channel: read_path_field(&buf[4 + MAX_PATH..4 + 2 * MAX_PATH]),
            declared_size: i64::from_le_bytes(size),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Ok,
    FileNotFound,
    /// The file existed when checked but could not be read.
    Unreadable,
}

impl ResponseStatus {
    pub fn code(self) -> i32 {
        match self {
            ResponseStatus::Ok => 0,
            ResponseStatus::FileNotFound => 1,
            ResponseStatus::Unreadable => 2,
        }
    }

    /// Unrecognised codes are reported as `Unreadable` so the client still
    /// treats the hash as unusable.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ResponseStatus::Ok,
            1 => ResponseStatus::FileNotFound,
            _ => ResponseStatus::Unreadable,
        }
    }
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseStatus::Ok => write!(f, "ok"),
            ResponseStatus::FileNotFound => write!(f, "file_not_found"),
            ResponseStatus::Unreadable => write!(f, "unreadable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: ResponseStatus,
    pub from_cache: bool,
    pub hash: String,
}

impl Response {
    pub fn computed(hash: String) -> Self {
        Self {
            status: ResponseStatus::Ok,
            from_cache: false,
            hash,
        }
    }

    pub fn cached(hash: String) -> Self {
        Self {
            status: ResponseStatus::Ok,
            from_cache: true,
            hash,
        }
    }

    pub fn not_found() -> Self {
        Self::failed(ResponseStatus::FileNotFound)
    }

    pub fn unreadable() -> Self {
        Self::failed(ResponseStatus::Unreadable)
    }

    fn failed(status: ResponseStatus) -> Self {
        Self {
            status,
            from_cache: false,
            hash: FILE_NOT_FOUND_SENTINEL.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }

    pub fn encode(&self) -> [u8; RESPONSE_LEN] {
        let mut buf = [0u8; RESPONSE_LEN];
        buf[0..4].copy_from_slice(&self.status.code().to_le_bytes());
        buf[4] = u8::from(self.from_cache);
        // Hashes and the sentinel are ASCII and always shorter than the field.
        let hash = self.hash.as_bytes();
        let len = hash.len().min(HASH_FIELD_LEN - 1);
        buf[5..5 + len].copy_from_slice(&hash[..len]);
        buf
    }

    pub fn decode(buf: &[u8; RESPONSE_LEN]) -> Self {
        let mut status = [0u8; 4];
        status.copy_from_slice(&buf[0..4]);
        let field = &buf[5..];
        let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());

        Self {
            status: ResponseStatus::from_code(i32::from_le_bytes(status)),
            from_cache: buf[4] != 0,
            hash: String::from_utf8_lossy(&field[..end]).into_owned(),
        }
    }
}

/// One line of a cache listing, without the trailing newline.
pub fn listing_line(path: &Path, hash: &str) -> String {
    format!("{} | {}", path.display(), hash)
}

fn write_path_field(field: &mut [u8], path: &Path, name: &'static str) -> Result<()> {
    let bytes = path.as_os_str().as_bytes();
    if bytes.len() >= field.len() {
        return Err(HashqError::FieldTooLong {
            field: name,
            len: bytes.len(),
            max: field.len() - 1,
        });
    }
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(())
}

fn read_path_field(field: &[u8]) -> PathBuf {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    PathBuf::from(OsStr::from_bytes(&field[..end]))
}
