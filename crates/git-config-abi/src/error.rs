//! Native status codes and error classes.
//!
//! Every call that crosses the native boundary reports its outcome as a
//! `c_int` status plus, for failures, an out-of-band error string tagged with
//! an [`ErrorClass`]. This module gives those raw values names.

use std::ffi::c_int;
use std::fmt;
use thiserror::Error;

/// Status codes returned by config backend callbacks.
///
/// These values correspond to `git_error_code` in the native headers.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Ok = 0,
    GenericError = -1,
    NotFound = -3,
    Exists = -4,
    Ambiguous = -5,
    BufferTooShort = -6,
    User = -7,
    BareRepo = -8,
    UnbornBranch = -9,
    Unmerged = -10,
    NonFastForward = -11,
    InvalidSpec = -12,
    Conflict = -13,
    Locked = -14,
    Modified = -15,
    Auth = -16,
    Certificate = -17,
    Applied = -18,
    Peel = -19,
    Eof = -20,
    Invalid = -21,
    Uncommitted = -22,
    Directory = -23,
    MergeConflict = -24,
    Passthrough = -30,
    IterOver = -31,
    Retry = -32,
    Mismatch = -33,
    IndexDirty = -34,
    ApplyFail = -35,
    Owner = -36,
    Timeout = -37,
}

impl ErrorCode {
    /// Maps a raw status to a known code.
    ///
    /// Returns `None` for values this crate has no name for; callers that
    /// must preserve such values should keep the raw integer.
    pub fn from_raw(status: c_int) -> Option<Self> {
        let code = match status {
            0 => ErrorCode::Ok,
            -1 => ErrorCode::GenericError,
            -3 => ErrorCode::NotFound,
            -4 => ErrorCode::Exists,
            -5 => ErrorCode::Ambiguous,
            -6 => ErrorCode::BufferTooShort,
            -7 => ErrorCode::User,
            -8 => ErrorCode::BareRepo,
            -9 => ErrorCode::UnbornBranch,
            -10 => ErrorCode::Unmerged,
            -11 => ErrorCode::NonFastForward,
            -12 => ErrorCode::InvalidSpec,
            -13 => ErrorCode::Conflict,
            -14 => ErrorCode::Locked,
            -15 => ErrorCode::Modified,
            -16 => ErrorCode::Auth,
            -17 => ErrorCode::Certificate,
            -18 => ErrorCode::Applied,
            -19 => ErrorCode::Peel,
            -20 => ErrorCode::Eof,
            -21 => ErrorCode::Invalid,
            -22 => ErrorCode::Uncommitted,
            -23 => ErrorCode::Directory,
            -24 => ErrorCode::MergeConflict,
            -30 => ErrorCode::Passthrough,
            -31 => ErrorCode::IterOver,
            -32 => ErrorCode::Retry,
            -33 => ErrorCode::Mismatch,
            -34 => ErrorCode::IndexDirty,
            -35 => ErrorCode::ApplyFail,
            -36 => ErrorCode::Owner,
            -37 => ErrorCode::Timeout,
            _ => return None,
        };
        Some(code)
    }

    /// Returns the raw status value.
    pub fn raw(self) -> c_int {
        self as c_int
    }

    /// Returns true if the code indicates success.
    pub fn is_success(self) -> bool {
        self == ErrorCode::Ok
    }

    /// Converts to a Result, returning Ok(()) for success.
    pub fn into_result(self) -> Result<(), StatusError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(StatusError { status: self.raw() })
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::Ok => "GIT_OK",
            ErrorCode::GenericError => "GIT_ERROR",
            ErrorCode::NotFound => "GIT_ENOTFOUND",
            ErrorCode::Exists => "GIT_EEXISTS",
            ErrorCode::Ambiguous => "GIT_EAMBIGUOUS",
            ErrorCode::BufferTooShort => "GIT_EBUFS",
            ErrorCode::User => "GIT_EUSER",
            ErrorCode::BareRepo => "GIT_EBAREREPO",
            ErrorCode::UnbornBranch => "GIT_EUNBORNBRANCH",
            ErrorCode::Unmerged => "GIT_EUNMERGED",
            ErrorCode::NonFastForward => "GIT_ENONFASTFORWARD",
            ErrorCode::InvalidSpec => "GIT_EINVALIDSPEC",
            ErrorCode::Conflict => "GIT_ECONFLICT",
            ErrorCode::Locked => "GIT_ELOCKED",
            ErrorCode::Modified => "GIT_EMODIFIED",
            ErrorCode::Auth => "GIT_EAUTH",
            ErrorCode::Certificate => "GIT_ECERTIFICATE",
            ErrorCode::Applied => "GIT_EAPPLIED",
            ErrorCode::Peel => "GIT_EPEEL",
            ErrorCode::Eof => "GIT_EEOF",
            ErrorCode::Invalid => "GIT_EINVALID",
            ErrorCode::Uncommitted => "GIT_EUNCOMMITTED",
            ErrorCode::Directory => "GIT_EDIRECTORY",
            ErrorCode::MergeConflict => "GIT_EMERGECONFLICT",
            ErrorCode::Passthrough => "GIT_PASSTHROUGH",
            ErrorCode::IterOver => "GIT_ITEROVER",
            ErrorCode::Retry => "GIT_RETRY",
            ErrorCode::Mismatch => "GIT_EMISMATCH",
            ErrorCode::IndexDirty => "GIT_EINDEXDIRTY",
            ErrorCode::ApplyFail => "GIT_EAPPLYFAIL",
            ErrorCode::Owner => "GIT_EOWNER",
            ErrorCode::Timeout => "GIT_TIMEOUT",
        };
        write!(f, "{}", s)
    }
}

/// Error categories attached to the native last-error string.
///
/// These values correspond to `git_error_t` in the native headers.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    None = 0,
    NoMemory = 1,
    Os = 2,
    Invalid = 3,
    Reference = 4,
    Zlib = 5,
    Repository = 6,
    Config = 7,
    Regex = 8,
    Odb = 9,
    Index = 10,
    Object = 11,
    Net = 12,
    Tag = 13,
    Tree = 14,
    Indexer = 15,
    Ssl = 16,
    Submodule = 17,
    Thread = 18,
    Stash = 19,
    Checkout = 20,
    FetchHead = 21,
    Merge = 22,
    Ssh = 23,
    Filter = 24,
    Revert = 25,
    Callback = 26,
    CherryPick = 27,
    Describe = 28,
    Rebase = 29,
    Filesystem = 30,
    Patch = 31,
    Worktree = 32,
    Sha = 33,
    Http = 34,
    Internal = 35,
}

impl ErrorClass {
    /// Returns the raw class value.
    pub fn raw(self) -> c_int {
        self as c_int
    }
}

/// A non-zero status returned by a native call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("native call failed with status {status}")]
pub struct StatusError {
    /// The raw status, kept verbatim.
    pub status: c_int,
}

impl StatusError {
    /// Returns the named code for this status, if known.
    pub fn code(&self) -> Option<ErrorCode> {
        ErrorCode::from_raw(self.status)
    }
}

/// Extension trait for converting raw native status codes.
pub trait StatusExt {
    /// Converts a raw status code to a Result.
    fn to_result(self) -> Result<(), StatusError>;
}

impl StatusExt for c_int {
    fn to_result(self) -> Result<(), StatusError> {
        if self == 0 {
            Ok(())
        } else {
            Err(StatusError { status: self })
        }
    }
}
