// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for DataFS Core

use libc::c_int;
use std::io;

/// Core filesystem error type
#[derive(thiserror::Error, Debug)]
pub enum FsError {
    #[error("not found")]
    NotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("directory not empty")]
    DirectoryNotEmpty,
    #[error("already exists")]
    AlreadyExists,
    #[error("name not allowed")]
    InvalidName,
    #[error("invalid argument")]
    InvalidArgument,
    /// The operation would grow a file past [`FsLimits::max_file_bytes`](crate::FsLimits).
    #[error("file too large")]
    FileTooLarge,
    /// The dataset contained a value that is neither a mapping nor text.
    #[error("invalid tree shape at {path}: expected a mapping or text, found {found}")]
    InvalidTreeShape { path: String, found: &'static str },
    /// A structural change that would break the tree (a file receiving a
    /// child, or a node moved under its own descendant).
    #[error("illegal tree mutation")]
    IllegalMutation,
    #[error("no such attribute")]
    NoAttribute,
    #[error("unsupported")]
    Unsupported,
    #[error("dataset error: {0}")]
    Dataset(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl FsError {
    /// Errno reported to the kernel for this failure.
    pub fn errno(&self) -> c_int {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::NotADirectory => libc::ENOTDIR,
            FsError::IsADirectory => libc::EISDIR,
            FsError::DirectoryNotEmpty => libc::ENOTEMPTY,
            FsError::AlreadyExists => libc::EEXIST,
            FsError::InvalidName
            | FsError::InvalidArgument
            | FsError::InvalidTreeShape { .. }
            | FsError::IllegalMutation => libc::EINVAL,
            FsError::FileTooLarge => libc::EFBIG,
            FsError::NoAttribute => libc::ENODATA,
            FsError::Unsupported => libc::ENOTSUP,
            FsError::Dataset(_) => libc::EIO,
            FsError::Io(err) => err.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;
