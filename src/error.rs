// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all mwa_tdr-related errors. This should be the *only* error
//! enum that is publicly visible.

use thiserror::Error;

use crate::{
    combine::{CombineError, RemapError},
    io::{
        read::{CaptureReadError, CoefficientsError},
        write::TileWriteError,
        GlobError,
    },
    ipfb::IpfbError,
    metadata::{ArrayConfigError, MetadataError},
    params::ReconstructError,
};

/// The *only* publicly visible error from mwa_tdr. Every failure is fatal for
/// the run; the variant says what kind of problem it was.
#[derive(Error, Debug)]
pub enum TdrError {
    /// The array configuration, the sub-files and the requested observation
    /// disagree on identifiers or channels.
    #[error("{0}")]
    ConfigMismatch(String),

    /// A sub-file header is malformed, or inconsistent with itself or the
    /// other sub-files.
    #[error("{0}")]
    HeaderValidation(String),

    /// A sub-file holds less data than its header declares.
    #[error("{0}\n\nThe sub-file may still be being copied, or the copy may have been interrupted.")]
    TruncatedCapture(String),

    /// The inverse filter coefficients don't have a usable shape.
    #[error("{0}")]
    CoefficientShape(String),

    /// A file or directory couldn't be read or written.
    #[error("{0}")]
    IO(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<ReconstructError> for TdrError {
    fn from(e: ReconstructError) -> Self {
        match e {
            ReconstructError::Metadata(e) => Self::from(e),
            ReconstructError::Remap(e) => Self::from(e),
            ReconstructError::Coefficients(e) => Self::from(e),
            ReconstructError::Ipfb(e) => Self::from(e),
            ReconstructError::Capture(e) => Self::from(e),
            ReconstructError::Combine(e) => Self::from(e),
            ReconstructError::TileWrite(e) => Self::from(e),
        }
    }
}

impl From<MetadataError> for TdrError {
    fn from(e: MetadataError) -> Self {
        let s = e.to_string();
        match e {
            MetadataError::ArrayConfig(e) => Self::from(e),
            MetadataError::Glob(e) => Self::from(e),
            MetadataError::Capture(e) => Self::from(e),
            MetadataError::ObsIdMismatch { .. } | MetadataError::MissingChannelFile { .. } => {
                Self::ConfigMismatch(s)
            }
        }
    }
}

impl From<ArrayConfigError> for TdrError {
    fn from(e: ArrayConfigError) -> Self {
        let s = e.to_string();
        match e {
            // A configuration without channels can't match any sub-files.
            ArrayConfigError::NoChannels(_) => Self::ConfigMismatch(s),
            ArrayConfigError::UnknownFormat(_)
            | ArrayConfigError::Toml { .. }
            | ArrayConfigError::Json { .. }
            | ArrayConfigError::Mwalib(_)
            | ArrayConfigError::NoInputs(_)
            | ArrayConfigError::DuplicateInput { .. }
            | ArrayConfigError::ZeroChannelizationFactor(_)
            | ArrayConfigError::IO { .. } => Self::IO(s),
        }
    }
}

impl From<GlobError> for TdrError {
    fn from(e: GlobError) -> Self {
        Self::IO(e.to_string())
    }
}

impl From<CaptureReadError> for TdrError {
    fn from(e: CaptureReadError) -> Self {
        let s = e.to_string();
        match e {
            CaptureReadError::ObsIdMismatch { .. }
            | CaptureReadError::SubobsIdMismatch { .. }
            | CaptureReadError::ChannelMismatch { .. } => Self::ConfigMismatch(s),

            CaptureReadError::Header { .. }
            | CaptureReadError::HeaderSize { .. }
            | CaptureReadError::UnsupportedBitDepth { .. }
            | CaptureReadError::InputCount { .. }
            | CaptureReadError::FieldDisagreement { .. }
            | CaptureReadError::ZeroField { .. }
            | CaptureReadError::BlockSizeOverflow { .. }
            | CaptureReadError::TransferSizeNotBlockMultiple { .. }
            | CaptureReadError::TooFewBlocks { .. }
            | CaptureReadError::TransferSizeMismatch { .. } => Self::HeaderValidation(s),

            CaptureReadError::Truncated { .. } | CaptureReadError::UnexpectedEnd { .. } => {
                Self::TruncatedCapture(s)
            }

            CaptureReadError::IO { .. } => Self::IO(s),
        }
    }
}

impl From<RemapError> for TdrError {
    fn from(e: RemapError) -> Self {
        Self::ConfigMismatch(e.to_string())
    }
}

impl From<CoefficientsError> for TdrError {
    fn from(e: CoefficientsError) -> Self {
        let s = e.to_string();
        match e {
            CoefficientsError::ByteLength { .. }
            | CoefficientsError::Shape { .. }
            | CoefficientsError::Dimensions { .. }
            | CoefficientsError::NonFinite { .. } => Self::CoefficientShape(s),
            CoefficientsError::IO { .. } => Self::IO(s),
        }
    }
}

impl From<IpfbError> for TdrError {
    fn from(e: IpfbError) -> Self {
        Self::CoefficientShape(e.to_string())
    }
}

impl From<CombineError> for TdrError {
    fn from(e: CombineError) -> Self {
        // Block shapes are checked before anything is combined; any error
        // here is an internal one.
        Self::IO(e.to_string())
    }
}

impl From<TileWriteError> for TdrError {
    fn from(e: TileWriteError) -> Self {
        Self::IO(e.to_string())
    }
}

impl From<std::io::Error> for TdrError {
    fn from(e: std::io::Error) -> Self {
        Self::IO(e.to_string())
    }
}
