// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Inverse poly-phase filter bank coefficients.
//!
//! These are stored as a flat, headerless array of little-endian `f32`s,
//! row-major with shape (branches, channelization factor).

use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use ndarray::prelude::*;
use thiserror::Error;

/// A validated (branches × taps) coefficient matrix. The number of taps is
/// always the channelization factor.
#[derive(Debug, Clone, PartialEq)]
pub struct InverseFilterCoefficients {
    matrix: Array2<f32>,
}

impl InverseFilterCoefficients {
    /// Read coefficients from a file.
    pub fn read(
        path: &Path,
        channelization_factor: usize,
    ) -> Result<InverseFilterCoefficients, CoefficientsError> {
        let bytes = std::fs::read(path).map_err(|err| CoefficientsError::IO {
            file: path.to_path_buf(),
            err,
        })?;
        let coeffs = Self::from_bytes(&bytes, channelization_factor).map_err(|e| match e {
            CoefficientsError::Shape {
                num_values,
                channelization_factor,
                ..
            } => CoefficientsError::Shape {
                file: Some(path.to_path_buf()),
                num_values,
                channelization_factor,
            },
            e => e,
        })?;
        debug!(
            "Read {}x{} inverse filter coefficients from {}",
            coeffs.num_branches(),
            coeffs.num_taps(),
            path.display()
        );
        Ok(coeffs)
    }

    pub fn from_bytes(
        bytes: &[u8],
        channelization_factor: usize,
    ) -> Result<InverseFilterCoefficients, CoefficientsError> {
        if bytes.len() % std::mem::size_of::<f32>() != 0 {
            return Err(CoefficientsError::ByteLength { len: bytes.len() });
        }
        let mut values = vec![0.0; bytes.len() / std::mem::size_of::<f32>()];
        LittleEndian::read_f32_into(bytes, &mut values);

        if values.is_empty() || channelization_factor == 0 || values.len() % channelization_factor != 0
        {
            return Err(CoefficientsError::Shape {
                file: None,
                num_values: values.len(),
                channelization_factor,
            });
        }
        let rows = values.len() / channelization_factor;
        let matrix = Array2::from_shape_vec((rows, channelization_factor), values).map_err(|_| {
            CoefficientsError::Shape {
                file: None,
                num_values: rows * channelization_factor,
                channelization_factor,
            }
        })?;
        Self::from_array(matrix, channelization_factor)
    }

    /// Use an existing matrix. Its number of columns must be the
    /// channelization factor.
    pub fn from_array(
        matrix: Array2<f32>,
        channelization_factor: usize,
    ) -> Result<InverseFilterCoefficients, CoefficientsError> {
        let (rows, cols) = matrix.dim();
        if rows == 0 || cols != channelization_factor {
            return Err(CoefficientsError::Dimensions {
                rows,
                cols,
                channelization_factor,
            });
        }
        if let Some(((row, col), value)) = matrix.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(CoefficientsError::NonFinite {
                row,
                col,
                value: *value,
            });
        }
        Ok(InverseFilterCoefficients { matrix })
    }

    /// Coefficients that pass every sample through untouched: each branch
    /// has a single unit tap in its last position.
    pub fn identity(num_branches: usize, num_taps: usize) -> InverseFilterCoefficients {
        let mut matrix = Array2::zeros((num_branches, num_taps));
        if num_taps > 0 {
            matrix.column_mut(num_taps - 1).fill(1.0);
        }
        InverseFilterCoefficients { matrix }
    }

    pub fn num_branches(&self) -> usize {
        self.matrix.len_of(Axis(0))
    }

    pub fn num_taps(&self) -> usize {
        self.matrix.len_of(Axis(1))
    }

    pub fn view(&self) -> ArrayView2<f32> {
        self.matrix.view()
    }
}

#[derive(Error, Debug)]
pub enum CoefficientsError {
    #[error("Inverse filter coefficients have {len} bytes, which is not a whole number of 32-bit floats")]
    ByteLength { len: usize },

    #[error("{}{num_values} inverse filter coefficients is not a positive multiple of the channelization factor ({channelization_factor})",
            file.as_ref().map(|f| format!("{}: ", f.display())).unwrap_or_default())]
    Shape {
        file: Option<PathBuf>,
        num_values: usize,
        channelization_factor: usize,
    },

    #[error("Inverse filter coefficient matrix is {rows}x{cols}, but it must have at least one row and {channelization_factor} columns")]
    Dimensions {
        rows: usize,
        cols: usize,
        channelization_factor: usize,
    },

    #[error("Inverse filter coefficient at row {row}, column {col} is not finite ({value})")]
    NonFinite { row: usize, col: usize, value: f32 },

    #[error("Couldn't read inverse filter coefficients from {}: {err}", file.display())]
    IO { file: PathBuf, err: std::io::Error },
}
