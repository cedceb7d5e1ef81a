// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to handle reading VCS sub-files and inverse-filter coefficients.

mod capture;
mod coefficients;

pub(crate) use capture::{read_header, CaptureExpectation};
pub use capture::{CaptureReadError, HeaderError, HeaderKey};
pub use capture::{CaptureHeader, ChannelBlock, ChannelStreamReader};
pub use coefficients::{CoefficientsError, InverseFilterCoefficients};
