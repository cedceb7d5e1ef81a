// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IpfbError {
    #[error("Inverse filter coefficients have {taps} taps per branch, but the channelization factor is {channelization_factor}")]
    ChannelizationMismatch {
        taps: usize,
        channelization_factor: usize,
    },

    #[error("Inverse filter coefficients are {branches}x{taps}; there must be at least one branch and one tap")]
    Empty { branches: usize, taps: usize },
}
