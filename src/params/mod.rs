// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameters that have been parsed and are ready to be used directly.
//!
//! The `cli` module holds unparsed, user-facing code; everything that actually
//! happens during a run starts here.

mod reconstruct;

pub use reconstruct::{ReconstructError, ReconstructParams, ReconstructionSummary};
