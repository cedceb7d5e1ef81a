// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Miscellaneous things.

use std::{thread, time::Duration};

use console::Term;
use crossbeam_channel::{bounded, RecvTimeoutError};
use hifitime::{Epoch, Unit};
use is_terminal::IsTerminal;

/// MWA observation and sub-observation IDs are GPS seconds. Convert one into
/// an [Epoch].
pub(crate) fn gps_id_to_epoch(id: u32) -> Epoch {
    Epoch::from_gpst_seconds(f64::from(id))
}

/// VCS headers carry their start time as whole UNIX seconds plus a
/// millisecond part.
pub(crate) fn unix_time_to_epoch(unix_seconds: u64, unix_millis: u32) -> Epoch {
    Epoch::from_unix_seconds(unix_seconds as f64)
        + hifitime::Duration::from_f64(f64::from(unix_millis), Unit::Millisecond)
}

fn is_a_tty() -> bool {
    std::io::stdout().is_terminal() || std::io::stderr().is_terminal()
}

/// Run `func`, and if it takes more than a couple of seconds, keep telling
/// the user (on an interactive terminal) that we're still waiting for it.
pub(crate) fn expensive_op<F, R>(func: F, wait_message: &str) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    const QUIET_PERIOD: Duration = Duration::from_secs(2);
    const POLL_INTERVAL: Duration = Duration::from_millis(250);

    let (tx, rx) = bounded(1);
    thread::scope(|s| {
        s.spawn(move || tx.send(func()).expect("receiver is not disconnected"));

        let term = is_a_tty().then(Term::stderr);
        let mut waited = Duration::ZERO;
        let mut wait_line_shown = false;
        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(r) => {
                    if let (Some(term), true) = (&term, wait_line_shown) {
                        term.clear_last_lines(1).expect("Couldn't clear line");
                    }
                    return r;
                }
                Err(RecvTimeoutError::Timeout) => {
                    waited += POLL_INTERVAL;
                    let term = match &term {
                        Some(term) if waited >= QUIET_PERIOD => term,
                        _ => continue,
                    };
                    if wait_line_shown {
                        term.clear_last_lines(1).expect("Couldn't clear line");
                    }
                    term.write_line(&format!("{wait_message}: {:.2}s", waited.as_secs_f64()))
                        .expect("Couldn't write line");
                    wait_line_shown = true;
                }
                // The sender only goes away without sending if `func` panicked.
                Err(RecvTimeoutError::Disconnected) => {
                    panic!("{wait_message}: the operation panicked")
                }
            }
        }
    })
}
