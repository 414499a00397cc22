//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of mail-backup.
//
// mail-backup is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// mail-backup is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along with
// mail-backup. If not, see <http://www.gnu.org/licenses/>.

//! Cooperative cancellation.
//!
//! A `Cancellation` is a shared flag which is polled at safe points. The
//! SIGINT/SIGTERM handler does nothing but set it; everything else (logging,
//! stopping the loop) happens on the main thread when it next looks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};

use lazy_static::lazy_static;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

#[derive(Clone, Debug, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. There is no way to undo this.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

lazy_static! {
    // Only the signal handler reads this. It must be initialised before the
    // handler is installed so that the handler never runs the lazy init.
    static ref SIGNAL_TARGET: Cancellation = Cancellation::new();
}

static INSTALL: Once = Once::new();

extern "C" fn on_shutdown_signal(_: nix::libc::c_int) {
    SIGNAL_TARGET.cancel();
}

/// Install handlers for SIGINT and SIGTERM and return the token they cancel.
///
/// Calling this more than once returns clones of the same token.
pub fn install_signal_handlers() -> nix::Result<Cancellation> {
    let target = Cancellation::clone(&SIGNAL_TARGET);
    let mut result = Ok(());

    INSTALL.call_once(|| {
        // SA_RESTART so a blocking read on the IMAP connection is resumed
        // rather than failing with EINTR; the flag is checked afterwards.
        let action = SigAction::new(
            SigHandler::Handler(on_shutdown_signal),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );

        for &sig in &[Signal::SIGINT, Signal::SIGTERM] {
            // Safe because the handler only performs an atomic store.
            if let Err(e) = unsafe { signal::sigaction(sig, &action) } {
                result = Err(e);
                return;
            }
        }
    });

    result.map(|_| target)
}
