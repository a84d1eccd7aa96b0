//! Permission check for shared installations
//!
//! Environments are usually installed for a whole group or site. A umask other
//! than `0022` produces files that other users cannot read.

use log::{info, warn};

/// Outcome of inspecting the process umask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UmaskCheck {
    /// `0022`: readable by everyone
    Shared,
    /// `0027`: readable by owner and group only
    GroupOnly,
    /// Anything else
    Other(u32),
}

impl UmaskCheck {
    pub fn classify(mask: u32) -> Self {
        match mask {
            0o022 => UmaskCheck::Shared,
            0o027 => UmaskCheck::GroupOnly,
            other => UmaskCheck::Other(other),
        }
    }
}

/// Read the process umask without changing it
#[cfg(unix)]
pub fn current_umask() -> u32 {
    // SAFETY: umask only swaps the process file mode creation mask; the
    // original value is put back immediately.
    let old = unsafe { libc::umask(0o022) };
    unsafe { libc::umask(old) };
    u32::from(old)
}

/// Log whether the current umask is suitable for a shared installation
#[cfg(unix)]
pub fn check_umask() -> UmaskCheck {
    let check = UmaskCheck::classify(current_umask());
    match check {
        UmaskCheck::Shared => info!("Checked user umask and found no issues (0022)"),
        UmaskCheck::GroupOnly => {
            warn!("User umask only allows owner and group to read the env (0027)")
        }
        UmaskCheck::Other(mask) => warn!(
            "User umask is neither 0022 nor 0027 ({:04o}), check before proceeding",
            mask
        ),
    }
    check
}
