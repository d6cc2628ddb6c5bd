//! Elevated-privilege check.
//!
//! Key injection into other applications needs an elevated process on at
//! least one supported platform, so a run refuses to start without it.

/// Returns true when the process runs as root (Unix) or as an
/// administrator (Windows).
#[cfg(unix)]
pub fn is_elevated() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(target_os = "windows")]
pub fn is_elevated() -> bool {
    // SAFETY: IsUserAnAdmin takes no arguments and only reads the token.
    unsafe { windows::Win32::UI::Shell::IsUserAnAdmin().as_bool() }
}

#[cfg(not(any(unix, target_os = "windows")))]
pub fn is_elevated() -> bool {
    false
}

/// Operator-facing explanation shown when the check fails.
pub const ELEVATION_REQUIRED: &str = "For the page-turning feature to work correctly, \
please run this application as an administrator (root).";
