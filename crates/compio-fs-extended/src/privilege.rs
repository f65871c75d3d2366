//! Effective-user privilege probe

/// Whether the current process runs with superuser privileges
///
/// On Unix this is `geteuid() == 0`. Hosts without a uid concept have no
/// way to ask, and report `false`.
#[must_use]
pub fn is_privileged() -> bool {
    #[cfg(unix)]
    {
        nix::unistd::geteuid().is_root()
    }

    #[cfg(not(unix))]
    {
        false
    }
}
