//! Shared syscall plumbing

/// Error returned on hosts without the requested primitive
#[cfg(not(unix))]
pub(crate) fn unsupported() -> std::io::Error {
    std::io::Error::from(std::io::ErrorKind::Unsupported)
}

/// Run a cheap syscall either inline or on the blocking pool
macro_rules! cheap_call {
    ($operation:expr) => {{
        #[cfg(feature = "cheap_calls_sync")]
        {
            ($operation)()
        }

        #[cfg(not(feature = "cheap_calls_sync"))]
        {
            compio::runtime::spawn_blocking($operation)
                .await
                .map_err(|_| std::io::Error::other("blocking syscall task panicked"))?
        }
    }};
}

pub(crate) use cheap_call;
