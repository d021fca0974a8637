use crate::context::{ApiVersion, ContextError};

/// Failure of `LoopController::new` or `init`.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("graphics context creation failed")]
    ContextFailed(#[source] ContextError),

    #[error("graphics API version {found} is too old, at least {required} is required")]
    VersionTooOld {
        found: ApiVersion,
        required: ApiVersion,
    },

    #[error("unable to connect to the display server")]
    NoConnection,

    #[error("another loop controller is already registered for signal handling")]
    AlreadyRegistered,

    #[error("failed to spawn the {0} thread")]
    ThreadSpawn(&'static str, #[source] std::io::Error),
}

impl InitError {
    /// Stable numeric code; context failures keep the context's own code.
    pub fn code(&self) -> i32 {
        match self {
            Self::ContextFailed(e) => e.code(),
            Self::VersionTooOld { .. } => -2,
            Self::NoConnection => -1,
            Self::AlreadyRegistered => 10,
            Self::ThreadSpawn(..) => 11,
        }
    }
}

impl From<ContextError> for InitError {
    fn from(error: ContextError) -> Self {
        match error {
            ContextError::ConnectionFailed => Self::NoConnection,
            ContextError::VersionTooOld { found, required } => Self::VersionTooOld { found, required },
            other => Self::ContextFailed(other),
        }
    }
}

/// Why the main loop could not start.
#[derive(Debug, thiserror::Error)]
pub enum NotReady {
    #[error("there is no graphics context; call init first")]
    NoContext,

    #[error("no frame renderer is attached")]
    NoRenderer,

    #[error("the main loop is already running")]
    AlreadyRunning,

    #[error("failed to spawn the {0} thread")]
    ThreadSpawn(&'static str, #[source] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// There was no context to close.
    NothingToDo,
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_errors_map_to_init_errors() {
        assert!(matches!(InitError::from(ContextError::ConnectionFailed), InitError::NoConnection));
        let too_old = InitError::from(ContextError::VersionTooOld {
            found: ApiVersion::new(1, 2),
            required: ApiVersion::new(1, 3),
        });
        assert_eq!(too_old.code(), -2);

        let failed = InitError::from(ContextError::WindowCreationFailed("denied".into()));
        assert_eq!(failed.code(), -4);
        assert!(std::error::Error::source(&failed).is_some());
    }
}
