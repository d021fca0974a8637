use super::ApiVersion;

/// Failure while creating a context.
///
/// `code()` keeps the numeric codes callers historically matched on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("unable to connect to the display server")]
    ConnectionFailed,

    #[error("platform version {found} is too old, at least {required} is required")]
    VersionTooOld {
        found: ApiVersion,
        required: ApiVersion,
    },

    #[error("no framebuffer configuration matches the request")]
    NoMatchingFramebuffer,

    #[error("failed to create the window: {0}")]
    WindowCreationFailed(String),

    #[error("failed to create the rendering context: {0}")]
    ContextCreationFailed(String),
}

impl ContextError {
    pub fn code(&self) -> i32 {
        match self {
            Self::ConnectionFailed => -1,
            Self::VersionTooOld { .. } => -2,
            Self::NoMatchingFramebuffer => -3,
            Self::WindowCreationFailed(_) => -4,
            Self::ContextCreationFailed(_) => 3,
        }
    }
}
