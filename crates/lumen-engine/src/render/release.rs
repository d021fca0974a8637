/// Outcome of releasing a GPU resource.
///
/// Numeric codes follow the legacy convention: negative values are warnings
/// (the resource is gone), `0` means the object is unusable, `1` is a clean
/// release and anything above `1` means nothing was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Clean,
    CleanWithWarnings(i32),
    NotReleased(i32),
    Corrupted,
}

impl ReleaseOutcome {
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Clean,
            0 => Self::Corrupted,
            c if c < 0 => Self::CleanWithWarnings(c),
            c => Self::NotReleased(c),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Clean => 1,
            Self::Corrupted => 0,
            Self::CleanWithWarnings(c) | Self::NotReleased(c) => c,
        }
    }

    /// Whether the resource no longer exists on the device.
    pub fn is_released(self) -> bool {
        matches!(self, Self::Clean | Self::CleanWithWarnings(_))
    }

    fn rank(self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::CleanWithWarnings(_) => 1,
            Self::NotReleased(_) => 2,
            Self::Corrupted => 3,
        }
    }

    /// The more severe of two outcomes; the first wins ties.
    pub fn worst(self, other: Self) -> Self {
        if other.rank() > self.rank() { other } else { self }
    }
}
