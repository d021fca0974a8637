use std::fmt;

use serde::{Deserialize, Serialize};

/// Graphics API version reported by a context.
///
/// Ordering compares `major` first, then `minor`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_only_matters_within_a_major() {
        assert!(ApiVersion::new(3, 3) >= ApiVersion::new(3, 3));
        assert!(ApiVersion::new(3, 2) < ApiVersion::new(3, 3));
        assert!(ApiVersion::new(4, 0) > ApiVersion::new(3, 9));
        assert_eq!(ApiVersion::new(4, 5).to_string(), "4.5");
    }
}
