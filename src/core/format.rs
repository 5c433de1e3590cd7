use serde::{Deserialize, Serialize};

/// The context a value is being serialized for.
///
/// The same logical value may serialize differently per format, and items are
/// free to refuse some formats entirely by producing empty text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SerializeFormat {
    /// Shown to a human. Never read back.
    UserDisplay,
    /// Passed within this process, e.g. across a feature unit reload.
    Internal,
    /// Sent to other servers on the network.
    Network,
    /// Stored on disk.
    Persist,
}

impl SerializeFormat {
    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            SerializeFormat::UserDisplay => "user",
            SerializeFormat::Internal => "internal",
            SerializeFormat::Network => "network",
            SerializeFormat::Persist => "persist",
        }
    }

    /// Whether text produced in this format may ever be unserialized.
    pub fn is_readable(self) -> bool {
        !matches!(self, SerializeFormat::UserDisplay)
    }
}

impl std::fmt::Display for SerializeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_user_display_is_write_only() {
        assert!(!SerializeFormat::UserDisplay.is_readable());
        assert!(SerializeFormat::Internal.is_readable());
        assert!(SerializeFormat::Network.is_readable());
        assert!(SerializeFormat::Persist.is_readable());
    }

    #[test]
    fn test_format_names() {
        assert_eq!(SerializeFormat::Persist.to_string(), "persist");
        assert_eq!(SerializeFormat::UserDisplay.name(), "user");
    }
}
