//! Logical socket channels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One logical socket connection dedicated to a domain.
///
/// Each channel maps to its own server namespace and therefore its own
/// transport connection. Rooms are scoped per channel: joining `field:3`
/// on [`Channel::Fields`] says nothing about membership on [`Channel::Root`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Default namespace: bookings and generic rooms.
    Root,
    /// Field availability namespace.
    Fields,
    /// Per-user notification namespace.
    Notifications,
}

impl Channel {
    /// Every channel, in initialization order.
    pub const ALL: [Channel; 3] = [Channel::Root, Channel::Fields, Channel::Notifications];

    /// Stable lowercase name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Root => "root",
            Channel::Fields => "fields",
            Channel::Notifications => "notifications",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_lists_root_first() {
        assert_eq!(Channel::ALL[0], Channel::Root);
        assert_eq!(Channel::ALL.len(), 3);
    }

    #[test]
    fn display_uses_lowercase_name() {
        assert_eq!(Channel::Notifications.to_string(), "notifications");
        assert_eq!(
            serde_json::to_string(&Channel::Fields).unwrap(),
            r#""fields""#
        );
    }
}
