//! Shared types used by every stage of the derivation pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two kinds of collection entity that own cover art.
///
/// The lowercase name doubles as the URL segment (`/album/...`) and the
/// directory name under the collection root (`{root}/album/...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Album,
    Artist,
}

impl EntityKind {
    /// Every kind, in walk order.
    pub const ALL: [EntityKind; 2] = [EntityKind::Album, EntityKind::Artist];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Album => "album",
            EntityKind::Artist => "artist",
        }
    }

    /// Parse a URL or directory segment. Exact, case-sensitive match.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "album" => Some(EntityKind::Album),
            "artist" => Some(EntityKind::Artist),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_segment(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn segment_match_is_exact() {
        assert_eq!(EntityKind::from_segment("Album"), None);
        assert_eq!(EntityKind::from_segment("albums"), None);
        assert_eq!(EntityKind::from_segment(""), None);
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&EntityKind::Artist).unwrap();
        assert_eq!(json, "\"artist\"");
    }
}
