use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const FREE_TAG: &str = "free";
pub const OFF_TAG: &str = "off";
pub const UNKNOWN_TAG: &str = "unknown";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TagColor {
    Success,
    Error,
    Neutral,
    Primary,
    Secondary,
    Info,
    Warning,
}

impl TagColor {
    /// SGR foreground code used by the terminal renderer.
    pub fn ansi_code(self) -> &'static str {
        match self {
            TagColor::Success => "32",
            TagColor::Error => "31",
            TagColor::Neutral => "90",
            TagColor::Primary => "36",
            TagColor::Secondary => "35",
            TagColor::Info => "34",
            TagColor::Warning => "33",
        }
    }
}

/// Stable identifier of a tag. List position is only used for display order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagKey(String);

impl TagKey {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(key.as_ref().trim().to_ascii_lowercase())
    }

    pub fn free() -> Self {
        Self(FREE_TAG.to_string())
    }

    pub fn off() -> Self {
        Self(OFF_TAG.to_string())
    }

    pub fn is_free(&self) -> bool {
        self.0 == FREE_TAG
    }

    pub fn is_off(&self) -> bool {
        self.0 == OFF_TAG
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TagKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub key: TagKey,
    pub name: String,
    #[serde(default)]
    pub color: Option<TagColor>,
}

impl Tag {
    pub fn new(key: impl AsRef<str>, name: impl Into<String>, color: Option<TagColor>) -> Self {
        Self {
            key: TagKey::new(key),
            name: name.into(),
            color,
        }
    }

    /// Placeholder returned when a lookup misses.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_TAG, UNKNOWN_TAG, None)
    }
}

/// Ordered tag list. `free` always sits at position 0 and `off` at position 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<Tag>,
}

impl Default for TagSet {
    fn default() -> Self {
        Self {
            tags: vec![
                Tag::new(FREE_TAG, FREE_TAG, Some(TagColor::Success)),
                Tag::new(OFF_TAG, OFF_TAG, Some(TagColor::Neutral)),
                Tag::new("meeting", "meeting", Some(TagColor::Error)),
            ],
        }
    }
}

impl TagSet {
    pub fn new(tags: Vec<Tag>) -> Self {
        let mut free: Option<Tag> = None;
        let mut off: Option<Tag> = None;
        let mut rest: Vec<Tag> = Vec::with_capacity(tags.len());

        for tag in tags {
            if tag.key.as_str().is_empty() || tag.key.as_str() == UNKNOWN_TAG {
                warn!(key = %tag.key, "ignoring tag with reserved or empty key");
                continue;
            }

            let seen = free.as_ref().is_some_and(|t| t.key == tag.key)
                || off.as_ref().is_some_and(|t| t.key == tag.key)
                || rest.iter().any(|t| t.key == tag.key);
            if seen {
                warn!(key = %tag.key, "duplicate tag key; keeping first definition");
                continue;
            }

            if tag.key.is_free() {
                free = Some(tag);
            } else if tag.key.is_off() {
                off = Some(tag);
            } else {
                rest.push(tag);
            }
        }

        let free = free.unwrap_or_else(|| {
            warn!("no `free` tag defined; inserting default");
            Tag::new(FREE_TAG, FREE_TAG, Some(TagColor::Success))
        });
        let off = off.unwrap_or_else(|| {
            warn!("no `off` tag defined; inserting default");
            Tag::new(OFF_TAG, OFF_TAG, Some(TagColor::Neutral))
        });

        let mut ordered = Vec::with_capacity(rest.len() + 2);
        ordered.push(free);
        ordered.push(off);
        ordered.extend(rest);
        Self { tags: ordered }
    }

    pub fn get(&self, key: &TagKey) -> Option<&Tag> {
        self.tags.iter().find(|tag| &tag.key == key)
    }

    pub fn get_or_unknown(&self, key: &TagKey) -> Tag {
        self.get(key).cloned().unwrap_or_else(Tag::unknown)
    }

    pub fn contains(&self, key: &TagKey) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &TagKey> {
        self.tags.iter().map(|tag| &tag.key)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_tags_are_moved_to_front() {
        let tags = TagSet::new(vec![
            Tag::new("meeting", "Meeting", Some(TagColor::Error)),
            Tag::new("off", "Off", None),
            Tag::new("gym", "Gym", Some(TagColor::Info)),
        ]);

        let keys: Vec<&str> = tags.keys().map(TagKey::as_str).collect();
        assert_eq!(keys, vec!["free", "off", "meeting", "gym"]);
        assert_eq!(tags.get(&TagKey::off()).map(|t| t.name.as_str()), Some("Off"));
    }

    #[test]
    fn duplicates_and_unknown_key_are_dropped() {
        let tags = TagSet::new(vec![
            Tag::new("Meeting", "first", None),
            Tag::new("meeting", "second", None),
            Tag::new("unknown", "nope", None),
        ]);

        assert_eq!(tags.len(), 3);
        assert_eq!(
            tags.get(&TagKey::new("meeting")).map(|t| t.name.as_str()),
            Some("first")
        );
        assert_eq!(tags.get_or_unknown(&TagKey::new("gym")), Tag::unknown());
    }
}
