/// Data structures for Emoji Hoard
use serde::{Deserialize, Serialize};

/// Reserved id of the system favorites group
pub const FAVORITES_GROUP_ID: &str = "favorites";

/// A single emoji image reference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Emoji {
    pub id: String,
    pub group_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_url: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<i64>,
    /// Id of the canonical emoji this entry aliases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perceptual_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet: Option<i64>,
}

impl Emoji {
    pub fn is_alias(&self) -> bool {
        self.reference_id.is_some()
    }
}

/// A named, ordered collection of emojis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmojiGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub emojis: Vec<Emoji>,
}

impl EmojiGroup {
    pub fn new(id: String, name: String, icon: String, order: u32) -> EmojiGroup {
        EmojiGroup {
            id,
            name,
            icon,
            order,
            emojis: Vec::new(),
        }
    }

    pub fn is_favorites(&self) -> bool {
        self.id == FAVORITES_GROUP_ID
    }

    pub fn position_of(&self, emoji_id: &str) -> Option<usize> {
        self.emojis.iter().position(|e| e.id == emoji_id)
    }
}

/// Everything an emoji carries except the ids the store assigns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EmojiDraft {
    pub url: String,
    pub name: String,
    pub display_url: Option<String>,
    pub tags: Vec<String>,
    pub origin_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub packet: Option<i64>,
    pub perceptual_hash: Option<String>,
}

impl EmojiDraft {
    pub fn new(url: &str, name: &str) -> EmojiDraft {
        EmojiDraft {
            url: url.to_string(),
            name: name.to_string(),
            ..EmojiDraft::default()
        }
    }

    pub fn into_emoji(self, id: String, group_id: String) -> Emoji {
        Emoji {
            id,
            group_id,
            url: self.url,
            display_url: self.display_url,
            name: self.name,
            // Blank tags never reach storage
            tags: self.tags.into_iter().filter(|t| !t.trim().is_empty()).collect(),
            origin_url: self.origin_url,
            width: self.width,
            height: self.height,
            packet: self.packet,
            perceptual_hash: self.perceptual_hash,
            ..Emoji::default()
        }
    }
}

/// Partial update for an emoji; `None` leaves a field untouched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EmojiPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub display_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub usage_count: Option<u32>,
    pub last_used: Option<i64>,
    pub reference_id: Option<String>,
    pub perceptual_hash: Option<String>,
    pub origin_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl EmojiPatch {
    pub fn apply_to(&self, emoji: &mut Emoji) {
        if let Some(name) = &self.name {
            emoji.name = name.clone();
        }
        if let Some(url) = &self.url {
            emoji.url = url.clone();
        }
        if let Some(display_url) = &self.display_url {
            emoji.display_url = Some(display_url.clone());
        }
        if let Some(tags) = &self.tags {
            emoji.tags = tags.clone();
        }
        if let Some(count) = self.usage_count {
            emoji.usage_count = Some(count);
        }
        if let Some(last_used) = self.last_used {
            emoji.last_used = Some(last_used);
        }
        if let Some(reference_id) = &self.reference_id {
            emoji.reference_id = Some(reference_id.clone());
        }
        if let Some(hash) = &self.perceptual_hash {
            emoji.perceptual_hash = Some(hash.clone());
        }
        if let Some(origin_url) = &self.origin_url {
            emoji.origin_url = Some(origin_url.clone());
        }
        if let Some(width) = self.width {
            emoji.width = Some(width);
        }
        if let Some(height) = self.height {
            emoji.height = Some(height);
        }
    }
}

/// Partial update for a group's metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub order: Option<u32>,
}

/// One row of the persisted group index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupIndexEntry {
    pub id: String,
    pub order: u32,
}

/// One member of a cross-group duplicate set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateEntry {
    pub emoji: Emoji,
    pub group_id: String,
}
