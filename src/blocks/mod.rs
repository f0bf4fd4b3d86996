use crate::models::{BlockPayload, BlockRecord, FavoriteBlock};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Client-local block identity.
///
/// Minted from a per-session counter, so keys are unique for the lifetime of the page
/// but carry no meaning across persistence round-trips. Server identities live in
/// `models` and are never derived from these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey(u64);

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

impl BlockKey {
    pub fn mint() -> Self {
        BlockKey(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block-{}", self.0)
    }
}

/// Rendering category of a block. Free-form on the wire; unset means `text`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockType(String);

impl BlockType {
    pub const TEXT: &'static str = "text";

    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if tag.trim().is_empty() {
            Self::default()
        } else {
            BlockType(tag.trim().to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_text(&self) -> bool {
        self.0 == Self::TEXT
    }
}

impl Default for BlockType {
    fn default() -> Self {
        BlockType(Self::TEXT.to_string())
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BlockType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BlockType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(BlockType::new).unwrap_or_default())
    }
}

/// The content fields a new block is created from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockSeed {
    pub title: String,
    pub content: String,
    pub block_type: BlockType,
    pub page_break_before: bool,
}

impl From<&FavoriteBlock> for BlockSeed {
    fn from(f: &FavoriteBlock) -> Self {
        Self {
            title: f.title.clone(),
            content: f.content.clone(),
            block_type: f.block_type.clone(),
            page_break_before: f.page_break_before,
        }
    }
}

impl From<&BlockRecord> for BlockSeed {
    fn from(r: &BlockRecord) -> Self {
        Self {
            title: r.title.clone(),
            content: r.content.clone(),
            block_type: r.block_type.clone(),
            page_break_before: r.page_break_before,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub key: BlockKey,
    pub title: String,
    pub content: String,
    pub block_type: BlockType,
    pub page_break_before: bool,
    pub order: u32,
}

impl Block {
    pub fn from_seed(seed: BlockSeed, order: u32) -> Self {
        Self {
            key: BlockKey::mint(),
            title: seed.title,
            content: seed.content,
            block_type: seed.block_type,
            page_break_before: seed.page_break_before,
            order,
        }
    }

    /// True when neither title nor content carries anything worth keeping.
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }

    pub fn seed(&self) -> BlockSeed {
        BlockSeed {
            title: self.title.clone(),
            content: self.content.clone(),
            block_type: self.block_type.clone(),
            page_break_before: self.page_break_before,
        }
    }

    pub fn to_payload(&self) -> BlockPayload {
        BlockPayload {
            title: self.title.clone(),
            content: self.content.clone(),
            order: self.order,
            block_type: self.block_type.clone(),
            page_break_before: self.page_break_before,
        }
    }

    pub fn apply(&mut self, field: BlockField) {
        match field {
            BlockField::Title(v) => self.title = v,
            BlockField::Content(v) => self.content = v,
            BlockField::BlockType(v) => self.block_type = v,
            BlockField::PageBreakBefore(v) => self.page_break_before = v,
        }
    }
}

/// One mutable field of a block together with its new value.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockField {
    Title(String),
    Content(String),
    BlockType(BlockType),
    PageBreakBefore(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minted_keys_are_unique() {
        let a = BlockKey::mint();
        let b = BlockKey::mint();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn test_block_type_defaults_to_text() {
        assert_eq!(BlockType::default().as_str(), "text");
        assert_eq!(BlockType::new("  "), BlockType::default());
        assert_eq!(BlockType::new("finding").as_str(), "finding");

        let t: BlockType = serde_json::from_str("null").expect("null should parse");
        assert!(t.is_text());
        let t: BlockType = serde_json::from_str(r#""""#).expect("empty should parse");
        assert!(t.is_text());
        assert_eq!(serde_json::to_string(&BlockType::new("table")).unwrap(), r#""table""#);
    }

    #[test]
    fn test_blank_block_detection_ignores_whitespace() {
        let mut b = Block::from_seed(BlockSeed::default(), 0);
        assert!(b.is_blank());
        b.apply(BlockField::Content("  \n".to_string()));
        assert!(b.is_blank());
        b.apply(BlockField::Title("Scope".to_string()));
        assert!(!b.is_blank());
    }

    #[test]
    fn test_payload_drops_local_key() {
        let b = Block::from_seed(
            BlockSeed {
                title: "Summary".to_string(),
                content: "text".to_string(),
                block_type: BlockType::default(),
                page_break_before: true,
            },
            4,
        );
        let p = b.to_payload();
        assert_eq!(p.order, 4);
        assert_eq!(p.title, "Summary");
        assert!(p.page_break_before);
    }
}
