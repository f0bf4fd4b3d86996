mod view;

pub use view::BlockListView;

use crate::api::ApiError;
use crate::blocks::{Block, BlockField, BlockKey, BlockSeed};
use crate::favorites::{self, FavoriteStore};
use crate::models::{BlockPayload, BlockRecord, FavoriteBlock};
use crate::placeholders;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    #[error("block index {index} is out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("block {0} not found")]
    BlockNotFound(BlockKey),
    #[error("no block is active; click into a block first")]
    NoActiveBlock,
    #[error("favorite name is required")]
    EmptyFavoriteName,
    #[error("block has no title or content to save")]
    EmptyBlock,
}

#[derive(Debug, thiserror::Error)]
pub enum PromoteError {
    #[error(transparent)]
    Invalid(#[from] EditorError),
    #[error("could not save favorite: {0}")]
    Store(#[from] ApiError),
}

impl PromoteError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PromoteError::Invalid(_) => false,
            PromoteError::Store(e) => e.is_retryable(),
        }
    }
}

fn check_index(index: usize, len: usize) -> Result<(), EditorError> {
    if index < len {
        Ok(())
    } else {
        Err(EditorError::IndexOutOfBounds { index, len })
    }
}

/// Move the element at `src` to `dst`, where `dst` indexes the list after removal.
///
/// Both indexes are checked before anything moves; on error the list is untouched.
pub fn reorder<T>(list: &mut Vec<T>, src: usize, dst: usize) -> Result<(), EditorError> {
    let len = list.len();
    check_index(src, len)?;
    // Post-removal list has len - 1 slots plus the end position.
    check_index(dst, len)?;
    if src == dst {
        return Ok(());
    }
    let item = list.remove(src);
    list.insert(dst, item);
    Ok(())
}

/// Translate "dropped on `target`, before or after it" into a post-removal destination.
///
/// `None` when the drop would leave the list unchanged or either index is stale.
pub fn drop_destination(len: usize, src: usize, target: usize, insert_after: bool) -> Option<usize> {
    if src >= len || target >= len || src == target {
        return None;
    }
    let target = if target > src { target - 1 } else { target };
    let dst = target + usize::from(insert_after);
    (dst != src).then_some(dst)
}

/// Ordered blocks of one document plus the last-focused block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockListEditor {
    blocks: Vec<Block>,
    active: Option<BlockKey>,
}

impl BlockListEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh local keys for every seed; order follows iteration order.
    pub fn from_seeds(seeds: impl IntoIterator<Item = BlockSeed>) -> Self {
        let blocks = seeds
            .into_iter()
            .enumerate()
            .map(|(i, s)| Block::from_seed(s, i as u32))
            .collect();
        Self {
            blocks,
            active: None,
        }
    }

    /// Stored `order` decides the initial sequence, then positions are renumbered.
    pub fn from_records(records: &[BlockRecord]) -> Self {
        let mut sorted: Vec<&BlockRecord> = records.iter().collect();
        sorted.sort_by_key(|r| r.order);
        Self::from_seeds(sorted.into_iter().map(BlockSeed::from))
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn index_of(&self, key: BlockKey) -> Option<usize> {
        self.blocks.iter().position(|b| b.key == key)
    }

    fn renumber(&mut self) {
        for (i, b) in self.blocks.iter_mut().enumerate() {
            b.order = i as u32;
        }
    }

    pub fn append_block(&mut self, seed: Option<&FavoriteBlock>) -> BlockKey {
        self.append_seed(seed.map(BlockSeed::from).unwrap_or_default())
    }

    pub fn append_seed(&mut self, seed: BlockSeed) -> BlockKey {
        let block = Block::from_seed(seed, self.blocks.len() as u32);
        let key = block.key;
        self.blocks.push(block);
        key
    }

    pub fn insert_block_after(
        &mut self,
        index: usize,
        seed: Option<&FavoriteBlock>,
    ) -> Result<BlockKey, EditorError> {
        self.insert_seed_after(index, seed.map(BlockSeed::from).unwrap_or_default())
    }

    pub fn insert_seed_after(&mut self, index: usize, seed: BlockSeed) -> Result<BlockKey, EditorError> {
        check_index(index, self.blocks.len())?;
        let block = Block::from_seed(seed, 0);
        let key = block.key;
        self.blocks.insert(index + 1, block);
        self.renumber();
        Ok(key)
    }

    pub fn remove_block(&mut self, key: BlockKey) -> Result<Block, EditorError> {
        let index = self.index_of(key).ok_or(EditorError::BlockNotFound(key))?;
        let removed = self.blocks.remove(index);
        if self.active == Some(key) {
            self.active = None;
        }
        self.renumber();
        Ok(removed)
    }

    pub fn update_block_field(&mut self, index: usize, field: BlockField) -> Result<(), EditorError> {
        check_index(index, self.blocks.len())?;
        self.blocks[index].apply(field);
        Ok(())
    }

    pub fn reorder(&mut self, src: usize, dst: usize) -> Result<(), EditorError> {
        reorder(&mut self.blocks, src, dst)?;
        self.renumber();
        Ok(())
    }

    pub fn set_active(&mut self, index: usize) -> Result<(), EditorError> {
        check_index(index, self.blocks.len())?;
        self.active = Some(self.blocks[index].key);
        Ok(())
    }

    pub fn active_key(&self) -> Option<BlockKey> {
        self.active
    }

    /// Current position of the active block; follows it across reorders.
    pub fn active_index(&self) -> Option<usize> {
        self.active.and_then(|k| self.index_of(k))
    }

    /// Append a literal token to the active block's content. Returns that block's index.
    pub fn insert_placeholder_into_active_block(&mut self, token: &str) -> Result<usize, EditorError> {
        let index = self.active_index().ok_or(EditorError::NoActiveBlock)?;
        let block = &mut self.blocks[index];
        block.content = placeholders::insert(&block.content, token);
        Ok(index)
    }

    /// Persist a copy of the block at `index` as a favorite. Editor state is never touched.
    pub async fn promote_to_favorite<S>(
        &self,
        index: usize,
        name: &str,
        store: &S,
    ) -> Result<FavoriteBlock, PromoteError>
    where
        S: FavoriteStore + ?Sized,
    {
        check_index(index, self.blocks.len())?;
        let req = favorites::create_request(&self.blocks[index], name)?;
        let saved = store.create(&req).await?;
        log::info!("saved block {} as favorite {}", self.blocks[index].key, saved.id);
        Ok(saved)
    }

    /// Snapshot of the block list in its submitted shape.
    pub fn payloads(&self) -> Vec<BlockPayload> {
        self.blocks.iter().map(Block::to_payload).collect()
    }
}

/// Pointer-gesture adapter: remembers the dragged block until it lands or is abandoned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DragGesture {
    source: Option<BlockKey>,
}

impl DragGesture {
    pub fn start(&mut self, key: BlockKey) {
        self.source = Some(key);
    }

    pub fn source(&self) -> Option<BlockKey> {
        self.source
    }

    pub fn is_dragging(&self) -> bool {
        self.source.is_some()
    }

    /// Drag released outside any drop target.
    pub fn cancel(&mut self) {
        self.source = None;
    }

    /// Finish the gesture on `target`; yields the `(src, dst)` move to apply, if any.
    pub fn drop_on(
        &mut self,
        editor: &BlockListEditor,
        target: BlockKey,
        insert_after: bool,
    ) -> Option<(usize, usize)> {
        let source = self.source.take()?;
        let src = editor.index_of(source)?;
        let tgt = editor.index_of(target)?;
        drop_destination(editor.len(), src, tgt, insert_after).map(|dst| (src, dst))
    }
}
