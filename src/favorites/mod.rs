use crate::api::{ApiClient, ApiResult};
use crate::blocks::Block;
use crate::editor::EditorError;
use crate::models::{CreateFavoriteRequest, FavoriteBlock, FavoriteId, UpdateFavoriteRequest};
use crate::util::{preview, PREVIEW_LEN};
use async_trait::async_trait;

pub(crate) const UNNAMED_BLOCK: &str = "Untitled block";

/// CRUD proxy over the user's favorite block collection.
///
/// `list` returns items in whatever order the server chose. Callers must confirm with
/// the user before `delete`.
#[async_trait(?Send)]
pub trait FavoriteStore {
    async fn list(&self) -> ApiResult<Vec<FavoriteBlock>>;
    async fn get(&self, id: FavoriteId) -> ApiResult<FavoriteBlock>;
    async fn create(&self, req: &CreateFavoriteRequest) -> ApiResult<FavoriteBlock>;
    async fn update(&self, id: FavoriteId, req: &UpdateFavoriteRequest) -> ApiResult<FavoriteBlock>;
    async fn delete(&self, id: FavoriteId) -> ApiResult<()>;
}

#[async_trait(?Send)]
impl FavoriteStore for ApiClient {
    async fn list(&self) -> ApiResult<Vec<FavoriteBlock>> {
        self.list_favorites().await
    }

    async fn get(&self, id: FavoriteId) -> ApiResult<FavoriteBlock> {
        self.get_favorite(id).await
    }

    async fn create(&self, req: &CreateFavoriteRequest) -> ApiResult<FavoriteBlock> {
        self.create_favorite(req).await
    }

    async fn update(&self, id: FavoriteId, req: &UpdateFavoriteRequest) -> ApiResult<FavoriteBlock> {
        self.update_favorite(id, req).await
    }

    async fn delete(&self, id: FavoriteId) -> ApiResult<()> {
        self.delete_favorite(id).await
    }
}

/// Name offered in the prompt when promoting a block.
pub(crate) fn suggested_name(block: &Block) -> String {
    let title = block.title.trim();
    if title.is_empty() {
        UNNAMED_BLOCK.to_string()
    } else {
        title.to_string()
    }
}

/// Blank blocks are refused before the user is asked for a name.
pub(crate) fn promotion_prompt(block: &Block) -> Result<String, EditorError> {
    if block.is_blank() {
        return Err(EditorError::EmptyBlock);
    }
    Ok(suggested_name(block))
}

/// Build a create request from a block, or reject it before any network call.
pub(crate) fn create_request(block: &Block, name: &str) -> Result<CreateFavoriteRequest, EditorError> {
    if block.is_blank() {
        return Err(EditorError::EmptyBlock);
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(EditorError::EmptyFavoriteName);
    }
    Ok(CreateFavoriteRequest {
        name: name.to_string(),
        title: block.title.clone(),
        content: block.content.clone(),
        block_type: block.block_type.clone(),
        page_break_before: block.page_break_before,
    })
}

/// Inline edit form on the favorites page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct FavoriteEdit {
    pub name: String,
    pub title: String,
    pub content: String,
}

impl FavoriteEdit {
    pub fn from_favorite(f: &FavoriteBlock) -> Self {
        Self {
            name: f.name.clone(),
            title: f.title.clone(),
            content: f.content.clone(),
        }
    }

    pub fn to_request(&self) -> Result<UpdateFavoriteRequest, EditorError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(EditorError::EmptyFavoriteName);
        }
        Ok(UpdateFavoriteRequest {
            name: Some(name.to_string()),
            title: Some(self.title.clone()),
            content: Some(self.content.clone()),
            ..Default::default()
        })
    }
}

/// One row of the block picker.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum PickerEntry {
    Empty,
    Favorite(FavoriteBlock),
}

impl PickerEntry {
    /// Source to copy from; `None` for the empty block.
    pub fn favorite(&self) -> Option<&FavoriteBlock> {
        match self {
            PickerEntry::Empty => None,
            PickerEntry::Favorite(f) => Some(f),
        }
    }

    pub fn preview(&self) -> String {
        match self {
            PickerEntry::Empty => String::new(),
            PickerEntry::Favorite(f) => preview(&f.content, PREVIEW_LEN),
        }
    }
}

/// "Empty block" first, then favorites in server order.
pub(crate) fn picker_entries(favorites: &[FavoriteBlock]) -> Vec<PickerEntry> {
    std::iter::once(PickerEntry::Empty)
        .chain(favorites.iter().cloned().map(PickerEntry::Favorite))
        .collect()
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::api::ApiError;
    use std::cell::{Cell, RefCell};

    /// In-memory favorites with call counting and an injectable failure.
    #[derive(Default)]
    pub(crate) struct MemoryFavorites {
        pub items: RefCell<Vec<FavoriteBlock>>,
        pub calls: Cell<usize>,
        pub fail_with: RefCell<Option<ApiError>>,
        next_id: Cell<i64>,
    }

    impl MemoryFavorites {
        pub fn failing(err: ApiError) -> Self {
            let s = Self::default();
            *s.fail_with.borrow_mut() = Some(err);
            s
        }

        fn enter(&self) -> ApiResult<()> {
            self.calls.set(self.calls.get() + 1);
            match self.fail_with.borrow().clone() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        fn find(&self, id: FavoriteId) -> ApiResult<usize> {
            self.items
                .borrow()
                .iter()
                .position(|f| f.id == id)
                .ok_or_else(|| ApiError::not_found("favorite"))
        }
    }

    #[async_trait(?Send)]
    impl FavoriteStore for MemoryFavorites {
        async fn list(&self) -> ApiResult<Vec<FavoriteBlock>> {
            self.enter()?;
            Ok(self.items.borrow().clone())
        }

        async fn get(&self, id: FavoriteId) -> ApiResult<FavoriteBlock> {
            self.enter()?;
            let idx = self.find(id)?;
            Ok(self.items.borrow()[idx].clone())
        }

        async fn create(&self, req: &CreateFavoriteRequest) -> ApiResult<FavoriteBlock> {
            self.enter()?;
            let id = self.next_id.get() + 1;
            self.next_id.set(id);
            let f = FavoriteBlock {
                id: FavoriteId(id),
                user_id: Some(1),
                name: req.name.clone(),
                title: req.title.clone(),
                content: req.content.clone(),
                block_type: req.block_type.clone(),
                page_break_before: req.page_break_before,
                created_at: String::new(),
                updated_at: String::new(),
            };
            self.items.borrow_mut().push(f.clone());
            Ok(f)
        }

        async fn update(&self, id: FavoriteId, req: &UpdateFavoriteRequest) -> ApiResult<FavoriteBlock> {
            self.enter()?;
            let idx = self.find(id)?;
            let mut items = self.items.borrow_mut();
            let f = &mut items[idx];
            if let Some(v) = &req.name {
                f.name = v.clone();
            }
            if let Some(v) = &req.title {
                f.title = v.clone();
            }
            if let Some(v) = &req.content {
                f.content = v.clone();
            }
            if let Some(v) = &req.block_type {
                f.block_type = v.clone();
            }
            if let Some(v) = req.page_break_before {
                f.page_break_before = v;
            }
            Ok(f.clone())
        }

        async fn delete(&self, id: FavoriteId) -> ApiResult<()> {
            self.enter()?;
            let idx = self.find(id)?;
            self.items.borrow_mut().remove(idx);
            Ok(())
        }
    }
}
