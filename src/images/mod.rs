mod view;
pub use view::ImageGallery;

use crate::api::{ApiClient, ApiError, ApiResult};
use crate::models::{ImageUploaded, TemplateId};
use async_trait::async_trait;
use std::future::Future;

/// A file picked by the user, already read into memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[async_trait(?Send)]
pub trait ImageStore {
    async fn list(&self, template_id: TemplateId) -> ApiResult<Vec<String>>;
    async fn upload(&self, template_id: TemplateId, file: &ImageFile) -> ApiResult<ImageUploaded>;
    async fn delete(&self, template_id: TemplateId, file_name: &str) -> ApiResult<()>;
}

#[async_trait(?Send)]
impl ImageStore for ApiClient {
    async fn list(&self, template_id: TemplateId) -> ApiResult<Vec<String>> {
        self.list_images(template_id).await
    }

    async fn upload(&self, template_id: TemplateId, file: &ImageFile) -> ApiResult<ImageUploaded> {
        self.upload_image(template_id, &file.name, &file.mime, file.bytes.clone())
            .await
    }

    async fn delete(&self, template_id: TemplateId, file_name: &str) -> ApiResult<()> {
        self.delete_image(template_id, file_name).await
    }
}

/// Result of a one-at-a-time bulk operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkOutcome {
    pub succeeded: usize,
    pub total: usize,
    /// Item name and error of the failure that stopped the run.
    pub failure: Option<(String, ApiError)>,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.succeeded == self.total
    }

    pub fn summary(&self, verb: &str) -> String {
        match &self.failure {
            None => format!("{verb} {} of {}", self.succeeded, self.total),
            Some((name, e)) => format!(
                "{verb} {} of {}; stopped at {name}: {e}",
                self.succeeded, self.total
            ),
        }
    }
}

/// Run `op` over `items` in order, awaiting each before starting the next.
///
/// Stops at the first failure; earlier successes are not undone.
pub async fn run_sequential<'a, T, F, Fut>(
    items: &'a [T],
    name_of: impl Fn(&T) -> String,
    mut op: F,
) -> BulkOutcome
where
    F: FnMut(&'a T) -> Fut,
    Fut: Future<Output = ApiResult<()>>,
{
    let mut succeeded = 0;
    for item in items {
        if let Err(e) = op(item).await {
            let name = name_of(item);
            log::warn!("bulk operation stopped at {name} after {succeeded} of {}: {e}", items.len());
            return BulkOutcome {
                succeeded,
                total: items.len(),
                failure: Some((name, e)),
            };
        }
        succeeded += 1;
    }
    BulkOutcome {
        succeeded,
        total: items.len(),
        failure: None,
    }
}

pub async fn upload_all<S>(store: &S, template_id: TemplateId, files: &[ImageFile]) -> BulkOutcome
where
    S: ImageStore + ?Sized,
{
    run_sequential(
        files,
        |f| f.name.clone(),
        |f| async move { store.upload(template_id, f).await.map(|_| ()) },
    )
    .await
}

pub async fn delete_all<S>(store: &S, template_id: TemplateId, names: &[String]) -> BulkOutcome
where
    S: ImageStore + ?Sized,
{
    run_sequential(
        names,
        |n| n.clone(),
        |n| async move { store.delete(template_id, n).await },
    )
    .await
}

pub(crate) fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeImages {
        stored: RefCell<Vec<String>>,
        log: RefCell<Vec<String>>,
        fail_on: Option<String>,
    }

    #[async_trait(?Send)]
    impl ImageStore for FakeImages {
        async fn list(&self, _t: TemplateId) -> ApiResult<Vec<String>> {
            Ok(self.stored.borrow().clone())
        }

        async fn upload(&self, _t: TemplateId, file: &ImageFile) -> ApiResult<ImageUploaded> {
            self.log.borrow_mut().push(format!("up:{}", file.name));
            if self.fail_on.as_deref() == Some(file.name.as_str()) {
                return Err(ApiError::http(413, "too large", "Upload image"));
            }
            self.stored.borrow_mut().push(file.name.clone());
            Ok(ImageUploaded {
                url: format!("/static/uploads/{}", file.name),
                filename: file.name.clone(),
            })
        }

        async fn delete(&self, _t: TemplateId, name: &str) -> ApiResult<()> {
            self.log.borrow_mut().push(format!("del:{name}"));
            if self.fail_on.as_deref() == Some(name) {
                return Err(ApiError::network("offline"));
            }
            self.stored.borrow_mut().retain(|n| n != name);
            Ok(())
        }
    }

    fn file(name: &str) -> ImageFile {
        ImageFile {
            name: name.to_string(),
            mime: "image/png".to_string(),
            bytes: vec![0x89, 0x50],
        }
    }

    #[tokio::test]
    async fn test_upload_all_runs_in_order() {
        let store = FakeImages::default();
        let out = upload_all(&store, TemplateId(1), &[file("a.png"), file("b.png")]).await;
        assert!(out.is_complete());
        assert_eq!(*store.log.borrow(), vec!["up:a.png", "up:b.png"]);
        assert_eq!(store.list(TemplateId(1)).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_earlier_uploads() {
        let store = FakeImages {
            fail_on: Some("b.png".to_string()),
            ..Default::default()
        };
        let out = upload_all(
            &store,
            TemplateId(1),
            &[file("a.png"), file("b.png"), file("c.png")],
        )
        .await;
        assert_eq!(out.succeeded, 1);
        assert_eq!(out.total, 3);
        assert_eq!(out.failure.as_ref().map(|(n, _)| n.as_str()), Some("b.png"));
        assert_eq!(*store.stored.borrow(), vec!["a.png"]);
        assert_eq!(*store.log.borrow(), vec!["up:a.png", "up:b.png"]);
        assert!(out.summary("Uploaded").contains("stopped at b.png"));
    }

    #[tokio::test]
    async fn test_delete_all_stops_at_failure() {
        let store = FakeImages {
            stored: RefCell::new(vec!["a.png".into(), "b.png".into(), "c.png".into()]),
            fail_on: Some("b.png".to_string()),
            ..Default::default()
        };
        let names = vec!["a.png".to_string(), "b.png".to_string(), "c.png".to_string()];
        let out = delete_all(&store, TemplateId(2), &names).await;
        assert!(!out.is_complete());
        assert!(out.failure.as_ref().map(|(_, e)| e.is_retryable()).unwrap_or(false));
        assert_eq!(*store.stored.borrow(), vec!["b.png", "c.png"]);
    }

    #[test]
    fn test_image_mime_filter() {
        assert!(is_image_mime("image/jpeg"));
        assert!(!is_image_mime("application/pdf"));
    }
}
