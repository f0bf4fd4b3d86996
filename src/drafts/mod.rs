use crate::api::{ApiClient, ApiError, ApiErrorKind, ApiResult};
use crate::editor::BlockListEditor;
use crate::models::{
    BlockPayload, Report, ReportCreated, ReportId, ReportPayload, Template, TemplateDocument,
    TemplateId, TemplatePayload, TemplateSaved,
};
use crate::util::{InFlight, InFlightTicket};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("a save is already in progress")]
    SaveInFlight,
    #[error("this document no longer exists")]
    NotFound,
    #[error("invalid template file: {0}")]
    InvalidImport(String),
    #[error(transparent)]
    Api(ApiError),
}

impl From<ApiError> for DraftError {
    fn from(e: ApiError) -> Self {
        if e.kind == ApiErrorKind::NotFound {
            DraftError::NotFound
        } else {
            DraftError::Api(e)
        }
    }
}

impl DraftError {
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            DraftError::Api(e) => Some(e),
            _ => None,
        }
    }
}

/// Persistence calls a draft needs. Implemented by `ApiClient`; tests use fakes.
#[async_trait(?Send)]
pub trait DocumentApi {
    async fn get_template(&self, id: TemplateId) -> ApiResult<Template>;
    async fn create_template(&self, payload: &TemplatePayload) -> ApiResult<TemplateSaved>;
    async fn update_template(&self, id: TemplateId, payload: &TemplatePayload) -> ApiResult<TemplateSaved>;
    async fn get_report(&self, id: ReportId) -> ApiResult<Report>;
    async fn next_report_number(&self) -> ApiResult<String>;
    async fn create_report(&self, payload: &ReportPayload) -> ApiResult<ReportCreated>;
    async fn update_report(&self, id: ReportId, payload: &ReportPayload) -> ApiResult<()>;
}

#[async_trait(?Send)]
impl DocumentApi for ApiClient {
    async fn get_template(&self, id: TemplateId) -> ApiResult<Template> {
        ApiClient::get_template(self, id).await
    }

    async fn create_template(&self, payload: &TemplatePayload) -> ApiResult<TemplateSaved> {
        ApiClient::create_template(self, payload).await
    }

    async fn update_template(&self, id: TemplateId, payload: &TemplatePayload) -> ApiResult<TemplateSaved> {
        ApiClient::update_template(self, id, payload).await
    }

    async fn get_report(&self, id: ReportId) -> ApiResult<Report> {
        ApiClient::get_report(self, id).await
    }

    async fn next_report_number(&self) -> ApiResult<String> {
        ApiClient::next_report_number(self).await
    }

    async fn create_report(&self, payload: &ReportPayload) -> ApiResult<ReportCreated> {
        ApiClient::create_report(self, payload).await
    }

    async fn update_report(&self, id: ReportId, payload: &ReportPayload) -> ApiResult<()> {
        ApiClient::update_report(self, id, payload).await
    }
}

/// Document-level fields of a draft, and how they become a save payload.
pub trait DraftMeta: Clone + Default + PartialEq + fmt::Debug {
    type Id: Copy + fmt::Display + fmt::Debug + PartialEq;
    type Payload: Serialize + Clone + fmt::Debug;

    fn validate(&self) -> Result<(), DraftError>;
    fn payload(&self, blocks: Vec<BlockPayload>) -> Self::Payload;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateMeta {
    pub name: String,
    pub description: String,
}

impl DraftMeta for TemplateMeta {
    type Id = TemplateId;
    type Payload = TemplatePayload;

    fn validate(&self) -> Result<(), DraftError> {
        Ok(())
    }

    fn payload(&self, blocks: Vec<BlockPayload>) -> TemplatePayload {
        TemplatePayload {
            name: self.name.clone(),
            description: self.description.clone(),
            blocks,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReportMeta {
    pub report_number: String,
    pub title: String,
    pub client_name: String,
    pub template_id: Option<TemplateId>,
}

impl DraftMeta for ReportMeta {
    type Id = ReportId;
    type Payload = ReportPayload;

    fn validate(&self) -> Result<(), DraftError> {
        if self.title.trim().is_empty() {
            return Err(DraftError::MissingField("title"));
        }
        if self.client_name.trim().is_empty() {
            return Err(DraftError::MissingField("client name"));
        }
        Ok(())
    }

    fn payload(&self, blocks: Vec<BlockPayload>) -> ReportPayload {
        ReportPayload {
            title: self.title.clone(),
            client_name: self.client_name.clone(),
            report_number: self.report_number.trim().to_string(),
            template_id: self.template_id,
            blocks,
        }
    }
}

/// A Template or Report being edited: metadata plus its block list.
#[derive(Clone, Debug, PartialEq)]
pub struct Draft<M: DraftMeta> {
    /// Server identity; `None` until the first successful save.
    pub id: Option<M::Id>,
    pub meta: M,
    pub editor: BlockListEditor,
}

impl<M: DraftMeta + Default> Default for Draft<M> {
    fn default() -> Self {
        Self {
            id: None,
            meta: M::default(),
            editor: BlockListEditor::new(),
        }
    }
}

pub type TemplateDraft = Draft<TemplateMeta>;
pub type ReportDraft = Draft<ReportMeta>;

/// Validated snapshot of a draft, frozen at the moment save was pressed.
#[derive(Clone, Debug)]
pub struct SaveRequest<M: DraftMeta> {
    pub id: Option<M::Id>,
    pub payload: M::Payload,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome<Id> {
    Created(Id),
    Updated(Id),
}

impl<Id: Copy> SaveOutcome<Id> {
    pub fn id(&self) -> Id {
        match self {
            SaveOutcome::Created(id) | SaveOutcome::Updated(id) => *id,
        }
    }
}

impl<M: DraftMeta> Draft<M> {
    /// Validate and snapshot. Nothing leaves the client when this fails.
    pub fn save_request(&self) -> Result<SaveRequest<M>, DraftError> {
        self.meta.validate()?;
        Ok(SaveRequest {
            id: self.id,
            payload: self.meta.payload(self.editor.payloads()),
        })
    }

    /// `save_request` plus the single-flight ticket for the submit.
    pub fn begin_save(&self, guard: &InFlight) -> Result<(InFlightTicket, SaveRequest<M>), DraftError> {
        let req = self.save_request()?;
        let ticket = guard.try_begin().ok_or(DraftError::SaveInFlight)?;
        Ok((ticket, req))
    }
}

impl TemplateDraft {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn from_template(t: &Template) -> Self {
        Self {
            id: Some(t.id),
            meta: TemplateMeta {
                name: t.name.clone(),
                description: t.description.clone(),
            },
            editor: BlockListEditor::from_records(&t.blocks),
        }
    }

    pub async fn load_existing<A>(api: &A, id: TemplateId) -> Result<Self, DraftError>
    where
        A: DocumentApi + ?Sized,
    {
        let t = api.get_template(id).await?;
        Ok(Self::from_template(&t))
    }
}

impl SaveRequest<TemplateMeta> {
    pub async fn submit<A>(self, api: &A) -> Result<SaveOutcome<TemplateId>, DraftError>
    where
        A: DocumentApi + ?Sized,
    {
        let outcome = match self.id {
            None => SaveOutcome::Created(api.create_template(&self.payload).await?.template_id),
            Some(id) => {
                api.update_template(id, &self.payload).await?;
                SaveOutcome::Updated(id)
            }
        };
        log::info!("template {} saved ({} blocks)", outcome.id(), self.payload.blocks.len());
        Ok(outcome)
    }
}

/// Next report number, or empty when the service is unavailable.
async fn next_number_or_empty<A>(api: &A) -> String
where
    A: DocumentApi + ?Sized,
{
    match api.next_report_number().await {
        Ok(n) => n,
        Err(e) => {
            log::warn!("next report number unavailable: {e}");
            String::new()
        }
    }
}

impl ReportDraft {
    pub async fn load_blank<A>(api: &A) -> Self
    where
        A: DocumentApi + ?Sized,
    {
        Self {
            id: None,
            meta: ReportMeta {
                report_number: next_number_or_empty(api).await,
                ..Default::default()
            },
            editor: BlockListEditor::new(),
        }
    }

    /// New report seeded with a deep copy of a template's blocks.
    pub async fn load_from_template<A>(api: &A, template_id: TemplateId) -> Result<Self, DraftError>
    where
        A: DocumentApi + ?Sized,
    {
        let t = api.get_template(template_id).await?;
        Ok(Self {
            id: None,
            meta: ReportMeta {
                report_number: next_number_or_empty(api).await,
                title: t.name.clone(),
                client_name: String::new(),
                template_id: Some(t.id),
            },
            editor: BlockListEditor::from_records(&t.blocks),
        })
    }

    pub fn from_report(r: &Report) -> Self {
        Self {
            id: Some(r.id),
            meta: ReportMeta {
                report_number: r.number().to_string(),
                title: r.title.clone(),
                client_name: r.client_name.clone(),
                template_id: r.template_id,
            },
            editor: BlockListEditor::from_records(&r.blocks),
        }
    }

    pub async fn load_existing<A>(api: &A, id: ReportId) -> Result<Self, DraftError>
    where
        A: DocumentApi + ?Sized,
    {
        let r = api.get_report(id).await?;
        Ok(Self::from_report(&r))
    }
}

impl SaveRequest<ReportMeta> {
    pub async fn submit<A>(self, api: &A) -> Result<SaveOutcome<ReportId>, DraftError>
    where
        A: DocumentApi + ?Sized,
    {
        let outcome = match self.id {
            None => {
                let created = api.create_report(&self.payload).await?;
                let id = created
                    .id()
                    .ok_or_else(|| ApiError::parse("create report response has no id"))?;
                // Create only seeds blocks from the template; the edited list goes in a follow-up update.
                if !self.payload.blocks.is_empty() {
                    api.update_report(id, &self.payload).await?;
                }
                SaveOutcome::Created(id)
            }
            Some(id) => {
                api.update_report(id, &self.payload).await?;
                SaveOutcome::Updated(id)
            }
        };
        log::info!("report {} saved ({} blocks)", outcome.id(), self.payload.blocks.len());
        Ok(outcome)
    }
}

/// Parse an exported template file before it is sent for import.
pub(crate) fn parse_template_document(raw: &[u8]) -> Result<TemplateDocument, DraftError> {
    let doc: TemplateDocument =
        serde_json::from_slice(raw).map_err(|e| DraftError::InvalidImport(e.to_string()))?;
    if doc.name.trim().is_empty() {
        return Err(DraftError::InvalidImport("missing name".to_string()));
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{BlockField, BlockSeed};
    use crate::models::BlockRecord;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct FakeDocs {
        template: Option<Template>,
        report: Option<Report>,
        next_number: Option<String>,
        calls: Cell<usize>,
        created_reports: RefCell<Vec<ReportPayload>>,
        updated_reports: RefCell<Vec<(ReportId, ReportPayload)>>,
        last_report: RefCell<Option<ReportPayload>>,
        last_template: RefCell<Option<TemplatePayload>>,
    }

    impl FakeDocs {
        fn hit(&self) {
            self.calls.set(self.calls.get() + 1);
        }
    }

    #[async_trait(?Send)]
    impl DocumentApi for FakeDocs {
        async fn get_template(&self, _id: TemplateId) -> ApiResult<Template> {
            self.hit();
            self.template.clone().ok_or_else(|| ApiError::not_found("Load template"))
        }

        async fn create_template(&self, payload: &TemplatePayload) -> ApiResult<TemplateSaved> {
            self.hit();
            *self.last_template.borrow_mut() = Some(payload.clone());
            Ok(TemplateSaved {
                template_id: TemplateId(41),
            })
        }

        async fn update_template(&self, id: TemplateId, payload: &TemplatePayload) -> ApiResult<TemplateSaved> {
            self.hit();
            *self.last_template.borrow_mut() = Some(payload.clone());
            Ok(TemplateSaved { template_id: id })
        }

        async fn get_report(&self, _id: ReportId) -> ApiResult<Report> {
            self.hit();
            self.report.clone().ok_or_else(|| ApiError::not_found("Load report"))
        }

        async fn next_report_number(&self) -> ApiResult<String> {
            self.hit();
            self.next_number
                .clone()
                .ok_or_else(|| ApiError::http(500, "", "Load next report number"))
        }

        async fn create_report(&self, payload: &ReportPayload) -> ApiResult<ReportCreated> {
            self.hit();
            self.created_reports.borrow_mut().push(payload.clone());
            *self.last_report.borrow_mut() = Some(payload.clone());
            Ok(ReportCreated {
                report_id: Some(ReportId(77)),
                proposal_id: Some(ReportId(77)),
            })
        }

        async fn update_report(&self, id: ReportId, payload: &ReportPayload) -> ApiResult<()> {
            self.hit();
            self.updated_reports.borrow_mut().push((id, payload.clone()));
            *self.last_report.borrow_mut() = Some(payload.clone());
            Ok(())
        }
    }

    fn record(title: &str, content: &str, order: u32, page_break: bool) -> BlockRecord {
        BlockRecord {
            id: Some(100 + order as i64),
            title: title.to_string(),
            content: content.to_string(),
            order,
            block_type: Default::default(),
            page_break_before: page_break,
        }
    }

    fn template() -> Template {
        Template {
            id: TemplateId(5),
            name: "Web Pentest".to_string(),
            description: "standard".to_string(),
            created_by: Some(1),
            created_at: String::new(),
            blocks: vec![
                record("Scope", "Client: {{REPORT_CLIENT}}", 0, false),
                record("Findings", "", 1, true),
                record("Annex", "raw", 2, false),
            ],
        }
    }

    fn with_template() -> FakeDocs {
        FakeDocs {
            template: Some(template()),
            next_number: Some("5001002".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_load_blank_report_fetches_number() {
        let api = with_template();
        let d = ReportDraft::load_blank(&api).await;
        assert_eq!(d.id, None);
        assert_eq!(d.meta.report_number, "5001002");
        assert!(d.editor.is_empty());
    }

    #[tokio::test]
    async fn test_next_number_failure_leaves_number_empty() {
        let api = FakeDocs {
            template: Some(template()),
            ..Default::default()
        };
        let d = ReportDraft::load_from_template(&api, TemplateId(5))
            .await
            .expect("template load still succeeds");
        assert_eq!(d.meta.report_number, "");
        assert_eq!(d.editor.len(), 3);
    }

    #[tokio::test]
    async fn test_load_from_template_copies_blocks_by_value() {
        let api = with_template();
        let source = template();
        let mut d = ReportDraft::load_from_template(&api, TemplateId(5))
            .await
            .expect("template exists");

        assert_eq!(d.meta.title, "Web Pentest");
        assert_eq!(d.meta.template_id, Some(TemplateId(5)));
        for (copy, src) in d.editor.blocks().iter().zip(&source.blocks) {
            assert_eq!(copy.title, src.title);
            assert_eq!(copy.content, src.content);
            assert_eq!(copy.order, src.order);
            assert_eq!(copy.block_type, src.block_type);
            assert_eq!(copy.page_break_before, src.page_break_before);
        }

        let again = ReportDraft::load_from_template(&api, TemplateId(5))
            .await
            .expect("template exists");
        let keys: Vec<_> = d.editor.blocks().iter().map(|b| b.key).collect();
        assert!(again.editor.blocks().iter().all(|b| !keys.contains(&b.key)));

        d.editor
            .update_block_field(0, BlockField::Content("changed".to_string()))
            .expect("valid index");
        assert_eq!(api.template.as_ref().map(|t| t.blocks[0].content.as_str()), Some("Client: {{REPORT_CLIENT}}"));
    }

    #[tokio::test]
    async fn test_missing_template_is_not_found() {
        let api = FakeDocs::default();
        let err = ReportDraft::load_from_template(&api, TemplateId(9))
            .await
            .expect_err("no template");
        assert!(matches!(err, DraftError::NotFound));
    }

    #[tokio::test]
    async fn test_report_without_client_is_rejected_before_network() {
        let api = with_template();
        let mut d = ReportDraft::load_blank(&api).await;
        let calls_after_load = api.calls.get();
        d.meta.title = "Q3 assessment".to_string();

        let err = d.save_request().expect_err("client name missing");
        assert!(matches!(err, DraftError::MissingField("client name")));
        assert_eq!(api.calls.get(), calls_after_load);
        assert!(api.last_report.borrow().is_none());
    }

    #[tokio::test]
    async fn test_save_snapshot_ignores_later_edits() {
        let api = with_template();
        let mut d = ReportDraft::load_from_template(&api, TemplateId(5))
            .await
            .expect("template exists");
        d.meta.client_name = "ACME".to_string();

        let req = d.save_request().expect("valid");
        d.editor.append_seed(BlockSeed::default());
        d.meta.title = "renamed".to_string();

        let outcome = req.submit(&api).await.expect("save succeeds");
        assert_eq!(outcome, SaveOutcome::Created(ReportId(77)));

        let sent = api.last_report.borrow().clone().expect("payload sent");
        assert_eq!(sent.title, "Web Pentest");
        assert_eq!(sent.blocks.len(), 3);
        assert_eq!(sent.template_id, Some(TemplateId(5)));
        assert_eq!(sent.blocks.iter().map(|b| b.order).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_new_report_blocks_follow_create_with_update() {
        let api = with_template();
        let mut d = ReportDraft::load_from_template(&api, TemplateId(5))
            .await
            .expect("template exists");
        d.meta.client_name = "ACME".to_string();
        let first = d.editor.blocks()[0].key;
        d.editor.remove_block(first).expect("first block exists");
        d.editor
            .update_block_field(0, BlockField::Content("edited".to_string()))
            .expect("index 0 is valid");

        let outcome = d.save_request().expect("valid").submit(&api).await;
        assert_eq!(outcome.expect("save succeeds"), SaveOutcome::Created(ReportId(77)));

        assert_eq!(api.created_reports.borrow().len(), 1);
        let updates = api.updated_reports.borrow();
        assert_eq!(updates.len(), 1);
        let (id, sent) = &updates[0];
        assert_eq!(*id, ReportId(77));
        assert_eq!(sent.blocks.len(), 2);
        assert_eq!(sent.blocks[0].content, "edited");
    }

    #[tokio::test]
    async fn test_new_blank_report_without_blocks_skips_update() {
        let api = with_template();
        let mut d = ReportDraft::load_blank(&api).await;
        d.meta.title = "T".to_string();
        d.meta.client_name = "C".to_string();

        d.save_request().expect("valid").submit(&api).await.expect("save succeeds");
        assert_eq!(api.created_reports.borrow().len(), 1);
        assert!(api.updated_reports.borrow().is_empty());
    }

    #[test]
    fn test_default_draft_is_unsaved_and_empty() {
        let d = ReportDraft::default();
        assert_eq!(d.id, None);
        assert!(d.editor.is_empty());
        assert_eq!(TemplateDraft::blank().id, None);
    }

    #[tokio::test]
    async fn test_existing_report_updates_in_place() {
        let report = Report {
            id: ReportId(12),
            report_number: Some("5001001".to_string()),
            proposal_number: None,
            title: "T".to_string(),
            client_name: "C".to_string(),
            template_id: None,
            created_by: None,
            created_at: String::new(),
            updated_at: String::new(),
            status: "draft".to_string(),
            blocks: vec![record("B", "", 1, false), record("A", "", 0, false)],
        };
        let api = FakeDocs {
            report: Some(report),
            ..Default::default()
        };
        let d = ReportDraft::load_existing(&api, ReportId(12))
            .await
            .expect("report exists");
        assert_eq!(d.editor.blocks()[0].title, "A");

        let outcome = d
            .save_request()
            .expect("valid")
            .submit(&api)
            .await
            .expect("save succeeds");
        assert_eq!(outcome, SaveOutcome::Updated(ReportId(12)));
        let sent = api.last_report.borrow().clone().expect("payload sent");
        assert_eq!(sent.report_number, "5001001");
    }

    #[tokio::test]
    async fn test_new_template_save_returns_created_id() {
        let api = FakeDocs::default();
        let mut d = TemplateDraft::blank();
        d.meta.name = "Mobile".to_string();
        d.editor.append_seed(BlockSeed {
            title: "Intro".to_string(),
            ..Default::default()
        });

        let outcome = d.save_request().expect("templates need no fields").submit(&api).await;
        assert_eq!(outcome.expect("save succeeds"), SaveOutcome::Created(TemplateId(41)));
        let sent = api.last_template.borrow().clone().expect("payload sent");
        assert_eq!(sent.name, "Mobile");
        assert_eq!(sent.blocks[0].title, "Intro");
    }

    #[tokio::test]
    async fn test_existing_template_save_reports_updated() {
        let api = with_template();
        let d = TemplateDraft::load_existing(&api, TemplateId(5))
            .await
            .expect("template exists");
        let outcome = d.save_request().expect("valid").submit(&api).await;
        assert_eq!(outcome.expect("save succeeds"), SaveOutcome::Updated(TemplateId(5)));
    }

    #[test]
    fn test_begin_save_refuses_second_submit() {
        let mut d = TemplateDraft::blank();
        d.meta.name = "x".to_string();
        let guard = InFlight::new();
        let (ticket, _req) = d.begin_save(&guard).expect("first save");
        assert!(matches!(d.begin_save(&guard), Err(DraftError::SaveInFlight)));
        drop(ticket);
        assert!(d.begin_save(&guard).is_ok());
    }

    #[test]
    fn test_invalid_report_does_not_take_ticket() {
        let d = ReportDraft::default();
        let guard = InFlight::new();
        assert!(matches!(d.begin_save(&guard), Err(DraftError::MissingField("title"))));
        assert!(!guard.is_busy());
    }

    #[test]
    fn test_parse_template_document() {
        let raw = br#"{"name":"Web","description":null,"blocks":[{"title":"Intro","content":"x","order":0}]}"#;
        let doc = parse_template_document(raw).expect("valid export");
        assert_eq!(doc.name, "Web");
        assert_eq!(doc.description, "");
        assert_eq!(doc.blocks.len(), 1);
        assert!(doc.blocks[0].block_type.is_text());
    }

    #[test]
    fn test_parse_template_document_rejects_bad_files() {
        assert!(matches!(
            parse_template_document(br#"{"name":"Web"}"#),
            Err(DraftError::InvalidImport(_))
        ));
        assert!(matches!(
            parse_template_document(br#"{"name":"  ","blocks":[]}"#),
            Err(DraftError::InvalidImport(_))
        ));
        assert!(parse_template_document(b"not json").is_err());
    }
}
