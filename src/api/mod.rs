use crate::models::{
    CreateFavoriteRequest, FavoriteBlock, FavoriteId, FavoriteSaved, ImageListResponse,
    ImageUploaded, LoginRequest, LoginResponse, NextNumberResponse, Report, ReportCreated,
    ReportId, ReportPayload, Template, TemplateDocument, TemplateId, TemplatePayload,
    TemplateSaved, UpdateFavoriteRequest, User,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    Unauthorized,
    NotFound,
    Network,
    Http,
    Parse,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    pub(crate) fn network(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            status: None,
            message: format!("Network error: {e}"),
        }
    }

    pub(crate) fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            status: None,
            message: format!("Unexpected response: {e}"),
        }
    }

    pub(crate) fn unauthorized() -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            status: Some(401),
            message: "Unauthorized".to_string(),
        }
    }

    pub(crate) fn not_found(ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::NotFound,
            status: Some(404),
            message: format!("{ctx}: not found"),
        }
    }

    pub(crate) fn http(status: u16, body: &str, ctx: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("{ctx} ({status})")
        } else {
            format!("{ctx} ({status}): {body}")
        };
        Self {
            kind: ApiErrorKind::Http,
            status: Some(status),
            message,
        }
    }

    /// Failures the user may reasonably retry by re-triggering the action.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ApiErrorKind::Network => true,
            ApiErrorKind::Http => self.status.map(|s| s >= 500).unwrap_or(true),
            _ => false,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Map a non-success HTTP status to an error. `None` for 2xx.
pub(crate) fn classify_status(status: u16, body: &str, ctx: &str) -> Option<ApiError> {
    match status {
        200..=299 => None,
        401 => Some(ApiError::unauthorized()),
        404 => Some(ApiError::not_found(ctx)),
        _ => Some(ApiError::http(status, body, ctx)),
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    pub(crate) base_url: String,
    pub(crate) token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: crate::config::normalize_base_url(&base_url.into()),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn builder(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = reqwest::Client::new().request(method, self.url(path));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        // The backend also relies on its session cookie.
        #[cfg(target_arch = "wasm32")]
        {
            req = req.fetch_credentials_include();
        }
        req
    }

    async fn execute(&self, req: reqwest::RequestBuilder, ctx: &str) -> ApiResult<reqwest::Response> {
        let res = req.send().await.map_err(|e| {
            log::warn!("{ctx}: {e}");
            ApiError::network(e)
        })?;

        let status = res.status().as_u16();
        if (200..300).contains(&status) {
            return Ok(res);
        }

        let body = res.text().await.unwrap_or_default();
        let err = classify_status(status, &body, ctx)
            .unwrap_or_else(|| ApiError::http(status, &body, ctx));
        log::warn!("{ctx} failed: {err}");
        Err(err)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, ctx: &str) -> ApiResult<T> {
        let res = self.execute(self.builder(Method::GET, path), ctx).await?;
        res.json().await.map_err(ApiError::parse)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &impl Serialize,
        ctx: &str,
    ) -> ApiResult<T> {
        let res = self.execute(self.builder(method, path).json(body), ctx).await?;
        res.json().await.map_err(ApiError::parse)
    }

    async fn send_unit(&self, method: Method, path: &str, body: Option<&impl Serialize>, ctx: &str) -> ApiResult<()> {
        let mut req = self.builder(method, path);
        if let Some(b) = body {
            req = req.json(b);
        }
        self.execute(req, ctx).await.map(|_| ())
    }

    async fn get_bytes(&self, path: &str, ctx: &str) -> ApiResult<Vec<u8>> {
        let res = self.execute(self.builder(Method::GET, path), ctx).await?;
        res.bytes().await.map(|b| b.to_vec()).map_err(ApiError::network)
    }

    // Session

    pub async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        let req = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.send_json(Method::POST, "/api/login", &req, "Login").await
    }

    pub async fn logout(&self) -> ApiResult<()> {
        self.send_unit(Method::POST, "/api/logout", None::<&()>, "Logout").await
    }

    pub async fn current_user(&self) -> ApiResult<User> {
        self.get_json("/api/user", "Load current user").await
    }

    // Templates

    pub async fn list_templates(&self) -> ApiResult<Vec<Template>> {
        self.get_json("/api/templates", "Load templates").await
    }

    pub async fn get_template(&self, id: TemplateId) -> ApiResult<Template> {
        self.get_json(&format!("/api/templates/{id}"), "Load template").await
    }

    pub async fn create_template(&self, payload: &TemplatePayload) -> ApiResult<TemplateSaved> {
        self.send_json(Method::POST, "/api/templates", payload, "Create template")
            .await
    }

    pub async fn update_template(
        &self,
        id: TemplateId,
        payload: &TemplatePayload,
    ) -> ApiResult<TemplateSaved> {
        self.send_json(
            Method::PUT,
            &format!("/api/templates/{id}"),
            payload,
            "Update template",
        )
        .await
    }

    pub async fn delete_template(&self, id: TemplateId) -> ApiResult<()> {
        self.send_unit(
            Method::DELETE,
            &format!("/api/templates/{id}"),
            None::<&()>,
            "Delete template",
        )
        .await
    }

    pub async fn export_template(&self, id: TemplateId) -> ApiResult<Vec<u8>> {
        self.get_bytes(&format!("/api/templates/{id}/export"), "Export template")
            .await
    }

    pub async fn import_template(&self, doc: &TemplateDocument) -> ApiResult<TemplateSaved> {
        self.send_json(Method::POST, "/api/templates/import", doc, "Import template")
            .await
    }

    // Reports

    pub async fn list_reports(&self) -> ApiResult<Vec<Report>> {
        self.get_json("/api/reports", "Load reports").await
    }

    pub async fn get_report(&self, id: ReportId) -> ApiResult<Report> {
        self.get_json(&format!("/api/reports/{id}"), "Load report").await
    }

    pub async fn create_report(&self, payload: &ReportPayload) -> ApiResult<ReportCreated> {
        self.send_json(Method::POST, "/api/reports", payload, "Create report")
            .await
    }

    pub async fn update_report(&self, id: ReportId, payload: &ReportPayload) -> ApiResult<()> {
        self.send_unit(
            Method::PUT,
            &format!("/api/reports/{id}"),
            Some(payload),
            "Update report",
        )
        .await
    }

    pub async fn delete_report(&self, id: ReportId) -> ApiResult<()> {
        self.send_unit(
            Method::DELETE,
            &format!("/api/reports/{id}"),
            None::<&()>,
            "Delete report",
        )
        .await
    }

    pub async fn next_report_number(&self) -> ApiResult<String> {
        let r: NextNumberResponse = self
            .get_json("/api/reports/next-number", "Load next report number")
            .await?;
        Ok(r.next_number)
    }

    pub async fn report_pdf(&self, id: ReportId) -> ApiResult<Vec<u8>> {
        self.get_bytes(&format!("/api/reports/{id}/pdf"), "Generate PDF")
            .await
    }

    // Favorite blocks

    pub async fn list_favorites(&self) -> ApiResult<Vec<FavoriteBlock>> {
        self.get_json("/api/block-templates", "Load favorite blocks").await
    }

    pub async fn get_favorite(&self, id: FavoriteId) -> ApiResult<FavoriteBlock> {
        self.get_json(&format!("/api/block-templates/{id}"), "Load favorite block")
            .await
    }

    pub async fn create_favorite(&self, req: &CreateFavoriteRequest) -> ApiResult<FavoriteBlock> {
        let saved: FavoriteSaved = self
            .send_json(Method::POST, "/api/block-templates", req, "Save favorite block")
            .await?;
        Ok(saved.block_template)
    }

    pub async fn update_favorite(
        &self,
        id: FavoriteId,
        req: &UpdateFavoriteRequest,
    ) -> ApiResult<FavoriteBlock> {
        let saved: FavoriteSaved = self
            .send_json(
                Method::PUT,
                &format!("/api/block-templates/{id}"),
                req,
                "Update favorite block",
            )
            .await?;
        Ok(saved.block_template)
    }

    pub async fn delete_favorite(&self, id: FavoriteId) -> ApiResult<()> {
        self.send_unit(
            Method::DELETE,
            &format!("/api/block-templates/{id}"),
            None::<&()>,
            "Delete favorite block",
        )
        .await
    }

    // Images

    pub async fn list_images(&self, template_id: TemplateId) -> ApiResult<Vec<String>> {
        let r: ImageListResponse = self
            .get_json(&format!("/api/images?template_id={template_id}"), "Load images")
            .await?;
        Ok(r.into_urls())
    }

    pub async fn upload_image(
        &self,
        template_id: TemplateId,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> ApiResult<ImageUploaded> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(ApiError::parse)?;
        let form = reqwest::multipart::Form::new()
            .text("template_id", template_id.to_string())
            .part("image", part);

        let req = self.builder(Method::POST, "/api/images/upload").multipart(form);
        let res = self.execute(req, "Upload image").await?;
        res.json().await.map_err(ApiError::parse)
    }

    pub async fn delete_image(&self, template_id: TemplateId, file_name: &str) -> ApiResult<()> {
        let path = format!(
            "/api/images/{}?template_id={template_id}",
            urlencoding::encode(file_name)
        );
        self.send_unit(Method::DELETE, &path, None::<&()>, "Delete image")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_client_new_normalizes_base_url() {
        let client = ApiClient::new("http://localhost:5001/");
        assert_eq!(client.base_url, "http://localhost:5001");
        assert!(client.token.is_none());
    }

    #[test]
    fn test_api_client_with_token() {
        let client = ApiClient::new("http://localhost:5001").with_token(Some("t".to_string()));
        assert_eq!(client.token.as_deref(), Some("t"));
        assert_eq!(client.url("/api/user"), "http://localhost:5001/api/user");
    }

    #[test]
    fn test_classify_status() {
        assert!(classify_status(200, "", "x").is_none());
        assert!(classify_status(204, "", "x").is_none());
        assert_eq!(
            classify_status(401, "", "x").map(|e| e.kind),
            Some(ApiErrorKind::Unauthorized)
        );
        assert_eq!(
            classify_status(404, "", "Load report").map(|e| e.kind),
            Some(ApiErrorKind::NotFound)
        );
        let e = classify_status(500, "boom", "Save").expect("error");
        assert_eq!(e.kind, ApiErrorKind::Http);
        assert_eq!(e.to_string(), "Save (500): boom");
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ApiError::network("offline").is_retryable());
        assert!(ApiError::http(503, "", "x").is_retryable());
        assert!(!ApiError::http(400, "bad", "x").is_retryable());
        assert!(!ApiError::unauthorized().is_retryable());
        assert!(!ApiError::not_found("x").is_retryable());
    }
}
