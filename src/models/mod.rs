use crate::blocks::BlockType;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Treat an explicit JSON `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

macro_rules! server_id {
    ($name:ident) => {
        /// Server-assigned identity. Never mixed with client-local block keys.
        #[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map($name)
            }
        }
    };
}

server_id!(TemplateId);
server_id!(ReportId);
server_id!(FavoriteId);

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Viewer,
}

impl Role {
    pub fn can_edit_documents(self) -> bool {
        !matches!(self, Role::Viewer)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
    #[serde(default)]
    pub is_admin: bool,
}

/// A block as the server returns it inside a Template or Report.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BlockRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub block_type: BlockType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub page_break_before: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub created_by: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default)]
    pub blocks: Vec<BlockRecord>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Report {
    pub id: ReportId,
    // Older backends only send `proposal_number`; newer ones send both.
    #[serde(default)]
    pub report_number: Option<String>,
    #[serde(default, skip_serializing)]
    pub proposal_number: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub client_name: String,
    #[serde(default)]
    pub template_id: Option<TemplateId>,
    #[serde(default)]
    pub created_by: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default)]
    pub blocks: Vec<BlockRecord>,
}

impl Report {
    pub fn number(&self) -> &str {
        self.report_number
            .as_deref()
            .or(self.proposal_number.as_deref())
            .unwrap_or_default()
    }
}

/// A named, owner-scoped snapshot of a block's content fields.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FavoriteBlock {
    pub id: FavoriteId,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default)]
    pub block_type: BlockType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub page_break_before: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NextNumberResponse {
    pub next_number: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    pub user: User,
    pub token: String,
}

/// Block shape submitted on save. Identity and parent references are left to the server.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BlockPayload {
    pub title: String,
    pub content: String,
    pub order: u32,
    pub block_type: BlockType,
    pub page_break_before: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TemplatePayload {
    pub name: String,
    pub description: String,
    pub blocks: Vec<BlockPayload>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ReportPayload {
    pub title: String,
    pub client_name: String,
    pub report_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<TemplateId>,
    pub blocks: Vec<BlockPayload>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TemplateSaved {
    pub template_id: TemplateId,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReportCreated {
    #[serde(default)]
    pub report_id: Option<ReportId>,
    #[serde(default)]
    pub proposal_id: Option<ReportId>,
}

impl ReportCreated {
    pub fn id(&self) -> Option<ReportId> {
        self.report_id.or(self.proposal_id)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CreateFavoriteRequest {
    pub name: String,
    pub title: String,
    pub content: String,
    pub block_type: BlockType,
    pub page_break_before: bool,
}

/// Partial update; absent fields are left untouched by the server.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct UpdateFavoriteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_type: Option<BlockType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_break_before: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FavoriteSaved {
    pub block_template: FavoriteBlock,
}

/// Portable template document produced by export and accepted by import.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TemplateDocument {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub blocks: Vec<TemplateDocumentBlock>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TemplateDocumentBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub block_type: BlockType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub page_break_before: bool,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
pub(crate) enum ImageListResponse {
    Bare(Vec<String>),
    Wrapped {
        #[serde(default)]
        images: Vec<String>,
    },
}

impl ImageListResponse {
    pub fn into_urls(self) -> Vec<String> {
        match self {
            ImageListResponse::Bare(urls) => urls,
            ImageListResponse::Wrapped { images } => images,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ImageUploaded {
    pub url: String,
    #[serde(default)]
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_contract_deserialize() {
        let json = r#"{
            "id": 7,
            "name": "Pentest Web",
            "description": null,
            "created_by": 1,
            "created_at": "2025-06-26T10:00:00",
            "blocks": [
                {"id": 11, "title": "Scope", "content": "In scope: {{REPORT_CLIENT}}", "order": 0, "block_type": "text", "page_break_before": null},
                {"id": 12, "title": "Findings", "content": "", "order": 1, "block_type": null, "page_break_before": true}
            ]
        }"#;
        let t: Template = serde_json::from_str(json).expect("template should parse");
        assert_eq!(t.id, TemplateId(7));
        assert_eq!(t.description, "");
        assert_eq!(t.blocks.len(), 2);
        assert!(!t.blocks[0].page_break_before);
        assert_eq!(t.blocks[1].block_type, BlockType::default());
        assert!(t.blocks[1].page_break_before);
    }

    #[test]
    fn test_report_number_accepts_legacy_key() {
        let json = r#"{"id": 3, "proposal_number": "4002507", "report_number": "4002507", "title": "T", "client_name": "C", "blocks": []}"#;
        let r: Report = serde_json::from_str(json).expect("report should parse");
        assert_eq!(r.number(), "4002507");

        let legacy = r#"{"id": 4, "proposal_number": "4002508", "title": "T", "client_name": "C"}"#;
        let r: Report = serde_json::from_str(legacy).expect("legacy report should parse");
        assert_eq!(r.number(), "4002508");
    }

    #[test]
    fn test_report_payload_omits_missing_template() {
        let payload = ReportPayload {
            title: "T".to_string(),
            client_name: "C".to_string(),
            report_number: "1".to_string(),
            template_id: None,
            blocks: vec![],
        };
        let v = serde_json::to_value(payload).expect("should serialize");
        assert!(v.get("template_id").is_none());
        assert_eq!(v["report_number"], "1");
    }

    #[test]
    fn test_block_payload_has_exactly_the_persisted_fields() {
        let b = BlockPayload {
            title: "Scope".to_string(),
            content: "body".to_string(),
            order: 2,
            block_type: BlockType::default(),
            page_break_before: true,
        };
        let v = serde_json::to_value(b).expect("should serialize");
        let mut keys: Vec<_> = v.as_object().expect("object").keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["block_type", "content", "order", "page_break_before", "title"]
        );
        assert_eq!(v["block_type"], "text");
    }

    #[test]
    fn test_update_favorite_request_skips_absent_fields() {
        let req = UpdateFavoriteRequest {
            name: Some("Intro".to_string()),
            ..Default::default()
        };
        let v = serde_json::to_value(req).expect("should serialize");
        assert_eq!(v, serde_json::json!({"name": "Intro"}));
    }

    #[test]
    fn test_report_created_accepts_either_id_key() {
        let r: ReportCreated =
            serde_json::from_str(r#"{"success": true, "proposal_id": 9, "report_id": 9}"#)
                .expect("should parse");
        assert_eq!(r.id(), Some(ReportId(9)));
        let r: ReportCreated =
            serde_json::from_str(r#"{"success": true, "proposal_id": 5}"#).expect("should parse");
        assert_eq!(r.id(), Some(ReportId(5)));
    }

    #[test]
    fn test_image_list_accepts_both_shapes() {
        let bare: ImageListResponse =
            serde_json::from_str(r#"["/static/uploads/template_1/a.png"]"#).expect("bare");
        assert_eq!(bare.into_urls().len(), 1);
        let wrapped: ImageListResponse =
            serde_json::from_str(r#"{"images": ["/a.png", "/b.png"]}"#).expect("wrapped");
        assert_eq!(wrapped.into_urls(), vec!["/a.png", "/b.png"]);
    }

    #[test]
    fn test_template_document_requires_name_and_blocks() {
        assert!(serde_json::from_str::<TemplateDocument>(r#"{"name": "x"}"#).is_err());
        assert!(serde_json::from_str::<TemplateDocument>(r#"{"blocks": []}"#).is_err());
        let doc: TemplateDocument =
            serde_json::from_str(r#"{"name": "x", "blocks": [{"title": "a"}]}"#).expect("valid");
        assert_eq!(doc.blocks[0].content, "");
    }

    #[test]
    fn test_role_gate() {
        let u: User = serde_json::from_str(
            r#"{"id": 1, "username": "ana", "email": "a@x", "role": "viewer", "is_admin": false}"#,
        )
        .expect("user should parse");
        assert!(!u.role.can_edit_documents());
        assert!(Role::Manager.can_edit_documents());
        assert_eq!(Role::Admin.to_string(), "admin");
    }
}
