//! Wire types for the Admin GraphQL API and the domain types derived from
//! them.

use serde::{Deserialize, Serialize};

/// Standard GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// Field-level error returned inside a mutation payload.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) if !field.is_empty() => write!(f, "{}: {}", field.join("."), self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// Join user errors into a single diagnostic line.
pub fn describe_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// HTTP method the blob store expects for a staged transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransferMethod {
    Post,
    Put,
}

/// Input to `stagedUploadsCreate`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedUploadInput {
    pub filename: String,
    pub mime_type: String,
    /// Decimal byte count; the API types this as a string.
    pub file_size: String,
    pub resource: &'static str,
    pub http_method: TransferMethod,
}

impl StagedUploadInput {
    pub fn image(filename: &str, mime_type: &str, byte_len: usize) -> Self {
        Self {
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            file_size: byte_len.to_string(),
            resource: "IMAGE",
            http_method: TransferMethod::Post,
        }
    }
}

/// One-time upload location issued by the platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedTarget {
    pub url: String,
    pub resource_url: String,
    /// Order matters: signed form posts validate fields positionally.
    #[serde(default)]
    pub parameters: Vec<StagedParameter>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StagedParameter {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedUploadsData {
    pub staged_uploads_create: Option<StagedUploadsPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedUploadsPayload {
    #[serde(default)]
    pub staged_targets: Vec<StagedTarget>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

/// Platform-side processing state of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Uploaded,
    Processing,
    Ready,
    Failed,
    Unknown(String),
}

impl FileStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("UPLOADED") => FileStatus::Uploaded,
            Some("PROCESSING") => FileStatus::Processing,
            Some("READY") => FileStatus::Ready,
            Some("FAILED") => FileStatus::Failed,
            Some(other) => FileStatus::Unknown(other.to_string()),
            None => FileStatus::Unknown("UNKNOWN".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FileStatus::Uploaded => "UPLOADED",
            FileStatus::Processing => "PROCESSING",
            FileStatus::Ready => "READY",
            FileStatus::Failed => "FAILED",
            FileStatus::Unknown(raw) => raw,
        }
    }

}

/// The concrete file subtype, each carrying the URL where that subtype
/// exposes it once available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetKind {
    GenericFile { url: Option<String> },
    MediaImage { url: Option<String> },
    Video { url: Option<String> },
    Model3d { url: Option<String> },
}

impl AssetKind {
    pub fn url(&self) -> Option<&str> {
        match self {
            AssetKind::GenericFile { url }
            | AssetKind::MediaImage { url }
            | AssetKind::Video { url }
            | AssetKind::Model3d { url } => url.as_deref().filter(|u| !u.is_empty()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AssetKind::GenericFile { .. } => "GenericFile",
            AssetKind::MediaImage { .. } => "MediaImage",
            AssetKind::Video { .. } => "Video",
            AssetKind::Model3d { .. } => "Model3d",
        }
    }
}

/// A file as seen by this relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedAsset {
    pub id: String,
    pub kind: AssetKind,
    pub status: FileStatus,
    /// Platform-reported processing errors, if any.
    pub errors: Vec<String>,
}

impl CreatedAsset {
    pub fn url(&self) -> Option<&str> {
        self.kind.url()
    }
}

/// Raw file node covering every subtype's fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    /// Empty when the node is not a file and the selection came back bare.
    #[serde(rename = "__typename", default)]
    pub typename: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub file_status: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    /// `GenericFile.url`
    #[serde(default)]
    pub url: Option<String>,
    /// `MediaImage.image`
    #[serde(default)]
    pub image: Option<UrlRef>,
    /// `Video.sources` / `Model3d.sources`
    #[serde(default)]
    pub sources: Option<Vec<UrlRef>>,
    #[serde(default)]
    pub file_errors: Vec<FileError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrlRef {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `__typename` values implementing the `File` interface.
const FILE_TYPENAMES: [&str; 4] = ["GenericFile", "MediaImage", "Video", "Model3d"];

impl FileNode {
    pub fn is_file(&self) -> bool {
        FILE_TYPENAMES.contains(&self.typename.as_str())
    }

    fn first_source(&self) -> Option<String> {
        self.sources
            .as_ref()
            .and_then(|s| s.iter().find_map(|r| r.url.clone()))
    }

    /// Interpret the node as one of the known file subtypes.
    pub fn into_asset(self) -> Result<CreatedAsset, String> {
        let kind = match self.typename.as_str() {
            "GenericFile" => AssetKind::GenericFile { url: self.url.clone() },
            "MediaImage" => AssetKind::MediaImage {
                url: self.image.as_ref().and_then(|i| i.url.clone()),
            },
            "Video" => AssetKind::Video { url: self.first_source() },
            "Model3d" => AssetKind::Model3d { url: self.first_source() },
            other => return Err(format!("unsupported file type '{}'", other)),
        };
        let errors = self
            .file_errors
            .iter()
            .map(|e| match (&e.code, &e.message) {
                (Some(code), Some(msg)) => format!("{}: {}", code, msg),
                (None, Some(msg)) => msg.clone(),
                (Some(code), None) => code.clone(),
                (None, None) => "unspecified error".to_string(),
            })
            .collect();

        Ok(CreatedAsset {
            id: self.id,
            kind,
            status: FileStatus::parse(self.file_status.as_deref()),
            errors,
        })
    }

    /// Any URL the node exposes, regardless of subtype.
    pub fn any_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| self.image.as_ref().and_then(|i| i.url.clone()))
            .or_else(|| self.first_source())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCreateData {
    pub file_create: Option<FileCreatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCreatePayload {
    #[serde(default)]
    pub files: Vec<FileNode>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
pub struct NodeData {
    pub node: Option<FileNode>,
}

#[derive(Debug, Deserialize)]
pub struct FilesData {
    pub files: FileConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConnection {
    #[serde(default)]
    pub nodes: Vec<FileNode>,
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDeleteData {
    pub file_delete: Option<FileDeletePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDeletePayload {
    #[serde(default)]
    pub deleted_file_ids: Option<Vec<String>>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

/// Outcome of one delete call: ids the platform confirmed plus any
/// field errors it raised for the rest.
#[derive(Debug, Clone, Default)]
pub struct DeleteOutcome {
    pub deleted_ids: Vec<String>,
    pub user_errors: Vec<UserError>,
}
