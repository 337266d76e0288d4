//! GraphQL documents sent to the Admin API.

/// Fields requested for every file node. Each subtype exposes its URL in a
/// different place.
const FILE_FIELDS: &str = r#"
    __typename
    id
    alt
    fileStatus
    fileErrors { code message }
    ... on GenericFile { url }
    ... on MediaImage { image { url } }
    ... on Video { sources { url } }
    ... on Model3d { sources { url } }
"#;

pub const STAGED_UPLOADS_CREATE: &str = r#"
mutation stagedUploadsCreate($input: [StagedUploadInput!]!) {
  stagedUploadsCreate(input: $input) {
    stagedTargets {
      url
      resourceUrl
      parameters { name value }
    }
    userErrors { field message }
  }
}
"#;

pub fn file_create() -> String {
    format!(
        r#"
mutation fileCreate($files: [FileCreateInput!]!) {{
  fileCreate(files: $files) {{
    files {{ {FILE_FIELDS} }}
    userErrors {{ field message }}
  }}
}}
"#
    )
}

pub fn file_status() -> String {
    format!(
        r#"
query fileStatus($id: ID!) {{
  node(id: $id) {{
    __typename
    id
    ... on File {{ {FILE_FIELDS} }}
  }}
}}
"#
    )
}

pub fn list_files() -> String {
    format!(
        r#"
query listFiles($first: Int!, $after: String) {{
  files(first: $first, after: $after) {{
    nodes {{ {FILE_FIELDS} }}
    pageInfo {{ hasNextPage endCursor }}
  }}
}}
"#
    )
}

pub const FILE_DELETE: &str = r#"
mutation fileDelete($fileIds: [ID!]!) {
  fileDelete(fileIds: $fileIds) {
    deletedFileIds
    userErrors { field message }
  }
}
"#;
