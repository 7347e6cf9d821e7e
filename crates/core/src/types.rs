//! Job request and result shapes.
//!
//! Field names follow the camelCase JSON the job producers send.

use serde::{Deserialize, Serialize};

use crate::scripting::ExtractOptions;

// ---------------------------------------------------------------------------
// Credentials and resources
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Credentials given inline or as an index into the job's credential list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRef {
    #[serde(default)]
    pub credentials: Option<Credentials>,
    #[serde(default)]
    pub credentials_index: Option<usize>,
}

impl CredentialsRef {
    /// Inline credentials win over the indexed entry.
    pub fn resolve(&self, pool: &[Credentials]) -> Option<Credentials> {
        self.credentials
            .clone()
            .or_else(|| self.credentials_index.and_then(|i| pool.get(i).cloned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResource {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Resource {
    pub bucket: String,
    pub key: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(flatten)]
    pub credentials: CredentialsRef,
}

/// A remote asset, discriminated by `fetchMethod`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fetchMethod", rename_all = "lowercase")]
pub enum Resource {
    Http(HttpResource),
    S3(S3Resource),
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn is_positive(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetLayer {
    /// Path of the footage inside the template, also the download location
    /// relative to the job output directory.
    pub relative_path: String,
    #[serde(default)]
    pub resource: Option<Resource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextLayer {
    pub name: String,
    pub value: String,
}

/// One parametrization of a render job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Layer {
    Asset(AssetLayer),
    Text(TextLayer),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTemplate {
    pub path: String,
    pub aep_name: String,
    pub composition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOutput {
    pub name: String,
    #[serde(default)]
    pub resolution: Option<Resolution>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    #[serde(flatten)]
    pub credentials: CredentialsRef,
    #[serde(default)]
    pub endpoint: Option<String>,
    pub bucket: String,
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub id: String,
    #[serde(default)]
    pub credentials: Vec<Credentials>,
    pub template: RenderTemplate,
    #[serde(default)]
    pub layers: Vec<Layer>,
    pub output: RenderOutput,
    pub upload: UploadRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeTemplate {
    pub path: String,
    #[serde(default, alias = "extract")]
    pub extract_options: ExtractOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub id: String,
    pub template: AnalyzeTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewOutput {
    #[serde(default)]
    pub name: Option<String>,
    pub om_template: String,
    #[serde(default)]
    pub start_frame: Option<u32>,
    #[serde(default)]
    pub end_frame: Option<u32>,
    #[serde(default)]
    pub increment: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewComposition {
    pub name: String,
    pub outputs: Vec<PreviewOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewAep {
    pub file_name: String,
    pub compositions: Vec<PreviewComposition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewTemplate {
    pub path: String,
    pub aeps: Vec<PreviewAep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub template: PreviewTemplate,
    pub resolutions: Vec<Resolution>,
}

// ---------------------------------------------------------------------------
// Upload target and results
// ---------------------------------------------------------------------------

/// Where an artifact goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    #[serde(default)]
    pub endpoint: Option<String>,
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResult {
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerMetadata {
    pub name: String,
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionMetadata {
    pub name: String,
    pub width: f64,
    pub height: f64,
    pub duration: f64,
    pub frame_rate: f64,
    #[serde(default)]
    pub layers: Vec<LayerMetadata>,
}

/// Extraction result of one project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectAnalysis {
    /// Path relative to the template root, starting with `/`.
    pub project: String,
    pub compositions: Vec<CompositionMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewEntry {
    pub project: String,
    pub name: String,
    pub previews: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn creds(id: &str) -> Credentials {
        Credentials {
            access_key_id: id.to_string(),
            secret_access_key: "secret".to_string(),
        }
    }

    #[test]
    fn render_request_parses_mixed_layers() {
        let req: RenderRequest = serde_json::from_value(json!({
            "id": "t1",
            "credentials": [{"accessKeyId": "AK", "secretAccessKey": "SK"}],
            "template": {"path": "A/B", "aepName": "p.aep", "composition": "Main"},
            "layers": [
                {
                    "relativePath": "/(Footage)/logo.png",
                    "resource": {"fetchMethod": "http", "url": "https://example.com/logo.png"}
                },
                {
                    "relativePath": "/(Footage)/bg.png",
                    "resource": {
                        "fetchMethod": "s3",
                        "bucket": "assets",
                        "key": "bg.png",
                        "endpoint": "ams3.example.com",
                        "credentialsIndex": 0
                    }
                },
                {"name": "Title", "value": "Hello"}
            ],
            "output": {"name": "Out", "resolution": {"width": 1920, "height": 1080}},
            "upload": {"credentialsIndex": 0, "endpoint": "e", "bucket": "b"}
        }))
        .expect("parse");

        assert_eq!(req.layers.len(), 3);
        assert_matches!(
            &req.layers[0],
            Layer::Asset(AssetLayer { resource: Some(Resource::Http(_)), .. })
        );
        assert_matches!(
            &req.layers[1],
            Layer::Asset(AssetLayer { resource: Some(Resource::S3(s3)), .. })
                if s3.credentials.credentials_index == Some(0)
        );
        assert_matches!(&req.layers[2], Layer::Text(t) if t.value == "Hello");
        assert_eq!(
            req.upload.credentials.resolve(&req.credentials).map(|c| c.access_key_id),
            Some("AK".to_string())
        );
        assert_eq!(req.upload.key, None);
    }

    #[test]
    fn inline_credentials_win() {
        let r = CredentialsRef {
            credentials: Some(creds("inline")),
            credentials_index: Some(0),
        };
        assert_eq!(r.resolve(&[creds("pooled")]), Some(creds("inline")));
    }

    #[test]
    fn out_of_range_index_resolves_to_none() {
        let r = CredentialsRef {
            credentials: None,
            credentials_index: Some(3),
        };
        assert_eq!(r.resolve(&[creds("pooled")]), None);
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let rendered = format!("{:?}", creds("AK"));
        assert!(rendered.contains("AK"));
        assert!(!rendered.contains("secret\""));
    }

    #[test]
    fn preview_request_parses() {
        let req: PreviewRequest = serde_json::from_value(json!({
            "template": {
                "path": "User/T",
                "aeps": [{
                    "fileName": "project.aep",
                    "compositions": [{
                        "name": "Main",
                        "outputs": [
                            {"omTemplate": "JPEG", "startFrame": 90, "endFrame": 90},
                            {"omTemplate": "CineForm", "increment": 30}
                        ]
                    }]
                }]
            },
            "resolutions": [{"width": 1920, "height": 1080}]
        }))
        .expect("parse");
        let outputs = &req.template.aeps[0].compositions[0].outputs;
        assert_eq!(outputs[0].start_frame, Some(90));
        assert_eq!(outputs[1].increment, Some(30));
    }

    #[test]
    fn analyze_request_defaults_extract_options() {
        let req: AnalyzeRequest =
            serde_json::from_value(json!({"id": "a1", "template": {"path": "User/T"}}))
                .expect("parse");
        assert_eq!(req.template.extract_options, ExtractOptions::default());
    }
}
