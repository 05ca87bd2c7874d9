//! Firestore-backed document store, speaking the REST v1 API directly.
//!
//! Documents are stored with the wire shape the downstream consumers
//! already read: parallel `DETECT_LIST` / `CONFIDENCE_LIST` arrays plus a
//! `BOX_LIST` map keyed `box1..boxN`.

use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use rxtract_core::{BoundingBox, DocumentStatus, PredictionDocument};
use serde_json::{Map, Value, json};
use url::Url;

use super::{DocumentStore, DocumentUpdate};
use crate::credentials::TokenProvider;
use crate::{GcpCredentials, StorageError, StorageResult, TRACING_TARGET_DOCUMENT};

const DEFAULT_COLLECTION: &str = "predictions";

const FIELD_IMAGE_NAME: &str = "IMAGE_NAME";
const FIELD_IMAGE_URL: &str = "IMAGE_URL";
const FIELD_DETECT_LIST: &str = "DETECT_LIST";
const FIELD_CONFIDENCE_LIST: &str = "CONFIDENCE_LIST";
const FIELD_BOX_LIST: &str = "BOX_LIST";
const FIELD_STATUS: &str = "STATUS";
const FIELD_CREATED_AT: &str = "CREATED_AT";

/// Prediction documents persisted to a Firestore collection.
pub struct FirestoreStore {
    http_client: reqwest::Client,
    token_provider: TokenProvider,
    documents_url: Url,
    collection: String,
}

impl FirestoreStore {
    /// Creates a store for the default database of the credential's project.
    pub fn new(credentials: GcpCredentials) -> StorageResult<Self> {
        if credentials.project_id.is_empty() {
            return Err(StorageError::credentials(
                "service account key has no project_id",
            ));
        }

        let documents_url = format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents/",
            credentials.project_id
        )
        .parse()
        .map_err(|e| StorageError::init(format!("invalid firestore url: {e}")))?;

        Self::with_documents_url(credentials, documents_url)
    }

    /// Creates a store pointed at an explicit documents endpoint. Intended
    /// for the Firestore emulator and tests.
    pub fn with_documents_url(
        credentials: GcpCredentials,
        documents_url: Url,
    ) -> StorageResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(StorageError::Transport)?;

        Ok(Self {
            http_client,
            token_provider: TokenProvider::new(credentials)?,
            documents_url,
            collection: DEFAULT_COLLECTION.to_owned(),
        })
    }

    /// Overrides the collection name.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    fn collection_url(&self) -> StorageResult<Url> {
        self.documents_url
            .join(&self.collection)
            .map_err(|e| StorageError::init(format!("invalid collection url: {e}")))
    }

    fn document_url(&self, id: &str) -> StorageResult<Url> {
        self.documents_url
            .join(&format!("{}/{}", self.collection, id))
            .map_err(|e| StorageError::init(format!("invalid document url: {e}")))
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn create(&self, document: &PredictionDocument) -> StorageResult<String> {
        let token = self.token_provider.access_token().await?;
        let body = json!({ "fields": encode_document(document) });

        let response = self
            .http_client
            .post(self.collection_url()?)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::create_document(format!(
                "firestore returned {status}: {body}"
            )));
        }

        let created: Value = response
            .json()
            .await
            .map_err(|e| StorageError::create_document(format!("invalid response: {e}")))?;

        let id = document_id(&created)?;

        tracing::info!(
            target: TRACING_TARGET_DOCUMENT,
            document_id = %id,
            image = %document.image_name,
            "prediction document created"
        );

        Ok(id)
    }

    async fn update(&self, id: &str, update: DocumentUpdate) -> StorageResult<()> {
        if update.is_empty() {
            return Ok(());
        }

        let token = self.token_provider.access_token().await?;
        let (fields, mask) = encode_update(&update);

        let mut url = self.document_url(id)?;
        {
            let mut pairs = url.query_pairs_mut();
            for field in &mask {
                pairs.append_pair("updateMask.fieldPaths", field);
            }
        }

        let response = self
            .http_client
            .patch(url)
            .bearer_auth(token)
            .json(&json!({ "fields": fields }))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::not_found(id));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::update_document(format!(
                "firestore returned {status}: {body}"
            )));
        }

        tracing::debug!(
            target: TRACING_TARGET_DOCUMENT,
            document_id = %id,
            fields = ?mask,
            "prediction document updated"
        );

        Ok(())
    }

    async fn fetch(&self, id: &str) -> StorageResult<PredictionDocument> {
        let token = self.token_provider.access_token().await?;

        let response = self
            .http_client
            .get(self.document_url(id)?)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::not_found(id));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::malformed_document(format!(
                "firestore returned {status}: {body}"
            )));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| StorageError::malformed_document(format!("invalid response: {e}")))?;

        decode_document(&raw)
    }
}

impl std::fmt::Debug for FirestoreStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreStore")
            .field("documents_url", &self.documents_url.as_str())
            .field("collection", &self.collection)
            .finish()
    }
}

// Firestore value encoding.

fn string_value(s: &str) -> Value {
    json!({ "stringValue": s })
}

fn double_value(v: f64) -> Value {
    json!({ "doubleValue": v })
}

fn timestamp_value(ts: Timestamp) -> Value {
    json!({ "timestampValue": ts.to_string() })
}

fn array_value(values: Vec<Value>) -> Value {
    json!({ "arrayValue": { "values": values } })
}

fn map_value(fields: Map<String, Value>) -> Value {
    json!({ "mapValue": { "fields": fields } })
}

fn encode_boxes(boxes: &[BoundingBox]) -> Value {
    let mut fields = Map::new();
    for (i, b) in boxes.iter().enumerate() {
        let mut coords = Map::new();
        coords.insert("x1".into(), double_value(f64::from(b.x1)));
        coords.insert("y1".into(), double_value(f64::from(b.y1)));
        coords.insert("x2".into(), double_value(f64::from(b.x2)));
        coords.insert("y2".into(), double_value(f64::from(b.y2)));
        fields.insert(format!("box{}", i + 1), map_value(coords));
    }
    map_value(fields)
}

fn encode_texts(texts: &[String]) -> Value {
    array_value(texts.iter().map(|t| string_value(t)).collect())
}

fn encode_confidences(confidences: &[f32]) -> Value {
    array_value(
        confidences
            .iter()
            .map(|c| double_value(f64::from(*c)))
            .collect(),
    )
}

fn encode_document(document: &PredictionDocument) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(FIELD_IMAGE_NAME.into(), string_value(&document.image_name));
    fields.insert(FIELD_IMAGE_URL.into(), string_value(&document.image_url));
    fields.insert(FIELD_DETECT_LIST.into(), encode_texts(&document.texts));
    fields.insert(
        FIELD_CONFIDENCE_LIST.into(),
        encode_confidences(&document.confidences),
    );
    fields.insert(FIELD_BOX_LIST.into(), encode_boxes(&document.boxes));
    fields.insert(
        FIELD_STATUS.into(),
        string_value(document.status.as_ref()),
    );
    fields.insert(
        FIELD_CREATED_AT.into(),
        timestamp_value(document.created_at),
    );
    fields
}

fn encode_update(update: &DocumentUpdate) -> (Map<String, Value>, Vec<&'static str>) {
    let mut fields = Map::new();
    let mut mask = Vec::new();

    if let Some(ref texts) = update.texts {
        fields.insert(FIELD_DETECT_LIST.into(), encode_texts(texts));
        mask.push(FIELD_DETECT_LIST);
    }
    if let Some(ref confidences) = update.confidences {
        fields.insert(FIELD_CONFIDENCE_LIST.into(), encode_confidences(confidences));
        mask.push(FIELD_CONFIDENCE_LIST);
    }
    if let Some(ref boxes) = update.boxes {
        fields.insert(FIELD_BOX_LIST.into(), encode_boxes(boxes));
        mask.push(FIELD_BOX_LIST);
    }
    if let Some(status) = update.status {
        fields.insert(FIELD_STATUS.into(), string_value(status.as_ref()));
        mask.push(FIELD_STATUS);
    }

    (fields, mask)
}

// Firestore value decoding.

fn malformed(reason: impl Into<String>) -> StorageError {
    StorageError::malformed_document(reason)
}

fn document_id(raw: &Value) -> StorageResult<String> {
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("response has no document name"))?;
    name.rsplit('/')
        .next()
        .map(str::to_owned)
        .ok_or_else(|| malformed("document name has no id segment"))
}

fn decode_string(fields: &Map<String, Value>, key: &str) -> StorageResult<String> {
    fields
        .get(key)
        .and_then(|v| v.get("stringValue"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| malformed(format!("missing string field {key}")))
}

fn decode_double(value: &Value) -> StorageResult<f64> {
    // Firestore may serialize doubleValue as a JSON number or a string.
    match value.get("doubleValue") {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| malformed("non-finite double value")),
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| malformed(format!("invalid double value {s:?}"))),
        _ => Err(malformed("expected a double value")),
    }
}

fn decode_array<'a>(fields: &'a Map<String, Value>, key: &str) -> StorageResult<&'a [Value]> {
    match fields.get(key) {
        None => Ok(&[]),
        Some(v) => Ok(v
            .get("arrayValue")
            .and_then(|a| a.get("values"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])),
    }
}

fn decode_boxes(fields: &Map<String, Value>, key: &str) -> StorageResult<Vec<BoundingBox>> {
    let Some(map) = fields
        .get(key)
        .and_then(|v| v.get("mapValue"))
        .and_then(|m| m.get("fields"))
        .and_then(Value::as_object)
    else {
        return Ok(Vec::new());
    };

    let mut boxes = Vec::with_capacity(map.len());
    for i in 1..=map.len() {
        let entry = map
            .get(&format!("box{i}"))
            .ok_or_else(|| malformed(format!("box list is missing box{i}")))?;
        let coords = entry
            .get("mapValue")
            .and_then(|m| m.get("fields"))
            .and_then(Value::as_object)
            .ok_or_else(|| malformed(format!("box{i} is not a map")))?;

        let coord = |name: &str| -> StorageResult<f32> {
            let v = coords
                .get(name)
                .ok_or_else(|| malformed(format!("box{i} is missing {name}")))?;
            Ok(decode_double(v)? as f32)
        };

        boxes.push(BoundingBox::new(
            coord("x1")?,
            coord("y1")?,
            coord("x2")?,
            coord("y2")?,
        ));
    }
    Ok(boxes)
}

fn decode_document(raw: &Value) -> StorageResult<PredictionDocument> {
    let fields = raw
        .get("fields")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed("document has no fields"))?;

    let texts = decode_array(fields, FIELD_DETECT_LIST)?
        .iter()
        .map(|v| {
            v.get("stringValue")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| malformed("detect list entry is not a string"))
        })
        .collect::<StorageResult<Vec<_>>>()?;

    let confidences = decode_array(fields, FIELD_CONFIDENCE_LIST)?
        .iter()
        .map(|v| decode_double(v).map(|d| d as f32))
        .collect::<StorageResult<Vec<_>>>()?;

    let status = decode_string(fields, FIELD_STATUS)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DocumentStatus::Complete);

    let created_at = fields
        .get(FIELD_CREATED_AT)
        .and_then(|v| v.get("timestampValue"))
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(Timestamp::now);

    Ok(PredictionDocument {
        image_name: decode_string(fields, FIELD_IMAGE_NAME)?,
        image_url: decode_string(fields, FIELD_IMAGE_URL)?,
        texts,
        confidences,
        boxes: decode_boxes(fields, FIELD_BOX_LIST)?,
        status,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> PredictionDocument {
        let mut doc = PredictionDocument::new("20240101-120000-ab12cd34", "https://cdn/img.png");
        doc.texts = vec!["amoxicillin".into(), "500mg".into()];
        doc.confidences = vec![91.5, 84.0];
        doc.boxes = vec![
            BoundingBox::new(10.0, 20.0, 110.0, 60.0),
            BoundingBox::new(10.0, 70.0, 90.0, 100.0),
        ];
        doc.status = DocumentStatus::Complete;
        doc
    }

    #[test]
    fn encode_decode_roundtrip() {
        let doc = sample_document();
        let raw = json!({
            "name": "projects/p/databases/(default)/documents/predictions/abc123",
            "fields": encode_document(&doc),
        });

        let decoded = decode_document(&raw).unwrap();
        assert_eq!(decoded.image_name, doc.image_name);
        assert_eq!(decoded.texts, doc.texts);
        assert_eq!(decoded.confidences, doc.confidences);
        assert_eq!(decoded.boxes, doc.boxes);
        assert_eq!(decoded.status, DocumentStatus::Complete);
    }

    #[test]
    fn boxes_encode_as_numbered_map() {
        let doc = sample_document();
        let encoded = encode_boxes(&doc.boxes);
        let fields = encoded["mapValue"]["fields"].as_object().unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains_key("box1"));
        assert!(fields.contains_key("box2"));
        assert_eq!(
            fields["box1"]["mapValue"]["fields"]["x2"]["doubleValue"],
            json!(110.0)
        );
    }

    #[test]
    fn update_mask_matches_present_fields() {
        let update = DocumentUpdate {
            texts: Some(vec!["a".into()]),
            confidences: None,
            boxes: Some(vec![BoundingBox::new(0.0, 0.0, 1.0, 1.0)]),
            status: Some(DocumentStatus::Processing),
        };

        let (fields, mask) = encode_update(&update);
        assert_eq!(mask, vec![FIELD_DETECT_LIST, FIELD_BOX_LIST, FIELD_STATUS]);
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[FIELD_STATUS]["stringValue"], json!("processing"));
    }

    #[test]
    fn decode_tolerates_string_doubles() {
        let v = json!({ "doubleValue": "87.5" });
        assert_eq!(decode_double(&v).unwrap(), 87.5);
    }

    #[test]
    fn document_id_is_last_path_segment() {
        let raw = json!({ "name": "projects/p/databases/(default)/documents/predictions/xyz" });
        assert_eq!(document_id(&raw).unwrap(), "xyz");
    }

    #[test]
    fn missing_fields_is_malformed() {
        let err = decode_document(&json!({})).unwrap_err();
        assert!(matches!(err, StorageError::MalformedDocument(_)));
    }

    #[test]
    fn absent_lists_decode_empty() {
        let mut fields = Map::new();
        fields.insert(FIELD_IMAGE_NAME.into(), string_value("img"));
        fields.insert(FIELD_IMAGE_URL.into(), string_value("https://cdn/img.png"));
        fields.insert(FIELD_STATUS.into(), string_value("pending"));

        let doc = decode_document(&json!({ "fields": fields })).unwrap();
        assert!(doc.texts.is_empty());
        assert!(doc.boxes.is_empty());
        assert_eq!(doc.status, DocumentStatus::Pending);
    }
}
