//! Firestore REST adapter.
//!
//! Talks to the Firestore v1 data plane with the same collection layout the
//! product's web client uses: `chat_rooms/{room}/message/*` for logs,
//! `chat_rooms/{room}/isVcAvailable/{room}` for the call session record, and
//! `users/{participant}` for presence. Wire field names are the existing
//! production ones, including the `reciverId` spelling already in the data.
//!
//! Transient connectivity handling is reqwest's; errors reaching this module
//! map straight to `StoreUnavailable` with no retry loop on top.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ChatError;
use crate::models::{CallKind, CallSession, Message, MessageDraft, PresenceRecord, Timestamp};

use super::DocumentStore;

const FIRESTORE_HOST: &str = "https://firestore.googleapis.com/v1";

pub struct FirestoreStore {
    http: reqwest::Client,
    project_id: String,
    api_key: String,
}

impl FirestoreStore {
    pub fn new(project_id: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            project_id: project_id.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// REST URL prefix for document paths.
    fn documents_base(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            FIRESTORE_HOST, self.project_id
        )
    }

    /// Fully-qualified resource name for commit writes.
    fn document_name(&self, path: &str) -> String {
        format!(
            "projects/{}/databases/(default)/documents/{}",
            self.project_id, path
        )
    }

    async fn get_document(&self, path: &str) -> Result<Option<Value>, ChatError> {
        let url = format!("{}/{}?key={}", self.documents_base(), path, self.api_key);
        tracing::debug!("Firestore GET {}", path);

        let resp = self.http.get(&url).send().await.map_err(store_err)?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check_status(resp).await?;
        let doc: Value = resp.json().await.map_err(store_err)?;
        Ok(Some(doc))
    }

    /// PATCH a document's fields, creating the document if absent.
    async fn patch_fields(
        &self,
        path: &str,
        fields: Value,
        mask: &[&str],
    ) -> Result<(), ChatError> {
        let mut url = format!("{}/{}?key={}", self.documents_base(), path, self.api_key);
        for field in mask {
            url.push_str("&updateMask.fieldPaths=");
            url.push_str(field);
        }
        tracing::debug!("Firestore PATCH {}", path);

        let resp = self
            .http
            .patch(&url)
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .map_err(store_err)?;
        check_status(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn append_message(
        &self,
        room_id: &str,
        draft: MessageDraft,
    ) -> Result<Message, ChatError> {
        let doc_id = uuid::Uuid::new_v4().to_string();
        let message_name = self.document_name(&format!("chat_rooms/{}/message/{}", room_id, doc_id));
        let room_name = self.document_name(&format!("chat_rooms/{}", room_id));

        // One commit: the message document plus a server-time transform for
        // its timestamp, and a touch of the parent room document so the room
        // shows up in collection listings (the web client does the same).
        let body = json!({
            "writes": [
                {
                    "update": {
                        "name": message_name,
                        "fields": {
                            "message": sv(&draft.body),
                            "senderid": sv(&draft.sender_id),
                            "senderName": sv(&draft.sender_name),
                            "reciverId": sv(&draft.recipient_id),
                        }
                    }
                },
                {
                    "transform": {
                        "document": message_name,
                        "fieldTransforms": [
                            { "fieldPath": "timestamp", "setToServerValue": "REQUEST_TIME" }
                        ]
                    }
                },
                {
                    "update": { "name": room_name, "fields": {} }
                },
                {
                    "transform": {
                        "document": room_name,
                        "fieldTransforms": [
                            { "fieldPath": "timestamp", "setToServerValue": "REQUEST_TIME" }
                        ]
                    }
                }
            ]
        });

        let url = format!(
            "{}/projects/{}/databases/(default)/documents:commit?key={}",
            FIRESTORE_HOST, self.project_id, self.api_key
        );
        tracing::debug!("Firestore COMMIT chat_rooms/{}/message", room_id);

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(store_err)?;
        let resp = check_status(resp).await?;
        let result: Value = resp.json().await.map_err(store_err)?;

        // The message's server-assigned timestamp comes back in the transform
        // result; fall back to the commit time if the shape ever changes.
        let timestamp = result["writeResults"][1]["transformResults"][0]["timestampValue"]
            .as_str()
            .or_else(|| result["commitTime"].as_str())
            .and_then(Timestamp::from_rfc3339)
            .ok_or_else(|| {
                ChatError::StoreUnavailable("commit response carried no timestamp".to_string())
            })?;

        Ok(Message {
            id: doc_id,
            sender_id: draft.sender_id,
            sender_name: draft.sender_name,
            recipient_id: draft.recipient_id,
            body: draft.body,
            timestamp,
        })
    }

    async fn room_messages(&self, room_id: &str) -> Result<Vec<Message>, ChatError> {
        let url = format!(
            "{}/chat_rooms/{}:runQuery?key={}",
            self.documents_base(),
            room_id,
            self.api_key
        );
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": "message" }],
                "orderBy": [
                    { "field": { "fieldPath": "timestamp" }, "direction": "ASCENDING" }
                ]
            }
        });
        tracing::debug!("Firestore runQuery chat_rooms/{}/message", room_id);

        let resp = self
            .http
            .post(&url)
            .json(&query)
            .send()
            .await
            .map_err(store_err)?;
        let resp = check_status(resp).await?;
        let rows: Vec<Value> = resp.json().await.map_err(store_err)?;

        let mut messages = Vec::new();
        for row in &rows {
            // runQuery interleaves readTime-only placeholders with documents.
            let Some(doc) = row.get("document") else {
                continue;
            };
            if let Some(message) = parse_message(doc) {
                messages.push(message);
            }
        }
        Ok(messages)
    }

    async fn room_ids(&self) -> Result<Vec<String>, ChatError> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/chat_rooms?pageSize=300&key={}",
                self.documents_base(),
                self.api_key
            );
            if let Some(ref token) = page_token {
                url.push_str("&pageToken=");
                url.push_str(token);
            }
            tracing::debug!("Firestore LIST chat_rooms");

            let resp = self.http.get(&url).send().await.map_err(store_err)?;
            let resp = check_status(resp).await?;
            let page: Value = resp.json().await.map_err(store_err)?;

            if let Some(documents) = page["documents"].as_array() {
                for doc in documents {
                    if let Some(id) = doc["name"].as_str().and_then(|n| n.rsplit('/').next()) {
                        ids.push(id.to_string());
                    }
                }
            }

            match page["nextPageToken"].as_str() {
                Some(token) => page_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(ids)
    }

    async fn set_presence(&self, participant: &str, online: bool) -> Result<(), ChatError> {
        self.patch_fields(
            &format!("users/{}", participant),
            json!({
                "isOnline": bv(online),
                "lastChanged": { "timestampValue": Timestamp::now().to_rfc3339() },
            }),
            &["isOnline", "lastChanged"],
        )
        .await
    }

    async fn presence(&self, participant: &str) -> Result<Option<PresenceRecord>, ChatError> {
        let Some(doc) = self.get_document(&format!("users/{}", participant)).await? else {
            return Ok(None);
        };
        let fields = &doc["fields"];
        Ok(Some(PresenceRecord {
            online: field_bool(fields, "isOnline").unwrap_or(false),
            changed_at: field_ts(fields, "lastChanged"),
        }))
    }

    async fn call_session(&self, room_id: &str) -> Result<Option<CallSession>, ChatError> {
        let path = format!("chat_rooms/{}/isVcAvailable/{}", room_id, room_id);
        let Some(doc) = self.get_document(&path).await? else {
            return Ok(None);
        };
        let fields = &doc["fields"];
        Ok(Some(CallSession {
            kind: parse_call_kind(field_str(fields, "type").as_deref()),
            active: field_bool(fields, "isVc").unwrap_or(false),
        }))
    }

    async fn put_call_session(
        &self,
        room_id: &str,
        session: &CallSession,
    ) -> Result<(), ChatError> {
        let kind = match session.kind {
            CallKind::Audio => "Audio",
            CallKind::Video => "Video",
        };
        self.patch_fields(
            &format!("chat_rooms/{}/isVcAvailable/{}", room_id, room_id),
            json!({
                "isVc": bv(session.active),
                "type": sv(kind),
            }),
            &["isVc", "type"],
        )
        .await
    }
}

fn store_err(e: reqwest::Error) -> ChatError {
    ChatError::StoreUnavailable(e.to_string())
}

/// Map non-success statuses to `StoreUnavailable` with the response body.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ChatError> {
    let status = resp.status();
    if !status.is_success() {
        let url = resp.url().to_string();
        let body = resp.text().await.unwrap_or_default();
        return Err(ChatError::StoreUnavailable(format!(
            "HTTP {} for {}: {}",
            status.as_u16(),
            url,
            body
        )));
    }
    Ok(resp)
}

/// Wrap a string in Firestore's typed-value envelope.
fn sv(s: &str) -> Value {
    json!({ "stringValue": s })
}

fn bv(b: bool) -> Value {
    json!({ "booleanValue": b })
}

fn field_str(fields: &Value, key: &str) -> Option<String> {
    fields[key]["stringValue"].as_str().map(String::from)
}

fn field_bool(fields: &Value, key: &str) -> Option<bool> {
    fields[key]["booleanValue"].as_bool()
}

fn field_ts(fields: &Value, key: &str) -> Option<Timestamp> {
    fields[key]["timestampValue"]
        .as_str()
        .and_then(Timestamp::from_rfc3339)
}

fn parse_call_kind(raw: Option<&str>) -> CallKind {
    match raw {
        Some(s) if s.eq_ignore_ascii_case("audio") => CallKind::Audio,
        _ => CallKind::Video,
    }
}

/// Build a message from a Firestore document. Documents whose timestamp has
/// not materialized yet are skipped, as the web client does.
fn parse_message(doc: &Value) -> Option<Message> {
    let fields = &doc["fields"];
    let timestamp = field_ts(fields, "timestamp")?;
    let id = doc["name"].as_str()?.rsplit('/').next()?.to_string();
    Some(Message {
        id,
        sender_id: field_str(fields, "senderid").unwrap_or_default(),
        sender_name: field_str(fields, "senderName").unwrap_or_default(),
        recipient_id: field_str(fields, "reciverId").unwrap_or_default(),
        body: field_str(fields, "message").unwrap_or_default(),
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_from_query_row() {
        let doc = json!({
            "name": "projects/p/databases/(default)/documents/chat_rooms/u1_u2/message/abc",
            "fields": {
                "message": { "stringValue": "hello" },
                "senderid": { "stringValue": "u1" },
                "senderName": { "stringValue": "Alice" },
                "reciverId": { "stringValue": "u2" },
                "timestamp": { "timestampValue": "2024-05-01T12:00:00.500Z" },
            }
        });
        let msg = parse_message(&doc).unwrap();
        assert_eq!(msg.id, "abc");
        assert_eq!(msg.sender_id, "u1");
        assert_eq!(msg.recipient_id, "u2");
        assert_eq!(msg.body, "hello");
        assert_eq!(msg.timestamp.nanos, 500_000_000);
    }

    #[test]
    fn test_parse_message_without_timestamp_is_skipped() {
        let doc = json!({
            "name": ".../message/abc",
            "fields": { "message": { "stringValue": "hello" } }
        });
        assert!(parse_message(&doc).is_none());
    }

    #[test]
    fn test_call_kind_parsing_defaults_to_video() {
        assert_eq!(parse_call_kind(Some("Audio")), CallKind::Audio);
        assert_eq!(parse_call_kind(Some("audio")), CallKind::Audio);
        assert_eq!(parse_call_kind(Some("Video")), CallKind::Video);
        assert_eq!(parse_call_kind(None), CallKind::Video);
    }

    #[test]
    fn test_typed_value_helpers() {
        let fields = json!({
            "isVc": { "booleanValue": true },
            "type": { "stringValue": "Audio" },
        });
        assert_eq!(field_bool(&fields, "isVc"), Some(true));
        assert_eq!(field_str(&fields, "type").as_deref(), Some("Audio"));
        assert_eq!(field_bool(&fields, "missing"), None);
    }
}
