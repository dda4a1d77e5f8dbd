//! Payload normalization. The legacy endpoints answer status polls in
//! several shapes; everything is folded into one internal representation
//! here, at the boundary, before any record is touched.

use lanecast_shared::ResourceStatus;
use serde_json::{Map, Value};

use crate::config::BODY_PREVIEW_CHARS;
use crate::error::PollError;

/// Normalized content of one status payload.
#[derive(Debug, Clone, PartialEq)]
pub enum WirePayload {
    /// Per-resource statuses in payload order. `skipped` lists entries that
    /// carried no recognizable status; they are reported, never fatal.
    PerResource {
        entries: Vec<(String, ResourceStatus)>,
        skipped: Vec<String>,
    },
    /// Single value meant for every resource in the polled group.
    Broadcast(ResourceStatus),
}

impl WirePayload {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::PerResource { entries, .. } => entries.is_empty(),
            Self::Broadcast(_) => false,
        }
    }
}

/// Accepted shapes, in match order:
///
/// 1. any object with a non-empty string `error` field: application
///    failure for the whole payload, regardless of other fields;
/// 2. `{"results": {<id>: {"success": bool, ...}}}`: per-resource command
///    outcomes;
/// 3. `{"status": {<id>: <status>}, ...}`: flat map wrapped by the
///    service monitor; sibling metadata keys are ignored;
/// 4. `{"streams": [...]}` or a top-level array: list of objects with an
///    `id`/`name` and a status field;
/// 5. an object with a boolean `streaming` key and no other status-bearing
///    key: broadcast applied to the whole group;
/// 6. `{<id>: <status>}`: flat map; values may be booleans, status
///    strings, or objects with a `success`/`streaming`/`online` boolean or
///    a `status` string.
///
/// A resource literally named `streaming` alongside other status entries
/// stays a flat-map entry; the broadcast reading only wins when nothing
/// else in the object looks like a status.
pub fn normalize(body: &str) -> Result<WirePayload, PollError> {
    let value: Value = serde_json::from_str(body).map_err(|e| PollError::Decode {
        source: e,
        preview: preview(body),
    })?;
    normalize_value(&value)
}

pub fn normalize_value(value: &Value) -> Result<WirePayload, PollError> {
    match value {
        Value::Object(map) => normalize_object(map),
        Value::Array(items) => Ok(from_list(items)),
        other => Err(PollError::UnsupportedShape(json_type(other).to_string())),
    }
}

fn normalize_object(map: &Map<String, Value>) -> Result<WirePayload, PollError> {
    if let Some(Value::String(msg)) = map.get("error") {
        if !msg.trim().is_empty() {
            return Err(PollError::Application(msg.clone()));
        }
    }

    if let Some(Value::Object(results)) = map.get("results") {
        return Ok(from_results(results));
    }

    if let Some(Value::Object(statuses)) = map.get("status") {
        let (entries, skipped) = from_flat_map(statuses);
        return Ok(WirePayload::PerResource { entries, skipped });
    }

    if let Some(Value::Array(items)) = map.get("streams") {
        return Ok(from_list(items));
    }

    if let Some(Value::Bool(live)) = map.get("streaming") {
        let others_bear_status = map
            .iter()
            .any(|(key, value)| key != "streaming" && entry_status(value).is_some());
        if !others_bear_status {
            return Ok(WirePayload::Broadcast(ResourceStatus::from_bool(*live)));
        }
    }

    let (entries, skipped) = from_flat_map(map);
    Ok(WirePayload::PerResource { entries, skipped })
}

fn from_results(results: &Map<String, Value>) -> WirePayload {
    let mut entries = Vec::with_capacity(results.len());
    let mut skipped = Vec::new();
    for (id, value) in results {
        match value.get("success").and_then(Value::as_bool) {
            Some(success) => entries.push((id.clone(), ResourceStatus::from_bool(success))),
            None => skipped.push(id.clone()),
        }
    }
    WirePayload::PerResource { entries, skipped }
}

fn from_flat_map(map: &Map<String, Value>) -> (Vec<(String, ResourceStatus)>, Vec<String>) {
    let mut entries = Vec::with_capacity(map.len());
    let mut skipped = Vec::new();
    for (id, value) in map {
        match entry_status(value) {
            Some(status) => entries.push((id.clone(), status)),
            None => skipped.push(id.clone()),
        }
    }
    (entries, skipped)
}

fn from_list(items: &[Value]) -> WirePayload {
    let mut entries = Vec::with_capacity(items.len());
    let mut skipped = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let Value::Object(fields) = item else {
            skipped.push(format!("[{index}]"));
            continue;
        };
        let id = ["id", "name"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str));
        let Some(id) = id else {
            skipped.push(format!("[{index}]"));
            continue;
        };
        match object_status(fields) {
            Some(status) => entries.push((id.to_string(), status)),
            None => skipped.push(id.to_string()),
        }
    }
    WirePayload::PerResource { entries, skipped }
}

fn entry_status(value: &Value) -> Option<ResourceStatus> {
    match value {
        Value::Bool(live) => Some(ResourceStatus::from_bool(*live)),
        Value::String(text) => ResourceStatus::parse(text),
        Value::Object(fields) => object_status(fields),
        _ => None,
    }
}

fn object_status(fields: &Map<String, Value>) -> Option<ResourceStatus> {
    for key in ["success", "streaming", "online"] {
        if let Some(Value::Bool(live)) = fields.get(key) {
            return Some(ResourceStatus::from_bool(*live));
        }
    }
    match fields.get("status") {
        Some(Value::String(text)) => ResourceStatus::parse(text),
        Some(Value::Bool(live)) => Some(ResourceStatus::from_bool(*live)),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use lanecast_shared::ResourceStatus;

    use super::{WirePayload, normalize};
    use crate::error::{ErrorKind, PollError};

    fn entries(payload: WirePayload) -> Vec<(String, ResourceStatus)> {
        match payload {
            WirePayload::PerResource { entries, .. } => entries,
            WirePayload::Broadcast(_) => panic!("expected per-resource payload"),
        }
    }

    #[test]
    fn flat_map_with_booleans() {
        let payload = normalize(r#"{"cam0": true, "cam1": false}"#).unwrap();
        assert_eq!(
            entries(payload),
            vec![
                ("cam0".to_string(), ResourceStatus::Online),
                ("cam1".to_string(), ResourceStatus::Offline),
            ]
        );
    }

    #[test]
    fn flat_map_preserves_payload_order() {
        let payload = normalize(r#"{"zeta": true, "alpha": false, "mid": "checking"}"#).unwrap();
        let ids: Vec<String> = entries(payload).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn flat_map_with_status_strings_and_objects() {
        let payload = normalize(
            r#"{"obs": "online", "mixer": "not-streaming", "cam": {"online": true}, "enc": {"status": "checking"}}"#,
        )
        .unwrap();
        assert_eq!(
            entries(payload),
            vec![
                ("obs".to_string(), ResourceStatus::Online),
                ("mixer".to_string(), ResourceStatus::Offline),
                ("cam".to_string(), ResourceStatus::Online),
                ("enc".to_string(), ResourceStatus::Checking),
            ]
        );
    }

    #[test]
    fn flat_map_skips_unrecognizable_entries() {
        let payload = normalize(r#"{"cam0": true, "uptime": 91.5, "note": "n/a"}"#).unwrap();
        let WirePayload::PerResource { entries, skipped } = payload else {
            panic!("expected per-resource payload");
        };
        assert_eq!(entries, vec![("cam0".to_string(), ResourceStatus::Online)]);
        assert_eq!(skipped, vec!["uptime".to_string(), "note".to_string()]);
    }

    #[test]
    fn results_form_maps_success_flags() {
        let payload = normalize(
            r#"{"success": true, "results": {"cam0": {"success": true}, "cam1": {"success": false, "error": "timeout"}}}"#,
        )
        .unwrap();
        assert_eq!(
            entries(payload),
            vec![
                ("cam0".to_string(), ResourceStatus::Online),
                ("cam1".to_string(), ResourceStatus::Offline),
            ]
        );
    }

    #[test]
    fn envelope_form_reads_nested_status_map_and_ignores_metadata() {
        let payload = normalize(
            r#"{"status": {"obs": true, "dnsmasq": false}, "diagnostics": {"Status Age": "0.4s ago"}, "camera_ips": [], "livescores": [], "last_updated": 1756000000}"#,
        )
        .unwrap();
        assert_eq!(
            entries(payload),
            vec![
                ("obs".to_string(), ResourceStatus::Online),
                ("dnsmasq".to_string(), ResourceStatus::Offline),
            ]
        );
    }

    #[test]
    fn stream_list_forms_use_id_or_name() {
        let wrapped = normalize(
            r#"{"streams": [{"name": "lane1", "streaming": true}, {"id": "lane2", "status": "offline"}, {"streaming": true}]}"#,
        )
        .unwrap();
        let WirePayload::PerResource { entries: listed, skipped } = wrapped else {
            panic!("expected per-resource payload");
        };
        assert_eq!(
            listed,
            vec![
                ("lane1".to_string(), ResourceStatus::Online),
                ("lane2".to_string(), ResourceStatus::Offline),
            ]
        );
        assert_eq!(skipped, vec!["[2]".to_string()]);

        let bare = normalize(r#"[{"name": "lane1", "streaming": false}]"#).unwrap();
        assert_eq!(entries(bare), vec![("lane1".to_string(), ResourceStatus::Offline)]);
    }

    #[test]
    fn lone_streaming_flag_is_a_broadcast() {
        assert_eq!(
            normalize(r#"{"streaming": true}"#).unwrap(),
            WirePayload::Broadcast(ResourceStatus::Online)
        );
        // Metadata siblings do not defeat the broadcast reading.
        assert_eq!(
            normalize(r#"{"message": "Streaming stopped.", "streaming": false}"#).unwrap(),
            WirePayload::Broadcast(ResourceStatus::Offline)
        );
    }

    #[test]
    fn streaming_next_to_real_entries_stays_a_flat_map() {
        let payload = normalize(r#"{"streaming": true, "cam0": false}"#).unwrap();
        assert_eq!(
            entries(payload),
            vec![
                ("streaming".to_string(), ResourceStatus::Online),
                ("cam0".to_string(), ResourceStatus::Offline),
            ]
        );
    }

    #[test]
    fn error_field_fails_the_whole_payload() {
        let err = normalize(r#"{"error": "Service monitor not running", "status": {}}"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Application);
        assert!(err.to_string().contains("Service monitor not running"));

        // An empty error string is not a failure signal.
        let payload = normalize(r#"{"error": "", "cam0": true}"#).unwrap();
        assert_eq!(entries(payload), vec![("cam0".to_string(), ResourceStatus::Online)]);
    }

    #[test]
    fn empty_object_normalizes_to_no_entries() {
        let payload = normalize("{}").unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn scalar_payloads_are_unsupported() {
        let err = normalize("42").unwrap_err();
        assert!(matches!(err, PollError::UnsupportedShape(ref t) if t == "number"));

        let err = normalize("\"online\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn invalid_json_reports_decode_with_preview() {
        let err = normalize("<html>502 Bad Gateway</html>").unwrap_err();
        let PollError::Decode { preview, .. } = &err else {
            panic!("expected decode error, got {err:?}");
        };
        assert!(preview.starts_with("<html>"));
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
