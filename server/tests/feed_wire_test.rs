//! Wire-format tests for the feed and dashboard protocols.
//!
//! These exercise the JSON shapes exchanged with feed producers and
//! dashboards, using the engine types the server is built on.

use cachegrid_engine::{
    encode_frame, selectors, ChangeSet, FeedMessage, FrameAssembler, Record, StoreState,
};
use serde_json::{json, Value};

/// Test helper to build a change-set with a mix of content shapes.
fn sample_changes() -> ChangeSet {
    ChangeSet::new()
        .put(Record::new("A_1", "TypeA", json!({"price": 23.5, "side": "buy"})))
        .put(Record::new("B_1", "TypeB", json!("plain text")))
        .put(Record::new("C_1", "TypeC", json!(["some", "stuff"])))
        .remove("Z_9")
}

/// Feed every line through a fresh assembler and apply each completed frame.
fn replay(lines: &[String]) -> StoreState {
    let mut assembler = FrameAssembler::new();
    let mut state = StoreState::new();

    for line in lines {
        let message = FeedMessage::parse(line).unwrap();
        if let Some(frame) = assembler.push(message).unwrap() {
            state = if frame.is_cache_image {
                state.clear().apply(&frame.changes)
            } else {
                state.apply(&frame.changes)
            };
        }
    }

    state
}

fn lines(id: &str, is_cache_image: bool, changes: &ChangeSet) -> Vec<String> {
    encode_frame(id, is_cache_image, changes)
        .iter()
        .map(|m| serde_json::to_string(m).unwrap())
        .collect()
}

#[cfg(test)]
mod feed_protocol_tests {
    use super::*;

    #[test]
    fn test_frame_wire_shape() {
        let encoded = lines("cs-1", false, &sample_changes());
        let values: Vec<Value> = encoded
            .iter()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(
            values[0],
            json!({
                "frame": "start",
                "id": "cs-1",
                "isCacheImage": false,
                "numPuts": 3,
                "numRemoves": 1
            })
        );
        assert_eq!(
            values[1],
            json!({"id": "A_1", "type": "TypeA", "content": {"price": 23.5, "side": "buy"}})
        );
        assert_eq!(values[4], json!({"id": "Z_9"}));
        assert_eq!(values[5], json!({"frame": "end", "id": "cs-1"}));
    }

    #[test]
    fn test_replayed_feed_builds_projection() {
        let state = replay(&lines("cs-1", false, &sample_changes()));

        assert_eq!(selectors::list_types(&state), ["TypeA", "TypeB", "TypeC"]);

        let row = selectors::record_for_id(&state, "C_1").unwrap();
        assert_eq!(row.get("content"), Some(&json!("[\"some\",\"stuff\"]")));

        let row = selectors::record_for_id(&state, "B_1").unwrap();
        assert_eq!(row.get("content"), Some(&json!("plain text")));
    }

    #[test]
    fn test_cache_image_discards_earlier_frames() {
        let mut feed = lines("cs-1", false, &sample_changes());
        feed.extend(lines(
            "img-1",
            true,
            &ChangeSet::new().put(Record::new("D_1", "TypeD", json!({"x": 1}))),
        ));

        let state = replay(&feed);
        assert_eq!(selectors::list_types(&state), ["TypeD"]);
        assert_eq!(state.record_count(), 1);
    }

    #[test]
    fn test_hand_written_feed_lines() {
        let feed: Vec<String> = [
            r#"{"frame":"start","id":"f1","isCacheImage":false,"numPuts":1,"numRemoves":0}"#,
            r#"{"id":"X1","type":"Quote","content":{"bid":1.1,"ask":1.2}}"#,
            r#"{"frame":"end","id":"f1"}"#,
            r#"{"frame":"start","id":"f2","isCacheImage":false,"numPuts":0,"numRemoves":1}"#,
            r#"{"id":"X1"}"#,
            r#"{"frame":"end","id":"f2"}"#,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let state = replay(&feed[..3]);
        assert_eq!(selectors::list_types(&state), ["Quote"]);

        let state = replay(&feed);
        assert!(selectors::list_types(&state).is_empty());
    }

    #[test]
    fn test_out_of_order_messages_are_rejected() {
        let mut assembler = FrameAssembler::new();

        let put = FeedMessage::parse(r#"{"id":"X1","type":"Quote","content":1}"#).unwrap();
        let err = assembler.push(put).unwrap_err();
        assert_eq!(err.code(), "unexpected_frame");

        let start = FeedMessage::parse(
            r#"{"frame":"start","id":"f1","isCacheImage":false,"numPuts":0,"numRemoves":0}"#,
        )
        .unwrap();
        assembler.push(start).unwrap();
        let end = FeedMessage::parse(r#"{"frame":"end","id":"other"}"#).unwrap();
        let err = assembler.push(end).unwrap_err();
        assert_eq!(err.code(), "frame_id_mismatch");
        assert!(!assembler.in_frame());
    }
}

#[cfg(test)]
mod dashboard_protocol_tests {
    use super::*;

    #[derive(serde::Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    #[allow(dead_code)]
    enum DashboardMessage {
        Types { types: Vec<String> },
        TypeData {
            type_name: String,
            records: Vec<Value>,
            columns: Vec<Value>,
            content_kind: Option<String>,
        },
        TypeRemoved { type_name: String },
        Cleared,
        Pong,
        Error { code: String, message: String },
    }

    #[test]
    fn test_type_data_payload_shape() {
        let state = replay(&lines("cs-1", false, &sample_changes()));

        let records = selectors::list_records_for_type(&state, "TypeA").unwrap();
        let columns = selectors::list_columns_for_type(&state, "TypeA").unwrap();

        // The shape a dashboard receives for a followed type.
        let payload = json!({
            "type": "type_data",
            "type_name": "TypeA",
            "records": serde_json::to_value(records).unwrap(),
            "columns": serde_json::to_value(columns).unwrap(),
            "content_kind": "object",
        });

        let msg: DashboardMessage = serde_json::from_value(payload).unwrap();
        match msg {
            DashboardMessage::TypeData { records, columns, .. } => {
                assert_eq!(
                    records,
                    vec![json!({"id": "A_1", "type": "TypeA", "price": 23.5, "side": "buy"})]
                );
                let fields: Vec<_> = columns.iter().map(|c| c["field"].clone()).collect();
                assert_eq!(fields, vec![json!("id"), json!("price"), json!("side"), json!("type")]);
                assert_eq!(columns[1]["kind"], "number");
                assert_eq!(columns[1]["headerName"], "price");
            }
            _ => panic!("Expected TypeData message"),
        }
    }

    #[test]
    fn test_control_messages() {
        let msg: DashboardMessage = serde_json::from_str(r#"{"type":"cleared"}"#).unwrap();
        assert!(matches!(msg, DashboardMessage::Cleared));

        let msg: DashboardMessage =
            serde_json::from_str(r#"{"type":"types","types":["A","B"]}"#).unwrap();
        assert!(matches!(msg, DashboardMessage::Types { types } if types.len() == 2));
    }
}
