//! EnhancedQueue snapshot tests.

use super::*;

fn populated() -> EnhancedQueue {
    let queue = EnhancedQueue::new(2);
    queue.add("a", 5, t0());
    queue.add("b", 9, t0());
    queue.add("c", 5, t0() - Duration::seconds(1));
    queue.add("d", 1, t0());
    queue.pop_pending(); // b
    queue
}

#[test]
fn test_round_trip_is_observationally_equal() {
    let original = populated();
    let restored = EnhancedQueue::new(99);
    restored.import(original.export()).unwrap();

    assert_eq!(restored.processing_window(), 2);
    assert_eq!(restored.stats(), original.stats());
    assert!(restored.in_processing("b"));
    for key in ["a", "c", "d"] {
        assert!(restored.in_pending(key));
    }
    assert_eq!(restored.processing_queue(), original.processing_queue());

    // Same admission order from here on.
    restored.set_window(i64::MAX);
    original.set_window(i64::MAX);
    assert_eq!(drain(&restored), drain(&original));
}

#[test]
fn test_json_round_trip_reproduces_triples() {
    let queue = EnhancedQueue::new(10);
    queue.add("a", 5, t0() + Duration::milliseconds(123));

    let bytes = queue.export_json().unwrap();
    let restored = EnhancedQueue::new(1);
    restored.import_json(&bytes).unwrap();

    let snapshot = restored.export();
    assert_eq!(snapshot.window, 10);
    assert_eq!(snapshot.pending.len(), 1);
    assert_eq!(snapshot.pending[0].key, "a");
    assert_eq!(snapshot.pending[0].priority, 5);
    assert_eq!(snapshot.pending[0].creation_time, t0() + Duration::milliseconds(123));
    assert_eq!(restored.export_json().unwrap(), bytes);
}

#[test]
fn test_json_field_names() {
    let queue = populated();
    let value: serde_json::Value = serde_json::from_slice(&queue.export_json().unwrap()).unwrap();

    assert_eq!(value["window"], 2);
    let pending = value["pending"].as_array().unwrap();
    assert_eq!(pending.len(), 3);
    for field in ["key", "priority", "creationTime", "index"] {
        assert!(pending[0].get(field).is_some(), "missing {field}");
    }
    let processing = value["processing"].as_array().unwrap();
    assert_eq!(processing[0]["key"], "b");
    assert!(processing[0].get("admittedAt").is_some());
}

#[test]
fn test_import_from_handwritten_json() {
    let raw = br#"{
        "window": 10,
        "pending": [
            {"key": "a", "priority": 5, "creationTime": "2024-01-01T00:00:00Z", "index": 0}
        ],
        "processing": [
            {"key": "p", "priority": 1, "creationTime": "2024-01-01T00:00:00Z",
             "admittedAt": "2024-01-01T00:00:05Z"}
        ]
    }"#;

    let queue = EnhancedQueue::new(1);
    queue.import_json(raw).unwrap();
    assert_eq!(queue.processing_window(), 10);
    assert!(queue.in_pending("a"));
    assert!(queue.in_processing("p"));
    assert_eq!(queue.pending_queue()[0].creation_time(), t0());
}

#[test]
fn test_import_processing_over_window_is_accepted() {
    let snapshot = QueueSnapshot {
        window: 1,
        pending: vec![ItemSnapshot {
            key: "next".into(),
            priority: 1,
            creation_time: t0(),
            index: 0,
        }],
        processing: ["x", "y"]
            .iter()
            .map(|key| ProcessingEntry {
                key: key.to_string(),
                priority: 1,
                creation_time: t0(),
                admitted_at: t0(),
            })
            .collect(),
    };

    let queue = EnhancedQueue::new(5);
    queue.import(snapshot).unwrap();
    assert_eq!(queue.processing_len(), 2);
    assert_eq!(queue.pop_pending(), Admission::Blocked);
}

// ==================== REJECTION ====================

fn assert_untouched(queue: &EnhancedQueue, before: &QueueSnapshot) {
    assert_eq!(&queue.export(), before);
}

#[test]
fn test_import_rejects_malformed_json() {
    let queue = populated();
    let before = queue.export();

    assert!(matches!(
        queue.import_json(b"{\"window\": 3, \"pending\": ["),
        Err(SnapshotError::Malformed(_))
    ));
    assert!(matches!(
        queue.import_json(b"{\"window\": \"wide\", \"pending\": [], \"processing\": []}"),
        Err(SnapshotError::Malformed(_))
    ));
    assert_untouched(&queue, &before);
}

#[test]
fn test_import_rejects_overlap() {
    let queue = populated();
    let before = queue.export();

    let mut bad = before.clone();
    bad.processing.push(ProcessingEntry {
        key: "a".into(),
        priority: 5,
        creation_time: t0(),
        admitted_at: t0(),
    });
    assert!(matches!(
        queue.import(bad),
        Err(SnapshotError::Overlap { ref key }) if key == "a"
    ));
    assert_untouched(&queue, &before);
}

#[test]
fn test_import_rejects_duplicate_processing() {
    let queue = populated();
    let before = queue.export();

    let mut bad = before.clone();
    let dup = bad.processing[0].clone();
    bad.processing.push(dup);
    assert!(matches!(
        queue.import(bad),
        Err(SnapshotError::DuplicateKey { .. })
    ));
    assert_untouched(&queue, &before);
}

#[test]
fn test_import_rejects_bad_heap_indices() {
    let queue = populated();
    let before = queue.export();

    let mut bad = before.clone();
    bad.pending[0].index = 17;
    assert!(matches!(
        queue.import(bad),
        Err(SnapshotError::IndexOutOfRange { index: 17, .. })
    ));
    assert_untouched(&queue, &before);
}

#[test]
fn test_import_rejects_negative_window() {
    let queue = populated();
    let before = queue.export();

    let mut bad = before.clone();
    bad.window = -1;
    assert!(matches!(
        queue.import(bad),
        Err(SnapshotError::InvalidWindow(-1))
    ));
    assert_untouched(&queue, &before);
}
