//! Snapshot store tests.

use super::*;

#[tokio::test]
async fn test_memory_store_put_get() {
    let store = MemoryStore::new();
    assert!(store.is_empty());
    assert_eq!(store.get("q").await.unwrap(), None);

    store.put("q", b"one").await.unwrap();
    store.put("q", b"two").await.unwrap();
    store.put("a", b"x").await.unwrap();

    assert_eq!(store.get("q").await.unwrap(), Some(b"two".to_vec()));
    assert_eq!(store.queue_names().await.unwrap(), vec!["a", "q"]);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_file_store_put_get() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path().join("snapshots")).await.unwrap();

    assert_eq!(store.get("build").await.unwrap(), None);
    store.put("build", b"{\"v\":1}").await.unwrap();
    store.put("build", b"{\"v\":2}").await.unwrap();
    store.put("deploy", b"{}").await.unwrap();

    assert_eq!(store.get("build").await.unwrap(), Some(b"{\"v\":2}".to_vec()));
    assert_eq!(store.queue_names().await.unwrap(), vec!["build", "deploy"]);
}

#[tokio::test]
async fn test_file_store_leaves_no_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).await.unwrap();
    store.put("q", b"data").await.unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["q.json"]);
}

#[tokio::test]
async fn test_file_store_ignores_stray_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).await.unwrap();
    store.put("q", b"good").await.unwrap();

    // A crash between write and rename leaves only the temp file behind.
    std::fs::write(dir.path().join("q.json.tmp"), b"partial").unwrap();

    assert_eq!(store.get("q").await.unwrap(), Some(b"good".to_vec()));
    assert_eq!(store.queue_names().await.unwrap(), vec!["q"]);
}

#[tokio::test]
async fn test_file_store_keeps_any_name_inside_dir() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path().join("snapshots")).await.unwrap();

    let names = ["../escape", "team a/build", "", "x.json", "plain"];
    for (i, name) in names.iter().enumerate() {
        store.put(name, format!("{i}").as_bytes()).await.unwrap();
    }
    for (i, name) in names.iter().enumerate() {
        assert_eq!(store.get(name).await.unwrap(), Some(format!("{i}").into_bytes()));
    }

    let mut expected: Vec<&str> = names.to_vec();
    expected.sort();
    assert_eq!(store.queue_names().await.unwrap(), expected);

    // Nothing was written outside the snapshot directory.
    let outside: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(outside, vec!["snapshots"]);
}

#[tokio::test]
async fn test_file_store_skips_foreign_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).await.unwrap();
    store.put("q", b"data").await.unwrap();

    std::fs::write(dir.path().join("notes.v1.json"), b"{}").unwrap();
    std::fs::write(dir.path().join("~zz.json"), b"{}").unwrap();
    std::fs::write(dir.path().join("README"), b"hi").unwrap();

    assert_eq!(store.queue_names().await.unwrap(), vec!["q"]);
}
