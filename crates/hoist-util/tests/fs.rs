use hoist_util::fs::{atomic_write, ensure_dir, remove_empty_parents};

#[test]
fn test_ensure_dir_creates_nested() {
    let tmp = tempfile::tempdir().unwrap();
    let deep = tmp.path().join("a/b/c");
    ensure_dir(&deep).unwrap();
    assert!(deep.is_dir());
}

#[test]
fn test_ensure_dir_existing_is_ok() {
    let tmp = tempfile::tempdir().unwrap();
    ensure_dir(tmp.path()).unwrap();
    assert!(tmp.path().is_dir());
}

#[test]
fn test_atomic_write_creates_parents() {
    let tmp = tempfile::tempdir().unwrap();
    let target = tmp.path().join("sub/dir/state.txt");
    atomic_write(&target, b"content").unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), b"content");
}

#[test]
fn test_atomic_write_overwrites() {
    let tmp = tempfile::tempdir().unwrap();
    let target = tmp.path().join("state.txt");
    atomic_write(&target, b"first").unwrap();
    atomic_write(&target, b"second").unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), b"second");
}

#[test]
fn test_remove_empty_parents_stops_at_root() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    let leaf = root.join("a/b/c");
    std::fs::create_dir_all(&leaf).unwrap();

    remove_empty_parents(&leaf, &root);

    assert!(!root.join("a").exists());
    assert!(root.exists());
}

#[test]
fn test_remove_empty_parents_keeps_non_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    let keep = root.join("a/keep.txt");
    std::fs::create_dir_all(root.join("a/b")).unwrap();
    std::fs::write(&keep, b"x").unwrap();

    remove_empty_parents(&root.join("a/b"), &root);

    assert!(!root.join("a/b").exists());
    assert!(root.join("a").exists());
    assert!(keep.exists());
}
