use tempfile::tempdir;

use super::*;

fn batch(entries: &[(&str, &[u8])]) -> BTreeMap<String, Vec<u8>> {
    entries.iter().map(|(name, bytes)| ((*name).to_owned(), bytes.to_vec())).collect()
}

#[tokio::test]
async fn writes_content_with_requested_mode() {
    let root = tempdir().unwrap();
    let dir = root.path().join("default").join("test-cm");

    write_files(&dir, &batch(&[("config.txt", b"test content")]), 0o644).await.unwrap();

    let target = dir.join("config.txt");
    assert_eq!(b"test content".to_vec(), std::fs::read(&target).unwrap());
    assert_eq!(0o644, std::fs::metadata(&target).unwrap().permissions().mode() & 0o7777);
    assert_eq!(0o755, std::fs::metadata(&dir).unwrap().permissions().mode() & 0o7777);
}

#[tokio::test]
async fn writes_every_file_in_the_batch() {
    let root = tempdir().unwrap();
    let files = batch(&[("file1.txt", b"content1"), ("file2.txt", b"content2"), ("file3.txt", b"content3")]);

    write_files(root.path(), &files, 0o644).await.unwrap();

    for (name, content) in &files {
        assert_eq!(*content, std::fs::read(root.path().join(name)).unwrap());
    }
}

#[tokio::test]
async fn rewrites_replace_content_without_leftovers() {
    let root = tempdir().unwrap();

    write_files(root.path(), &batch(&[("data.txt", b"initial content")]), 0o644).await.unwrap();
    write_files(root.path(), &batch(&[("data.txt", b"updated content")]), 0o644).await.unwrap();

    assert_eq!(b"updated content".to_vec(), std::fs::read(root.path().join("data.txt")).unwrap());
    assert!(!root.path().join(".data.txt.tmp").exists());
}

#[tokio::test]
async fn identical_rewrite_succeeds() {
    let root = tempdir().unwrap();
    let files = batch(&[("same.txt", b"stable")]);

    write_files(root.path(), &files, 0o600).await.unwrap();
    write_files(root.path(), &files, 0o600).await.unwrap();

    assert_eq!(b"stable".to_vec(), std::fs::read(root.path().join("same.txt")).unwrap());
    assert_eq!(0o600, std::fs::metadata(root.path().join("same.txt")).unwrap().permissions().mode() & 0o7777);
}

#[tokio::test]
async fn mode_change_rewrites_the_file() {
    let root = tempdir().unwrap();
    let files = batch(&[("mode.txt", b"stable")]);

    write_files(root.path(), &files, 0o600).await.unwrap();
    write_files(root.path(), &files, 0o640).await.unwrap();

    assert_eq!(0o640, std::fs::metadata(root.path().join("mode.txt")).unwrap().permissions().mode() & 0o7777);
}

#[tokio::test]
async fn binary_content_is_preserved() {
    let root = tempdir().unwrap();
    let bytes: Vec<u8> = (0..=255).collect();

    write_files(root.path(), &batch(&[("binary.dat", &bytes)]), 0o644).await.unwrap();

    assert_eq!(bytes, std::fs::read(root.path().join("binary.dat")).unwrap());
}

#[tokio::test]
async fn unwritable_target_is_reported() {
    let root = tempdir().unwrap();
    std::fs::write(root.path().join("occupied"), b"file, not a directory").unwrap();
    let dir = root.path().join("occupied").join("sub");

    let error = write_files(&dir, &batch(&[("x", b"y")]), 0o644).await.unwrap_err();

    assert!(matches!(error, SinkError::PathUnwritable(_, _)));
}

#[tokio::test]
async fn empty_batch_still_creates_the_directory() {
    let root = tempdir().unwrap();
    let dir = root.path().join("empty");

    write_files(&dir, &BTreeMap::new(), 0o644).await.unwrap();

    assert!(dir.is_dir());
}
