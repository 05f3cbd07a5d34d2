//! Launch-sequence tests for symlink handling.
//!
//! The launcher's contract: after a successful run the symlink resolves to
//! the absolute image path, a directory without a pre-existing symlink
//! fails before the viewer would be started, and repeated runs leave
//! exactly one link with the same target.

use std::fs;
use std::path::Path;

use nowymem_launch::launch::{DEFAULT_IMAGE_NAME, DEFAULT_LINK_NAME, relink};

fn setup_kiosk_dir(dir: &Path) {
    fs::write(dir.join(DEFAULT_IMAGE_NAME), b"jpg").expect("write image");
    std::os::unix::fs::symlink("somewhere-stale", dir.join(DEFAULT_LINK_NAME))
        .expect("create stale link");
}

#[test]
fn relink_resolves_to_absolute_image_path() {
    let temp = tempfile::tempdir().expect("tempdir");
    setup_kiosk_dir(temp.path());

    let target = relink(temp.path(), DEFAULT_LINK_NAME, DEFAULT_IMAGE_NAME).expect("relink");

    assert!(target.is_absolute());
    assert_eq!(target.file_name().and_then(|n| n.to_str()), Some(DEFAULT_IMAGE_NAME));

    let link = temp.path().join(DEFAULT_LINK_NAME);
    let resolved = fs::read_link(&link).expect("read link");
    assert_eq!(resolved, target);
    assert_eq!(fs::read(&link).expect("read through link"), b"jpg");
}

#[test]
fn missing_symlink_fails_the_run() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join(DEFAULT_IMAGE_NAME), b"jpg").expect("write image");

    let err = relink(temp.path(), DEFAULT_LINK_NAME, DEFAULT_IMAGE_NAME)
        .expect_err("first run without a link must fail");
    assert!(format!("{err:#}").contains("remove"), "error should name the failing step: {err:#}");
}

#[test]
fn rerun_leaves_exactly_one_link_with_same_target() {
    let temp = tempfile::tempdir().expect("tempdir");
    setup_kiosk_dir(temp.path());

    let first = relink(temp.path(), DEFAULT_LINK_NAME, DEFAULT_IMAGE_NAME).expect("first relink");
    let second = relink(temp.path(), DEFAULT_LINK_NAME, DEFAULT_IMAGE_NAME).expect("second relink");
    assert_eq!(first, second);

    let links: Vec<_> = fs::read_dir(temp.path())
        .expect("read dir")
        .filter_map(Result::ok)
        .filter(|entry| entry.path().symlink_metadata().map(|m| m.file_type().is_symlink()).unwrap_or(false))
        .collect();
    assert_eq!(links.len(), 1, "exactly one symlink after rerun");
    assert_eq!(fs::read_link(links[0].path()).expect("read link"), second);
}
