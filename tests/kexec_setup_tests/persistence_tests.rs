use std::fs::write;
use tempfile::TempDir;
use kexec_options::kexec_setup::{KexecOptions, KexecOptionsError};

#[test]
fn test_save_then_load() {
    let dir = TempDir::new().expect("Creating temp dir should succeed");
    let path = dir.path().join("kexec.json");
    let blob = vec![0xd0, 0x0d, 0xfe, 0xed];

    let opts = KexecOptions::new().with_dtb(&blob).with_map_kernel(true);
    opts.save(&path).expect("Saving should succeed");

    let loaded = KexecOptions::load(&path).expect("Loading should succeed");
    assert!(loaded.map_kernel);
    assert!(!loaded.map_initramfs);
    assert!(loaded.dtb.is_none());
}

#[test]
fn test_save_overwrites_existing_file() {
    let dir = TempDir::new().expect("Creating temp dir should succeed");
    let path = dir.path().join("kexec.json");

    KexecOptions::new().with_map_kernel(true).save(&path).unwrap();
    KexecOptions::new().with_map_initramfs(true).save(&path).unwrap();

    let loaded = KexecOptions::load(&path).unwrap();
    assert!(!loaded.map_kernel);
    assert!(loaded.map_initramfs);
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().expect("Creating temp dir should succeed");
    let path = dir.path().join("missing.json");

    match KexecOptions::load(&path) {
        Err(KexecOptionsError::Io {path: p, ..}) => assert_eq!(p, path),
        other => panic!("expected Io error, got {:?}", other)
    }
}

#[test]
fn test_load_corrupt_file() {
    let dir = TempDir::new().expect("Creating temp dir should succeed");
    let path = dir.path().join("kexec.json");
    write(&path, b"{\"map-kernel\": \"yes\"}").unwrap();

    let result = KexecOptions::load(&path);
    assert!(matches!(result, Err(KexecOptionsError::Decode(_))));
}

#[test]
fn test_save_into_missing_directory() {
    let dir = TempDir::new().expect("Creating temp dir should succeed");
    let path = dir.path().join("no_such_dir").join("kexec.json");

    let result = KexecOptions::new().save(&path);
    assert!(matches!(result, Err(KexecOptionsError::Io {..})));
}
