use super::*;

#[test]
fn lock_file_sits_next_to_scratch() {
    assert_eq!(
        lock_path(Path::new("work/temp")),
        PathBuf::from("work/temp.lock")
    );
}

#[test]
fn second_lock_fails_until_first_is_dropped() {
    let scratch = PathBuf::from("target").join("scratch_lock_test").join("temp");

    let first = ScratchLock::acquire(&scratch).unwrap();
    assert!(lock_path(&scratch).is_file());
    assert!(matches!(
        ScratchLock::acquire(&scratch),
        Err(ReelError::Validation(_))
    ));
    drop(first);
    let again = ScratchLock::acquire(&scratch).unwrap();
    drop(again);
}

#[test]
fn leftover_lock_file_from_killed_run_is_reclaimed() {
    let scratch = PathBuf::from("target").join("scratch_stale_lock_test").join("temp");
    std::fs::create_dir_all(scratch.parent().unwrap()).unwrap();
    // what a killed run leaves behind: the file, but no lock held on it
    std::fs::write(lock_path(&scratch), b"999999\n").unwrap();

    let lock = ScratchLock::acquire(&scratch).unwrap();
    let owner = std::fs::read_to_string(lock_path(&scratch)).unwrap();
    assert_eq!(owner.trim(), std::process::id().to_string());
    drop(lock);
}

#[test]
fn purge_leaves_an_empty_directory() {
    let scratch = PathBuf::from("target").join("scratch_purge_test").join("temp");
    let lock = ScratchLock::acquire(&scratch).unwrap();
    std::fs::create_dir_all(scratch.join("nested")).unwrap();
    std::fs::write(scratch.join("nested").join("x.png"), b"x").unwrap();

    lock.purge().unwrap();
    assert!(scratch.is_dir());
    assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
}
