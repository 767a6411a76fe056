use super::*;

fn fresh(name: &str) -> ThemeHistory {
    let path = PathBuf::from("target").join("history_tests").join(name);
    let _ = std::fs::remove_file(&path);
    ThemeHistory::new(path)
}

#[test]
fn missing_file_is_empty() {
    let h = fresh("missing.txt");
    assert!(h.recent(RECENT_TITLES).unwrap().is_empty());
}

#[test]
fn recent_returns_the_tail_in_order() {
    let h = fresh("tail.txt");
    for i in 0..25 {
        h.append(&format!("Top {i}")).unwrap();
    }
    let recent = h.recent(RECENT_TITLES).unwrap();
    assert_eq!(recent.len(), 20);
    assert_eq!(recent.first().unwrap(), "Top 5");
    assert_eq!(recent.last().unwrap(), "Top 24");
}

#[test]
fn appended_titles_stay_on_one_line() {
    let h = fresh("newline.txt");
    h.append("Top 5\nSneaky").unwrap();
    assert_eq!(h.recent(5).unwrap(), vec!["Top 5 Sneaky".to_string()]);
}
