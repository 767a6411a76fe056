use super::*;

const DOC: &str = r#"{
  "theme_title": "TOP 3 MOST VIEWED ROCK VIDEOS",
  "ranking": [
    { "rank": 3, "artist": "Nirvana", "song": "Smells Like Teen Spirit", "stat": "1.9 Billion Views" },
    { "rank": 2, "artist": "Guns N' Roses", "song": "November Rain", "stat": "2.3 Billion Views" },
    { "rank": 1, "artist": "Queen", "song": "Bohemian Rhapsody", "stat": "3.2 Billion Views" }
  ]
}"#;

#[test]
fn accepts_generator_style_title_key() {
    let theme = parse_theme_json(DOC).unwrap();
    assert_eq!(theme.title, "TOP 3 MOST VIEWED ROCK VIDEOS");
    assert_eq!(theme.ranking.len(), 3);
    assert_eq!(theme.hook_text, "");
}

#[test]
fn strips_markdown_fences() {
    let fenced = format!("```json\n{DOC}\n```");
    assert_eq!(parse_theme_json(&fenced).unwrap(), parse_theme_json(DOC).unwrap());
}

#[test]
fn broken_json_is_a_content_error() {
    assert!(matches!(
        parse_theme_json("{ \"theme_title\": "),
        Err(ReelError::ContentGeneration(_))
    ));
}

#[test]
fn missing_file_is_a_content_error() {
    let generator = ThemeFile::new(PathBuf::from("target").join("no_such_theme.json"));
    assert!(matches!(
        generator.generate(&[]),
        Err(ReelError::ContentGeneration(_))
    ));
}

#[test]
fn reads_file_from_disk() {
    let dir = PathBuf::from("target").join("theme_file_test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("theme.json");
    std::fs::write(&path, DOC).unwrap();
    let theme = ThemeFile::new(&path)
        .generate(&["top 3 most viewed rock videos".to_string()])
        .unwrap();
    assert_eq!(theme.ranking[2].song, "Bohemian Rhapsody");
}
