pub mod narration;
pub mod theme_file;
pub mod ytdlp;
