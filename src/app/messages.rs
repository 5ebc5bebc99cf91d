use crate::api::{Bookmark, UploadedDocument, Voice};
use crate::error::Result;

/// User-level operations accepted by [`super::ReaderApp::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    TogglePlayPause,
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    JumpToPage(usize),
    JumpToBookmark(String),
    CreateBookmark { note: String },
    DeleteBookmark(String),
    RefreshBookmarks,
    Ask(String),
    RefreshVoices,
    SetVoice(Option<String>),
    ToggleDarkMode,
    SetFontSize(u32),
    SetWordsPerPage(usize),
    SetPlaybackSpeed(f32),
    DismissNotice(u64),
}

impl Command {
    /// Parse one line of terminal input.
    ///
    /// ```text
    /// p | play | pause | stop | n | b | page 3 | mark [note] | unmark <id>
    /// goto <id> | marks | ask <question> | voices | voice [id] | dark
    /// font <pt> | wpp <words> | speed <rate> | dismiss <id>
    /// ```
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        let command = match head {
            "p" | "toggle" => Self::TogglePlayPause,
            "play" => Self::Play,
            "pause" => Self::Pause,
            "stop" => Self::Stop,
            "n" | "next" => Self::Next,
            "b" | "prev" | "previous" => Self::Previous,
            "page" => Self::JumpToPage(rest.parse().ok()?),
            "mark" => Self::CreateBookmark {
                note: rest.to_string(),
            },
            "unmark" if !rest.is_empty() => Self::DeleteBookmark(rest.to_string()),
            "goto" if !rest.is_empty() => Self::JumpToBookmark(rest.to_string()),
            "marks" => Self::RefreshBookmarks,
            "ask" => Self::Ask(rest.to_string()),
            "voices" => Self::RefreshVoices,
            "voice" => Self::SetVoice((!rest.is_empty()).then(|| rest.to_string())),
            "dark" => Self::ToggleDarkMode,
            "font" => Self::SetFontSize(rest.parse().ok()?),
            "wpp" => Self::SetWordsPerPage(rest.parse().ok()?),
            "speed" => Self::SetPlaybackSpeed(rest.trim_end_matches('x').parse().ok()?),
            "dismiss" => Self::DismissNotice(rest.parse().ok()?),
            _ => return None,
        };
        Some(command)
    }
}

/// Results posted back to the app by worker threads.
#[derive(Debug)]
pub(crate) enum Message {
    DocumentUploaded(Result<UploadedDocument>),
    SpeechReady {
        request_id: u64,
        segment_index: usize,
        text: String,
        voice: Option<String>,
        result: Result<Vec<u8>>,
    },
    VoicesLoaded(Result<Vec<Voice>>),
    AnswerReady {
        ask_id: u64,
        question: String,
        result: Result<String>,
    },
    AnswerSpeechReady {
        ask_id: u64,
        result: Result<Vec<u8>>,
    },
    BookmarksListed {
        session_id: String,
        result: Result<Vec<Bookmark>>,
    },
    BookmarkCreated {
        session_id: String,
        result: Result<Bookmark>,
    },
    BookmarkDeleted {
        session_id: String,
        bookmark_id: String,
        result: Result<()>,
    },
    ProgressSaved {
        session_id: String,
        result: Result<()>,
    },
}

#[cfg(test)]
mod tests {
    use super::Command;

    #[test]
    fn parses_navigation_shortcuts() {
        assert_eq!(Command::parse("p"), Some(Command::TogglePlayPause));
        assert_eq!(Command::parse("  n "), Some(Command::Next));
        assert_eq!(Command::parse("page 4"), Some(Command::JumpToPage(4)));
        assert_eq!(Command::parse("page four"), None);
        assert_eq!(Command::parse("speed 1.5x"), Some(Command::SetPlaybackSpeed(1.5)));
        assert_eq!(Command::parse("speed"), None);
    }

    #[test]
    fn keeps_free_text_arguments() {
        assert_eq!(
            Command::parse("ask what does   this mean?"),
            Some(Command::Ask("what does   this mean?".into()))
        );
        assert_eq!(
            Command::parse("mark"),
            Some(Command::CreateBookmark { note: String::new() })
        );
        assert_eq!(Command::parse("voice"), Some(Command::SetVoice(None)));
        assert_eq!(Command::parse("unmark"), None);
        assert_eq!(Command::parse("launch"), None);
    }
}
