use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, Context};
use log::{debug, warn};

// @module: Subtitle parsing, batching and reconstruction

// @const: Token that marks a timing line
const TIMESPAN_DELIMITER: &str = "-->";

// @const: UTF-8 byte order mark as decoded text
const BYTE_ORDER_MARK: char = '\u{feff}';

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence label exactly as found in the source
    seq_label: String,

    // @field: Timing line exactly as found in the source
    timespan: String,

    // @field: Original dialogue text, newline-joined
    source_text: String,

    // @field: Translation, assigned at most once
    translated_text: Option<String>,
}

impl SubtitleEntry {
    /// Creates a new untranslated entry
    pub fn new(seq_label: impl Into<String>, timespan: impl Into<String>, source_text: impl Into<String>) -> Self {
        SubtitleEntry {
            seq_label: seq_label.into(),
            timespan: timespan.into(),
            source_text: source_text.into(),
            translated_text: None,
        }
    }

    pub fn seq_label(&self) -> &str {
        &self.seq_label
    }

    pub fn timespan(&self) -> &str {
        &self.timespan
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn translated_text(&self) -> Option<&str> {
        self.translated_text.as_deref()
    }

    pub fn is_translated(&self) -> bool {
        self.translated_text.is_some()
    }

    // @mutates: Assigns the translation once; later calls are ignored
    // @returns: Whether the value was stored
    pub fn set_translation(&mut self, text: impl Into<String>) -> bool {
        if self.translated_text.is_some() {
            return false;
        }
        self.translated_text = Some(text.into());
        true
    }

    // @mutates: Marks the entry as translated with its own source text
    pub fn keep_source(&mut self) -> bool {
        let source = self.source_text.clone();
        self.set_translation(source)
    }

    /// Text to emit: the translation when present, otherwise the source
    pub fn display_text(&self) -> &str {
        self.translated_text.as_deref().unwrap_or(&self.source_text)
    }

    fn push_line(&mut self, line: &str) {
        if !self.source_text.is_empty() {
            self.source_text.push('\n');
        }
        self.source_text.push_str(line);
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_label)?;
        writeln!(f, "{}", self.timespan)?;
        write!(f, "{}", self.display_text())
    }
}

// @enum: Parser position relative to subtitle blocks
#[derive(Debug)]
enum ParserState {
    // @state: Outside any block, looking for `<digits>` + `<timespan>`
    AwaitingHeader,
    // @state: Collecting text lines for the open entry
    InBlock(SubtitleEntry),
}

/// Whether `line` together with the following line opens a new block
pub fn is_block_header(line: &str, next_line: Option<&str>) -> bool {
    let label = line.trim();
    !label.is_empty()
        && label.chars().all(|c| c.is_ascii_digit())
        && next_line.is_some_and(|next| next.contains(TIMESPAN_DELIMITER))
}

/// Convert `\r\n` and lone `\r` line endings to `\n`
pub fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

/// Serialize entries to SRT text in the given order
///
/// Entries are separated by a blank line and no trailing newline is added.
/// Untranslated entries fall back to their source text.
pub fn render_srt(entries: &[SubtitleEntry]) -> String {
    entries
        .iter()
        .map(|entry| entry.to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Collection of subtitle entries with metadata
#[derive(Debug, Default)]
pub struct SubtitleCollection {
    /// Source filename, empty when parsed from memory
    pub source_file: PathBuf,

    /// List of subtitle entries
    pub entries: Vec<SubtitleEntry>,

    /// Source language
    pub source_language: String,
}

impl SubtitleCollection {
    /// Create a new subtitle collection
    pub fn new(source_file: PathBuf, source_language: String) -> Self {
        SubtitleCollection {
            source_file,
            entries: Vec::new(),
            source_language,
        }
    }

    /// Read and parse an SRT file, replacing invalid UTF-8 sequences
    pub fn from_file<P: AsRef<Path>>(path: P, source_language: &str) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
        let content = String::from_utf8_lossy(&bytes);

        let mut collection = Self::new(path.to_path_buf(), source_language.to_string());
        collection.entries = Self::parse_srt_string(&content);
        Ok(collection)
    }

    /// Parse SRT content into subtitle entries
    ///
    /// Parsing never fails: fragments that do not belong to a recognizable
    /// block are skipped, and input without any block yields an empty list.
    pub fn parse_srt_string(content: &str) -> Vec<SubtitleEntry> {
        let content = content.strip_prefix(BYTE_ORDER_MARK).unwrap_or(content);
        let normalized = normalize_line_endings(content);

        let mut lines = normalized.split('\n').peekable();
        let mut entries = Vec::new();
        let mut state = ParserState::AwaitingHeader;
        let mut skipped_lines = 0usize;

        while let Some(line) = lines.next() {
            if is_block_header(line, lines.peek().copied()) {
                let timespan = lines.next().unwrap_or_default();
                let opened = SubtitleEntry::new(line, timespan, String::new());

                if let ParserState::InBlock(closed) = std::mem::replace(&mut state, ParserState::InBlock(opened)) {
                    entries.push(closed);
                }
                continue;
            }

            let text = line.trim_end();
            if text.trim().is_empty() {
                continue;
            }

            match &mut state {
                ParserState::InBlock(entry) => entry.push_line(text),
                ParserState::AwaitingHeader => skipped_lines += 1,
            }
        }

        if let ParserState::InBlock(entry) = state {
            entries.push(entry);
        }

        if skipped_lines > 0 {
            debug!("Skipped {} line(s) outside any subtitle block", skipped_lines);
        }
        if entries.is_empty() && !normalized.trim().is_empty() {
            warn!("No subtitle blocks found in content");
        }

        entries
    }

    /// Split entries into contiguous batches of at most `batch_size` entries
    ///
    /// A size of zero is treated as one. The last batch may be smaller.
    pub fn split_into_batches(&self, batch_size: usize) -> Vec<&[SubtitleEntry]> {
        let batches: Vec<&[SubtitleEntry]> = self.entries.chunks(batch_size.max(1)).collect();

        if log::max_level() >= log::LevelFilter::Debug {
            for (i, batch) in batches.iter().enumerate() {
                let labels: Vec<&str> = batch.iter().map(|e| e.seq_label()).collect();
                debug!("Batch {}: {} entries (labels: {:?})", i + 1, batch.len(), labels);
            }
        }

        batches
    }

    /// Mutable counterpart of [`split_into_batches`](Self::split_into_batches)
    pub fn split_into_batches_mut(&mut self, batch_size: usize) -> Vec<&mut [SubtitleEntry]> {
        self.entries.chunks_mut(batch_size.max(1)).collect()
    }

    /// Serialize entries back to SRT text in their original order
    pub fn to_srt_string(&self) -> String {
        render_srt(&self.entries)
    }

    /// Write subtitles to an SRT file
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let mut content = self.to_srt_string();
        if !content.is_empty() {
            content.push('\n');
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;

        Ok(())
    }

    /// Number of entries that received a translation
    pub fn translated_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_translated()).count()
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Language: {}", self.source_language)?;
        writeln!(f, "Entries: {}", self.entries.len())?;
        Ok(())
    }
}
