// =============================================================================
// MARKDOWN TO RICH TEXT REQUEST COMPILER
// =============================================================================
//
// Turns the digest's small Markdown subset (`#`, `##`, `###` headers and plain
// lines) into the flat list of edits a Google Doc understands. The document is
// addressed by absolute character offsets, so every insert and every style
// range has to carry its own position, and each insertion shifts everything
// after it.
//
// Offset 0 belongs to the document itself; the first free position is 1.

use async_trait::async_trait;
use thiserror::Error;

/// First insertable offset in a freshly created document.
pub const DOCUMENT_START_INDEX: usize = 1;

/// Errors raised while creating or editing a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document API error: {0}")]
    Api(String),
    #[error("Document store authentication failed: {0}")]
    Auth(String),
}

/// One classified input line. Header variants carry the text after the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkdownLine<'a> {
    Header1(&'a str),
    Header2(&'a str),
    Header3(&'a str),
    Plain(&'a str),
}

impl<'a> MarkdownLine<'a> {
    /// Classifies a single line. The longest marker is checked first so that
    /// `### ` never matches as `# `.
    pub fn classify(line: &'a str) -> Self {
        if let Some(text) = line.strip_prefix("### ") {
            MarkdownLine::Header3(text)
        } else if let Some(text) = line.strip_prefix("## ") {
            MarkdownLine::Header2(text)
        } else if let Some(text) = line.strip_prefix("# ") {
            MarkdownLine::Header1(text)
        } else {
            MarkdownLine::Plain(line)
        }
    }

    pub fn text(&self) -> &'a str {
        match *self {
            MarkdownLine::Header1(text)
            | MarkdownLine::Header2(text)
            | MarkdownLine::Header3(text)
            | MarkdownLine::Plain(text) => text,
        }
    }

    /// H1 is the largest heading, H3 the smallest. Plain lines are left unstyled.
    pub fn style(&self) -> Option<StyleDirective> {
        match self {
            MarkdownLine::Header1(_) => Some(StyleDirective::heading(16)),
            MarkdownLine::Header2(_) => Some(StyleDirective::heading(14)),
            MarkdownLine::Header3(_) => Some(StyleDirective::heading(12)),
            MarkdownLine::Plain(_) => None,
        }
    }

    /// The marker stripped during classification (empty for plain lines).
    pub fn prefix(&self) -> &'static str {
        match self {
            MarkdownLine::Header1(_) => "# ",
            MarkdownLine::Header2(_) => "## ",
            MarkdownLine::Header3(_) => "### ",
            MarkdownLine::Plain(_) => "",
        }
    }
}

/// Visual emphasis applied to a contiguous range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleDirective {
    pub bold: bool,
    pub font_size_pt: Option<u32>,
}

impl StyleDirective {
    fn heading(font_size_pt: u32) -> Self {
        Self {
            bold: true,
            font_size_pt: Some(font_size_pt),
        }
    }
}

/// A single edit against the document, addressed by absolute offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    InsertText {
        index: usize,
        text: String,
    },
    /// Half-open range `[start_index, end_index)`.
    ApplyStyle {
        start_index: usize,
        end_index: usize,
        style: StyleDirective,
    },
}

/// Result of one conversion: the ordered edits and the next free offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledDocument {
    pub operations: Vec<EditOperation>,
    pub cursor: usize,
}

/// Length of `text` in document offsets. Google Docs counts UTF-16 code units.
pub fn document_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Splits text at every line boundary: `\n`, `\r\n`, a lone `\r` and the
/// other Unicode line separators. A trailing boundary does not start an extra
/// empty line, and an empty input has no lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_line_boundary(c) {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();

        if c == '\r' {
            if let Some(&(j, '\n')) = chars.peek() {
                chars.next();
                start = j + 1;
            }
        }
    }

    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

fn is_line_boundary(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r'
            | '\x0b'
            | '\x0c'
            | '\x1c'
            | '\x1d'
            | '\x1e'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

/// Compiles Markdown into document edits.
///
/// Never fails. Every line produces one `InsertText` (with a trailing newline)
/// and headers additionally produce one `ApplyStyle` covering the inserted text
/// but not its newline, so styling never bleeds onto the next line.
pub fn compile_markdown(markdown: &str) -> CompiledDocument {
    let mut operations = Vec::new();
    let mut cursor = DOCUMENT_START_INDEX;

    for line in split_lines(markdown) {
        let classified = MarkdownLine::classify(line);
        let text = classified.text();
        let len = document_len(text);

        operations.push(EditOperation::InsertText {
            index: cursor,
            text: format!("{}\n", text),
        });

        if let Some(style) = classified.style() {
            operations.push(EditOperation::ApplyStyle {
                start_index: cursor,
                end_index: cursor + len,
                style,
            });
        }

        cursor += len + 1;
    }

    CompiledDocument { operations, cursor }
}

// =============================================================================
// DOCUMENT STORE
// =============================================================================

/// Anything that can hold the generated report.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates an empty document and returns its identifier.
    async fn create_document(&self, title: &str) -> Result<String, DocumentError>;

    /// Applies all edits, in order, in a single batch.
    async fn apply_edits(
        &self,
        document_id: &str,
        operations: &[EditOperation],
    ) -> Result<(), DocumentError>;

    /// Browser URL for a document.
    fn document_url(&self, document_id: &str) -> String;
}

/// Creates a document titled `title`, writes `markdown` into it and returns its URL.
pub async fn publish_markdown(
    store: &dyn DocumentStore,
    title: &str,
    markdown: &str,
) -> Result<String, DocumentError> {
    let document_id = store.create_document(title).await?;
    tracing::info!(
        document_id = %document_id,
        "Created document with title '{}'",
        title
    );

    let compiled = compile_markdown(markdown);
    if compiled.operations.is_empty() {
        tracing::debug!("No content to insert into document {}", document_id);
    } else {
        store.apply_edits(&document_id, &compiled.operations).await?;
        tracing::info!(
            "Inserted {} formatted edit(s) into the document",
            compiled.operations.len()
        );
    }

    Ok(store.document_url(&document_id))
}
