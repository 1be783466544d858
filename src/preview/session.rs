//! Preview view state.
//!
//! [`UploadPreview`] works on the head of a local file before it is sent.
//! [`AnalyzePreview`] works on server-side previews of stored files and
//! submits the analysis request. Both replace their table wholesale on
//! every re-parse and clear the column selection when they do.

use crate::api::{AnalyzeRequest, FileObj, FilesResult, RemoteApi};
use crate::error::{DumpHubError, Result};
use crate::logging::{log_debug, log_info, log_warn};
use crate::pattern::{AnalyzePattern, UploadPattern};
use crate::upload_queue::FileSource;

use super::filter::{filter_comments, split_lines};
use super::parser::{parse, PreviewTable};
use super::{PREVIEW_LINE_LIMIT, PREVIEW_READ_BYTES};

/// Ordered set of selected column indexes, kept in selection order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ColumnSelection(Vec<usize>);

impl ColumnSelection {
    fn toggle(&mut self, column: usize) {
        match self.0.iter().position(|c| *c == column) {
            Some(index) => {
                self.0.remove(index);
            }
            None => self.0.push(column),
        }
    }

    fn contains(&self, column: usize) -> bool {
        self.0.contains(&column)
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadPreview {
    raw: String,
    pattern: UploadPattern,
    lines: Vec<String>,
    table: PreviewTable,
    columns: ColumnSelection,
}

impl UploadPreview {
    pub fn new(pattern: UploadPattern) -> Self {
        Self {
            pattern,
            ..Default::default()
        }
    }

    /// Read the head of a local file and build its preview
    pub async fn load(&mut self, source: &FileSource) -> Result<()> {
        let head = source.read_head(PREVIEW_READ_BYTES).await.map_err(|e| {
            DumpHubError::Preview(format!("Unable to read the input file. ({})", e))
        })?;

        if head.contains(&0) {
            self.set_raw(String::new());
            return Err(DumpHubError::Preview("Invalid file type.".to_string()));
        }

        self.set_raw(String::from_utf8_lossy(&head).into_owned());
        Ok(())
    }

    /// Replace the raw content, then filter and parse again
    pub fn set_raw(&mut self, raw: impl Into<String>) {
        self.raw = raw.into();
        self.refilter();
    }

    pub fn set_comment_char(&mut self, comment_char: Option<char>) {
        self.pattern.comment_char = comment_char;
        self.refilter();
    }

    /// Only the table depends on the separator
    pub fn set_separator(&mut self, separator: impl Into<String>) {
        self.pattern.separator = separator.into();
        self.reparse();
    }

    pub fn pattern(&self) -> &UploadPattern {
        &self.pattern
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn table(&self) -> &PreviewTable {
        &self.table
    }

    pub fn toggle_column(&mut self, column: usize) {
        self.columns.toggle(column);
    }

    pub fn is_column_selected(&self, column: usize) -> bool {
        self.columns.contains(column)
    }

    pub fn selected_columns(&self) -> &[usize] {
        &self.columns.0
    }

    fn refilter(&mut self) {
        let all_lines = split_lines(&self.raw);
        self.lines = filter_comments(&all_lines[..], self.pattern.comment_char, PREVIEW_LINE_LIMIT);
        self.reparse();
    }

    fn reparse(&mut self) {
        self.table = parse(&self.lines[..], &self.pattern.separator);
        self.columns.clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalyzePreview {
    files: Vec<FileObj>,
    selected: Option<String>,
    pattern: AnalyzePattern,
    lines: Vec<String>,
    table: PreviewTable,
    columns: ColumnSelection,
}

impl AnalyzePreview {
    pub fn new(pattern: AnalyzePattern) -> Self {
        Self {
            pattern,
            ..Default::default()
        }
    }

    /// Fetch the upload folder listing and select its first file
    pub async fn refresh_files(&mut self, api: &dyn RemoteApi) -> Result<FilesResult> {
        let listing = api.list_files().await?;
        self.files = listing.files.clone();

        if let Some(first) = self.files.first().map(|f| f.filename.clone()) {
            self.select_file(api, &first).await?;
        }

        Ok(listing)
    }

    /// Select a stored file and fetch its preview. Reselecting the current
    /// file does nothing.
    pub async fn select_file(&mut self, api: &dyn RemoteApi, filename: &str) -> Result<()> {
        if self.selected.as_deref() == Some(filename) {
            return Ok(());
        }
        self.selected = Some(filename.to_string());
        self.fetch_preview(api).await
    }

    /// Change the start line and fetch a fresh preview for the selected file
    pub async fn set_start_line(&mut self, api: &dyn RemoteApi, start_line: usize) -> Result<()> {
        self.pattern.start_line = start_line;
        if self.selected.is_some() {
            self.fetch_preview(api).await?;
        }
        Ok(())
    }

    /// Re-parse the current preview lines. No request is made.
    pub fn set_separator(&mut self, separator: impl Into<String>) {
        self.pattern.separator = separator.into();
        if self.selected.is_some() && !self.lines.is_empty() {
            self.reparse();
        }
    }

    pub fn files(&self) -> &[FileObj] {
        &self.files
    }

    pub fn selected_file(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn pattern(&self) -> &AnalyzePattern {
        &self.pattern
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn table(&self) -> &PreviewTable {
        &self.table
    }

    pub fn toggle_column(&mut self, column: usize) {
        self.columns.toggle(column);
    }

    pub fn is_column_selected(&self, column: usize) -> bool {
        self.columns.contains(column)
    }

    pub fn selected_columns(&self) -> &[usize] {
        &self.columns.0
    }

    /// Request analysis of the selected file with the selected columns.
    ///
    /// The preview is reset whatever the outcome. On failure the listing is
    /// fetched again and the analyze error is returned.
    pub async fn submit(&mut self, api: &dyn RemoteApi) -> Result<AnalyzeRequest> {
        let filename = self
            .selected
            .clone()
            .ok_or_else(|| DumpHubError::Validation("No file selected".to_string()))?;
        if self.columns.0.is_empty() {
            return Err(DumpHubError::Validation(
                "Select at least one column to analyze".to_string(),
            ));
        }

        let request = AnalyzeRequest {
            filename: filename.clone(),
            pattern: self.pattern.render(),
            columns: self.columns.0.clone(),
        };

        let outcome = api.analyze(&request).await;
        self.reset();

        match outcome {
            Ok(()) => {
                self.files.retain(|f| f.filename != filename);
                log_info(
                    "preview",
                    &format!("{} will be analyzed in background", filename),
                )
                .unwrap_or_default();
                Ok(request)
            }
            Err(e) => {
                log_warn(
                    "preview",
                    &format!("unable to analyze file: {} ({})", filename, e),
                )
                .unwrap_or_default();
                if let Err(refresh_err) = self.refresh_files(api).await {
                    log_warn(
                        "preview",
                        &format!("Failed to refresh file listing: {}", refresh_err),
                    )
                    .unwrap_or_default();
                }
                Err(e)
            }
        }
    }

    async fn fetch_preview(&mut self, api: &dyn RemoteApi) -> Result<()> {
        let Some(filename) = self.selected.clone() else {
            return Ok(());
        };

        match api.get_preview(&filename, self.pattern.start_line).await {
            Ok(result) => {
                log_debug(
                    "preview",
                    &format!(
                        "Fetched {} preview lines of {} from line {}",
                        result.preview.len(),
                        filename,
                        self.pattern.start_line
                    ),
                )
                .unwrap_or_default();
                self.lines = result.preview;
                self.reparse();
                Ok(())
            }
            Err(e) => {
                self.lines.clear();
                self.table = PreviewTable::default();
                self.columns.clear();
                Err(DumpHubError::Preview(format!(
                    "Unable to get file preview: {}",
                    e.failure_message()
                )))
            }
        }
    }

    fn reparse(&mut self) {
        self.table = parse(&self.lines[..], &self.pattern.separator);
        self.columns.clear();
    }

    fn reset(&mut self) {
        self.selected = None;
        self.lines.clear();
        self.table = PreviewTable::default();
        self.columns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[test]
    fn test_upload_preview_skips_comments() {
        let mut preview = UploadPreview::default();
        preview.set_raw("#skip\na:b\n#skip2\nc:d");

        assert_eq!(preview.lines(), ["a:b", "c:d"]);
        assert_eq!(preview.table().max_cols, 2);
        assert_eq!(preview.pattern().render(), "{:}{#}");
    }

    #[test]
    fn test_upload_preview_limits_lines() {
        let raw: String = (0..50).map(|i| format!("#c{}\nline{}:value\n", i, i)).collect();
        let mut preview = UploadPreview::default();
        preview.set_raw(raw);

        assert_eq!(preview.lines().len(), PREVIEW_LINE_LIMIT);
        assert_eq!(preview.lines()[0], "line0:value");
    }

    #[test]
    fn test_upload_preview_comment_change_refilters() {
        let mut preview = UploadPreview::default();
        preview.set_raw("#a:b\n%c:d");
        assert_eq!(preview.lines(), ["%c:d"]);

        preview.set_comment_char(Some('%'));
        assert_eq!(preview.lines(), ["#a:b"]);
        assert_eq!(preview.pattern().render(), "{:}{%}");

        preview.set_comment_char(None);
        assert_eq!(preview.lines().len(), 2);
    }

    #[test]
    fn test_separator_change_clears_columns() {
        let mut preview = UploadPreview::default();
        preview.set_raw("alpha:beta;gamma");
        preview.toggle_column(1);
        assert!(preview.is_column_selected(1));

        preview.set_separator(";");
        assert!(!preview.is_column_selected(1));
        assert_eq!(preview.table().rows[0], vec!["alpha:beta", "gamma"]);
        // Lines are untouched by a separator change
        assert_eq!(preview.lines(), ["alpha:beta;gamma"]);
    }

    #[tokio::test]
    async fn test_upload_preview_rejects_binary() {
        let mut preview = UploadPreview::default();
        let source = FileSource::from_bytes(vec![b'a', 0, b'b']);

        let err = preview.load(&source).await.unwrap_err();
        assert_eq!(err.failure_message(), "Preview error: Invalid file type.");
        assert!(preview.lines().iter().all(String::is_empty));
    }

    #[tokio::test]
    async fn test_upload_preview_reads_head_only() {
        let mut content = "user:pass\n".repeat(1000).into_bytes();
        // NUL bytes past the preview window are never seen
        content.extend(vec![0u8; 16]);
        let mut preview = UploadPreview::default();

        preview
            .load(&FileSource::from_bytes(content))
            .await
            .unwrap();
        assert_eq!(preview.lines().len(), PREVIEW_LINE_LIMIT);
        assert_eq!(preview.lines()[0], "user:pass");
    }

    #[derive(Default)]
    struct PreviewApi {
        preview_calls: Mutex<Vec<(String, usize)>>,
        analyze_calls: Mutex<Vec<AnalyzeRequest>>,
        listings: Mutex<usize>,
        reject_analyze: bool,
    }

    #[async_trait]
    impl RemoteApi for PreviewApi {
        async fn upload_chunk(&self, _chunk: ChunkUpload) -> Result<()> {
            Ok(())
        }
        async fn list_files(&self) -> Result<FilesResult> {
            *self.listings.lock().unwrap() += 1;
            Ok(FilesResult {
                dir: "/uploads".to_string(),
                files: vec![
                    FileObj {
                        filename: "a.txt".to_string(),
                        size: 10,
                    },
                    FileObj {
                        filename: "b.txt".to_string(),
                        size: 20,
                    },
                ],
            })
        }
        async fn get_preview(&self, filename: &str, start_line: usize) -> Result<PreviewResult> {
            self.preview_calls
                .lock()
                .unwrap()
                .push((filename.to_string(), start_line));
            Ok(PreviewResult {
                preview: vec!["user:pass:x".to_string(), "ab:cd".to_string()],
            })
        }
        async fn delete_file(&self, _filename: &str) -> Result<()> {
            Ok(())
        }
        async fn analyze(&self, request: &AnalyzeRequest) -> Result<()> {
            self.analyze_calls.lock().unwrap().push(request.clone());
            if self.reject_analyze {
                return Err(DumpHubError::Api("bad pattern (status 400)".to_string()));
            }
            Ok(())
        }
        async fn search(&self, _query: &str, _page: u32) -> Result<SearchResult> {
            Ok(SearchResult::default())
        }
        async fn get_status(&self, _page: u32) -> Result<StatusResult> {
            Ok(StatusResult::default())
        }
        async fn delete(&self, _checksum: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_analyze_preview_fetch_rules() {
        let api = PreviewApi::default();
        let mut preview = AnalyzePreview::default();

        preview.select_file(&api, "a.txt").await.unwrap();
        preview.select_file(&api, "a.txt").await.unwrap();
        preview.set_start_line(&api, 5).await.unwrap();
        preview.set_separator("|");

        let calls = api.preview_calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![("a.txt".to_string(), 0), ("a.txt".to_string(), 5)]
        );
        assert_eq!(preview.pattern().render(), "{5}{|}");
        assert_eq!(preview.table().max_cols, 1);
    }

    #[tokio::test]
    async fn test_analyze_submit_requires_columns() {
        let api = PreviewApi::default();
        let mut preview = AnalyzePreview::default();
        preview.select_file(&api, "a.txt").await.unwrap();

        let err = preview.submit(&api).await.unwrap_err();
        assert!(matches!(err, DumpHubError::Validation(_)));
        assert!(api.analyze_calls.lock().unwrap().is_empty());
        assert_eq!(preview.selected_file(), Some("a.txt"));
    }

    #[tokio::test]
    async fn test_analyze_submit_success_resets() {
        let api = PreviewApi::default();
        let mut preview = AnalyzePreview::default();
        preview.refresh_files(&api).await.unwrap();
        assert_eq!(preview.selected_file(), Some("a.txt"));

        preview.toggle_column(1);
        preview.toggle_column(0);
        let request = preview.submit(&api).await.unwrap();

        assert_eq!(request.pattern, "{0}{:}");
        assert_eq!(request.columns, vec![1, 0]);
        assert!(preview.selected_file().is_none());
        assert!(preview.lines().is_empty());
        assert!(preview.table().is_empty());
        assert_eq!(preview.files().len(), 1);
        assert_eq!(*api.listings.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_analyze_submit_failure_refetches_listing() {
        let api = PreviewApi {
            reject_analyze: true,
            ..Default::default()
        };
        let mut preview = AnalyzePreview::default();
        preview.select_file(&api, "b.txt").await.unwrap();
        preview.toggle_column(0);

        let err = preview.submit(&api).await.unwrap_err();
        assert_eq!(err.failure_message(), "bad pattern (status 400)");
        assert_eq!(*api.listings.lock().unwrap(), 1);
        // The refreshed listing selects its first file again
        assert_eq!(preview.selected_file(), Some("a.txt"));
        assert!(preview.selected_columns().is_empty());
    }
}
