use crate::report::ReportRow;
use crate::{Error, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub struct TemplateRenderer;

impl TemplateRenderer {
    /// Load the HTML template and put the JSON-encoded rows in place of `tag`.
    ///
    /// Only the first occurrence of `tag` is replaced.
    pub fn render(template_path: &Path, rows: &[ReportRow], tag: &str) -> Result<String> {
        tracing::debug!("Rendering report template: {}", template_path.display());

        let template = fs::read_to_string(template_path)?;
        Self::render_str(&template, rows, tag)?.ok_or_else(|| Error::InvalidTemplate {
            path: template_path.to_path_buf(),
            tag: tag.to_string(),
        })
    }

    /// Substitute `tag` in an in-memory template. `None` if the tag is absent.
    pub fn render_str(template: &str, rows: &[ReportRow], tag: &str) -> Result<Option<String>> {
        if tag.is_empty() || !template.contains(tag) {
            return Ok(None);
        }
        let json = serde_json::to_string(rows)?;
        Ok(Some(template.replacen(tag, &json, 1)))
    }

    /// Write `content` to `path`, refusing to replace an existing file.
    ///
    /// The content goes to a temporary file next to `path` first and is moved
    /// into place only once fully written, so a failed write leaves nothing.
    pub fn save(path: &Path, content: &str) -> Result<()> {
        if path.exists() {
            return Err(Error::AlreadyExists(path.to_path_buf()));
        }
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(content.as_bytes())?;
        staged.as_file().sync_all()?;
        staged
            .persist_noclobber(path)
            .map_err(|e| match e.error.kind() {
                ErrorKind::AlreadyExists => Error::AlreadyExists(path.to_path_buf()),
                _ => Error::Io(e.error),
            })?;

        tracing::info!("Report saved to {}", path.display());
        Ok(())
    }
}
