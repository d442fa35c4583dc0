use std::borrow::Cow;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::Submission;

#[derive(Debug, Error)]
pub enum TemplateRenderError {
    #[error("failed to read confirmation template at {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the confirmation template comes from.
#[derive(Debug, Clone)]
pub enum TemplateSource {
    /// Read from disk on every render, so edits apply without a restart
    File(PathBuf),
    Inline(String),
}

impl TemplateSource {
    fn load(&self) -> Result<Cow<'_, str>, TemplateRenderError> {
        match self {
            TemplateSource::File(path) => std::fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|source| TemplateRenderError::Read {
                    path: path.clone(),
                    source,
                }),
            TemplateSource::Inline(body) => Ok(Cow::Borrowed(body)),
        }
    }
}

/// Renders the HTML confirmation sent to the submitter.
///
/// Only `{{name}}`, `{{company}}` and `{{message}}` are substituted, by plain
/// string replacement. Values are inserted as-is.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    source: TemplateSource,
}

impl TemplateRenderer {
    pub fn new(source: TemplateSource) -> Self {
        Self { source }
    }

    pub fn render(&self, submission: &Submission) -> Result<String, TemplateRenderError> {
        let template = self.source.load()?;
        Ok(template
            .replace("{{name}}", &submission.name)
            .replace("{{company}}", &submission.company)
            .replace("{{message}}", &submission.message))
    }
}
