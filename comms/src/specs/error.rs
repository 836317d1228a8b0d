use std::{
    error::Error,
    fmt::{self, Display},
    path::Path,
};

/// Error returned whenever a run specification can't be used as is.
#[derive(Debug)]
pub struct SpecErr {
    field: String,
    detail: String,
}

impl SpecErr {
    pub(super) fn invalid(field: &str, detail: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            detail: detail.into(),
        }
    }

    pub(super) fn unreadable(path: &Path, err: impl Display) -> Self {
        Self {
            field: path.display().to_string(),
            detail: err.to_string(),
        }
    }

    /// The offending field, or the path of the document if it couldn't be read.
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Display for SpecErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid run specification at `{}`: {}", self.field, self.detail)
    }
}

impl Error for SpecErr {}
