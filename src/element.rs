use std::sync::Arc;

use std::panic::{self, AssertUnwindSafe};

use anyhow::{anyhow, Result};

use crate::api::VoteCounts;
use crate::logging::panic_message;

/// The like/dislike row text as the UI built it, plus whatever was spliced in.
///
/// A decorated element always keeps the text it was derived from, so
/// re-decorating starts from the same base and never stacks counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayElement {
    original: Arc<str>,
    rendered: Option<Arc<str>>,
}

impl DisplayElement {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self {
            original: text.into(),
            rendered: None,
        }
    }

    /// Text the UI should draw.
    pub fn text(&self) -> &str {
        self.rendered.as_deref().unwrap_or(&self.original)
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn is_decorated(&self) -> bool {
        self.rendered.is_some()
    }

    /// Undecorated copy with the same original text.
    pub fn plain(&self) -> Self {
        Self {
            original: self.original.clone(),
            rendered: None,
        }
    }

    pub(crate) fn decorated(&self, rendered: String) -> Self {
        Self {
            original: self.original.clone(),
            rendered: Some(rendered.into()),
        }
    }

}

impl From<&str> for DisplayElement {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Builds the decorated text from the UI's original like/dislike text.
pub trait Splicer: Send + Sync {
    fn splice(&self, original: &str, counts: &VoteCounts) -> Result<String>;
}

/// Appends the raw dislike count after a separator.
#[derive(Debug, Clone)]
pub struct SeparatorSplicer {
    separator: String,
}

impl SeparatorSplicer {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }
}

impl Default for SeparatorSplicer {
    fn default() -> Self {
        Self::new(" | ")
    }
}

impl Splicer for SeparatorSplicer {
    fn splice(&self, original: &str, counts: &VoteCounts) -> Result<String> {
        Ok(format!("{original}{}{}", self.separator, counts.dislikes))
    }
}

pub(crate) fn splice_element(
    splicer: &dyn Splicer,
    element: &DisplayElement,
    counts: &VoteCounts,
) -> Result<DisplayElement> {
    // Completions run this on fetcher workers, where nothing else catches a panic.
    let rendered = panic::catch_unwind(AssertUnwindSafe(|| {
        splicer.splice(element.original(), counts)
    }))
    .map_err(|payload| anyhow!("splicer panicked: {}", panic_message(payload.as_ref())))??;
    Ok(element.decorated(rendered))
}
