//! The `PortalPage` seam
//!
//! Everything the automation needs from a browser tab, expressed as
//! snapshot queries plus element actions. Text heuristics are evaluated
//! in Rust over the snapshots (see `locate`), so an implementation only
//! has to report what is on the page.

use crate::error::PortalError;
use mab_core::ResultsTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Opaque handle to an element in the current document
///
/// Valid until the page re-renders the element; stale handles fail with
/// `PortalError::ElementDetached`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementRef(pub String);

impl ElementRef {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A text-entry input and the text around it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub element: ElementRef,
    /// Nearest label text (label element, aria-label, placeholder)
    pub label: String,
    /// Heading or legend of the enclosing section
    #[serde(default)]
    pub section: String,
    /// `type` attribute, lowercased
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default = "default_true")]
    pub visible: bool,
}

impl InputDescriptor {
    /// Label and section text, lowercased
    #[must_use]
    pub fn context(&self) -> String {
        format!("{} {}", self.label, self.section).to_lowercase()
    }
}

/// Clickable element category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Button,
    Link,
    /// Table row or list item acting as a link
    Row,
}

/// A clickable element and its visual cues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlDescriptor {
    pub element: ElementRef,
    pub kind: ControlKind,
    /// Visible text, whitespace collapsed
    pub text: String,
    #[serde(default)]
    pub is_submit: bool,
    /// Green-styled (class name or computed colour)
    #[serde(default)]
    pub green: bool,
    /// Carries a play icon
    #[serde(default)]
    pub has_play_icon: bool,
    /// Inside a modal dialogue
    #[serde(default)]
    pub in_dialog: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
}

fn default_true() -> bool {
    true
}

/// A rendered table with its element handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub element: ElementRef,
    pub table: ResultsTable,
}

/// Keys the field writer and navigator send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Backspace,
    Delete,
    Tab,
    Enter,
    Escape,
}

impl Key {
    /// DOM key name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Key::Backspace => "Backspace",
            Key::Delete => "Delete",
            Key::Tab => "Tab",
            Key::Enter => "Enter",
            Key::Escape => "Escape",
        }
    }
}

/// One browser tab showing the Portal
///
/// Every method is a suspension point. Implementations bound each call
/// by the action timeout.
#[async_trait::async_trait]
pub trait PortalPage: Send + Sync {
    /// Navigate to an absolute URL
    async fn goto(&self, url: &str) -> Result<(), PortalError>;

    async fn current_url(&self) -> Result<String, PortalError>;

    /// Visible text of the whole document
    async fn page_text(&self) -> Result<String, PortalError>;

    /// Text-entry inputs in document order
    async fn inputs(&self) -> Result<Vec<InputDescriptor>, PortalError>;

    /// Buttons, links and clickable rows in document order
    async fn controls(&self) -> Result<Vec<ControlDescriptor>, PortalError>;

    /// Every table in document order
    async fn tables(&self) -> Result<Vec<TableSnapshot>, PortalError>;

    async fn click(&self, element: &ElementRef) -> Result<(), PortalError>;

    async fn focus(&self, element: &ElementRef) -> Result<(), PortalError>;

    /// Select the element's whole content
    async fn select_all(&self, element: &ElementRef) -> Result<(), PortalError>;

    async fn press_key(&self, element: &ElementRef, key: Key) -> Result<(), PortalError>;

    /// Type one character as a keystroke
    async fn type_char(&self, element: &ElementRef, ch: char) -> Result<(), PortalError>;

    /// The driver's own clear (value reset plus input event)
    async fn native_clear(&self, element: &ElementRef) -> Result<(), PortalError>;

    /// Current `value` of an input
    async fn read_value(&self, element: &ElementRef) -> Result<String, PortalError>;

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<(), PortalError>;

    async fn scroll_to_bottom(&self) -> Result<(), PortalError>;

    /// Wait until the document is loaded and network activity settles
    async fn wait_for_idle(&self) -> Result<(), PortalError>;

    /// Full-page PNG screenshot
    async fn screenshot(&self, path: &Path) -> Result<(), PortalError>;

    /// Close the tab; the page is unusable afterwards
    async fn close(&self) -> Result<(), PortalError>;
}
