//! UI collaborator ports.
//!
//! The dialogue core never touches widgets directly. The host (game UI,
//! console, tests) supplies one text surface and one panel controller.

/// The single mutable text surface dialogue is revealed into.
pub trait TextSink: Send + Sync {
    /// Replace the displayed text.
    fn set_text(&self, text: &str);

    fn clear(&self) {
        self.set_text("");
    }
}

/// The dialogue panel chrome around the text surface.
#[cfg_attr(test, mockall::automock)]
pub trait DialoguePanel: Send + Sync {
    fn show(&self);
    fn hide(&self);
    /// Remove transient choice elements left over from a previous session.
    fn clear_choices(&self);
    /// Show or hide the free-text input surface.
    fn set_input_visible(&self, visible: bool);
}
