//! Terminal implementations of the UI ports, used by the console host.

use std::io::Write;

use crate::infrastructure::ports::{DialoguePanel, TextSink};

/// Redraws the dialogue line in place on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleText;

impl TextSink for ConsoleText {
    fn set_text(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        // Carriage return + clear-line so each prefix overwrites the last
        let _ = write!(out, "\r\x1b[2K{text}");
        let _ = out.flush();
    }
}

/// Prints panel transitions as short markers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePanel;

impl DialoguePanel for ConsolePanel {
    fn show(&self) {
        println!("\n--- dialogue ---");
    }

    fn hide(&self) {
        println!("\n--- end of dialogue ---");
    }

    fn clear_choices(&self) {}

    fn set_input_visible(&self, visible: bool) {
        if visible {
            print!("\n> ");
            let _ = std::io::stdout().flush();
        }
    }
}
