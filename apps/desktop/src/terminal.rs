use std::fmt::Write as _;

use client_core::{Screen, View};
use shared::domain::{Document, DocumentStatus};

/// Prints every rendered screen to stdout.
#[derive(Debug, Default)]
pub struct TerminalView;

impl View for TerminalView {
    fn render(&self, screen: Screen) {
        tracing::debug!(screen = screen.name(), "terminal: render");
        println!("{}", render_screen(&screen));
    }
}

pub fn status_badge(status: DocumentStatus) -> String {
    format!("[{status}]")
}

/// Heading and explanation shown under a document's status.
pub fn status_description(status: DocumentStatus) -> (&'static str, &'static str) {
    match status {
        DocumentStatus::Pending => (
            "Awaiting Approval",
            "This document is currently pending review. Approval steps will appear here once they are assigned.",
        ),
        DocumentStatus::Approved => (
            "Approved",
            "This document has been approved by all required approvers.",
        ),
        DocumentStatus::Rejected => (
            "Rejected",
            "This document has been rejected during the approval process.",
        ),
    }
}

pub fn render_screen(screen: &Screen) -> String {
    let mut out = String::new();
    match screen {
        Screen::Login => {
            out.push_str("== Sign in ==\n");
            out.push_str("login <email> <password>    or    test-user to create a dev account");
        }
        Screen::Dashboard { documents, loading } => {
            out.push_str("== Documents ==\n");
            if *loading && documents.is_empty() {
                out.push_str("Loading documents...");
            } else if documents.is_empty() {
                out.push_str("No documents yet\n");
                out.push_str(
                    "Create your first document to get started with the approval workflow. (create <title>)",
                );
            } else {
                for document in documents {
                    let _ = writeln!(out, "{}", document_line(document));
                }
                if *loading {
                    out.push_str("Refreshing...");
                }
            }
        }
        Screen::CreateDocument => {
            out.push_str("== New document ==\n");
            out.push_str("create <title>");
        }
        Screen::DocumentLoading => out.push_str("Loading document..."),
        Screen::DocumentDetail(document) => {
            let (heading, description) = status_description(document.status);
            let _ = writeln!(out, "== {} ==", document.title);
            let _ = writeln!(out, "id:      {}", document.id);
            let _ = writeln!(out, "status:  {}", status_badge(document.status));
            let _ = writeln!(
                out,
                "created: {}",
                document.created_at.format("%Y-%m-%d %H:%M UTC")
            );
            let _ = write!(out, "{heading}: {description}");
        }
        Screen::NotFound => {
            out.push_str("Document Not Found\n");
            out.push_str("The document you're looking for doesn't exist or has been removed.");
        }
    }
    out.trim_end().to_string()
}

fn document_line(document: &Document) -> String {
    format!(
        "{:<10} {}  ({})",
        status_badge(document.status),
        document.title,
        document.id
    )
}

#[cfg(test)]
#[path = "tests/terminal_tests.rs"]
mod tests;
