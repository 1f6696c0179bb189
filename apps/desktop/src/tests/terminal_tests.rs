use chrono::{TimeZone, Utc};
use client_core::Screen;
use shared::domain::{Document, DocumentId, DocumentStatus};

use super::{render_screen, status_badge};

fn document(id: &str, title: &str, status: DocumentStatus) -> Document {
    Document {
        id: DocumentId::from(id),
        title: title.to_string(),
        status,
        created_at: Utc
            .with_ymd_and_hms(2024, 3, 1, 9, 30, 0)
            .single()
            .expect("timestamp"),
    }
}

#[test]
fn badge_uses_wire_status() {
    assert_eq!(status_badge(DocumentStatus::Rejected), "[REJECTED]");
}

#[test]
fn empty_dashboard_shows_empty_state() {
    let text = render_screen(&Screen::Dashboard {
        documents: Vec::new(),
        loading: false,
    });
    assert!(text.contains("No documents yet"));
}

#[test]
fn loading_dashboard_without_documents_shows_spinner_text() {
    let text = render_screen(&Screen::Dashboard {
        documents: Vec::new(),
        loading: true,
    });
    assert!(text.contains("Loading documents"));
    assert!(!text.contains("No documents yet"));
}

#[test]
fn dashboard_lists_documents_in_order() {
    let text = render_screen(&Screen::Dashboard {
        documents: vec![
            document("b", "Q1 Budget", DocumentStatus::Pending),
            document("a", "Travel policy", DocumentStatus::Approved),
        ],
        loading: false,
    });
    let budget = text.find("Q1 Budget").expect("budget");
    let travel = text.find("Travel policy").expect("travel");
    assert!(budget < travel);
    assert!(text.contains("[APPROVED]"));
}

#[test]
fn detail_describes_status() {
    let text = render_screen(&Screen::DocumentDetail(document(
        "a",
        "Travel policy",
        DocumentStatus::Approved,
    )));
    assert!(text.contains("== Travel policy =="));
    assert!(text.contains("created: 2024-03-01 09:30 UTC"));
    assert!(text.contains("approved by all required approvers"));
}

#[test]
fn not_found_screen() {
    assert!(render_screen(&Screen::NotFound).starts_with("Document Not Found"));
}
