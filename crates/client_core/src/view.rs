use shared::domain::Document;

/// Everything the client can put on screen. Markup, styling and toasts live
/// behind [`View`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Login,
    Dashboard {
        documents: Vec<Document>,
        /// True while the shown documents come from the local cache and a
        /// refresh is still in flight.
        loading: bool,
    },
    CreateDocument,
    DocumentLoading,
    DocumentDetail(Document),
    NotFound,
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Dashboard { .. } => "dashboard",
            Self::CreateDocument => "create_document",
            Self::DocumentLoading => "document_loading",
            Self::DocumentDetail(_) => "document_detail",
            Self::NotFound => "not_found",
        }
    }
}

pub trait View: Send + Sync {
    fn render(&self, screen: Screen);
}
