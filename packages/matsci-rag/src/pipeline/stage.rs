//! Stages of the query pipeline and the edges between them.

use serde::{Deserialize, Serialize};

use crate::state::ConversationState;

/// One node of the query graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Summarize,
    RelatedAttributes,
    SearchQuery,
    ResultsLimit,
    RetrieveContext,
    FinalResponse,
}

impl Stage {
    /// Where every run starts.
    pub const ENTRY: Stage = Stage::Summarize;

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Summarize => "summarize",
            Stage::RelatedAttributes => "related_attributes",
            Stage::SearchQuery => "search_query",
            Stage::ResultsLimit => "results_limit",
            Stage::RetrieveContext => "retrieve_context",
            Stage::FinalResponse => "final_response",
        }
    }

    /// Progress headline for this stage.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Summarize => "**Step: Summarizing previous conversation**",
            Stage::RelatedAttributes => "**Step: Finding related material attributes**",
            Stage::SearchQuery => "**Step: Crafting more context-rich search query**",
            Stage::ResultsLimit => "**Step: Determining a limit on the number of data points to retrieve**",
            Stage::RetrieveContext => "**Step: Retrieving contexts from the knowledge base**",
            Stage::FinalResponse => "**Step: Generating final response**",
        }
    }

    /// The stage after this one, or `None` at the terminal stage.
    ///
    /// The edge out of `RelatedAttributes` is the only conditional one.
    pub fn next(&self, state: &ConversationState) -> Option<Stage> {
        match self {
            Stage::Summarize => Some(Stage::RelatedAttributes),
            Stage::RelatedAttributes => {
                if has_sufficient_context(state) {
                    Some(Stage::SearchQuery)
                } else {
                    Some(Stage::FinalResponse)
                }
            }
            Stage::SearchQuery => Some(Stage::ResultsLimit),
            Stage::ResultsLimit => Some(Stage::RetrieveContext),
            Stage::RetrieveContext => Some(Stage::FinalResponse),
            Stage::FinalResponse => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether any attribute was judged relevant.
pub fn has_sufficient_context(state: &ConversationState) -> bool {
    state
        .related_attributes()
        .map(|attrs| !attrs.is_empty())
        .unwrap_or(false)
}
