use crate::error::{AztrackError, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Board types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub name: String,
}

/// A project card for an issue, together with the columns of the project it
/// lives on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCard {
    pub id: String,
    pub column: Column,
    pub project_url: String,
    pub project_columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardMove {
    pub card_id: String,
    pub from: Column,
    pub to: Column,
}

// ---------------------------------------------------------------------------
// plan_moves
// ---------------------------------------------------------------------------

/// Work out which cards on `project_url` must move to `column_name`.
///
/// Column names compare case-insensitively. Cards already in the target
/// column produce no move. A matching project without that column is an
/// error.
pub fn plan_moves(
    cards: &[ProjectCard],
    project_url: &str,
    column_name: &str,
) -> Result<Vec<CardMove>> {
    let wanted = column_name.to_lowercase();
    let mut moves = Vec::new();

    for card in cards.iter().filter(|c| c.project_url == project_url) {
        let target = card
            .project_columns
            .iter()
            .find(|col| col.name.to_lowercase() == wanted)
            .ok_or_else(|| AztrackError::MissingColumn {
                project_url: card.project_url.clone(),
                column: column_name.to_string(),
            })?;

        if card.column.id != target.id {
            moves.push(CardMove {
                card_id: card.id.clone(),
                from: card.column.clone(),
                to: target.clone(),
            });
        }
    }

    Ok(moves)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
