//! Which product's comment thread is open.

use souq_core::{ProductId, Selection};
use tracing::debug;

/// Identifies the selection an asynchronous load was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionTicket {
    pub product_id: ProductId,
    generation: u64,
}

/// Single-selection state machine: `Closed` or `Open(product)`.
///
/// Every transition bumps a generation, so a load started for an earlier
/// selection can tell it is no longer wanted even if the same product has
/// been reopened since.
#[derive(Debug, Default)]
pub struct ModalController {
    selection: Selection,
    generation: u64,
}

impl ModalController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn selection(&self) -> Selection {
        self.selection
    }

    /// Open the thread of `product_id`, replacing any open thread.
    pub fn open(&mut self, product_id: ProductId) -> SelectionTicket {
        self.generation += 1;
        debug!(%product_id, previous = ?self.selection, "Opening comments");
        self.selection = Selection::Open(product_id);
        SelectionTicket {
            product_id,
            generation: self.generation,
        }
    }

    pub fn close(&mut self) {
        if self.selection.is_open() {
            self.generation += 1;
            debug!("Closing comments");
        }
        self.selection = Selection::Closed;
    }

    /// Whether `ticket` still describes the current selection.
    #[must_use]
    pub const fn is_current(&self, ticket: &SelectionTicket) -> bool {
        self.generation == ticket.generation
    }
}
