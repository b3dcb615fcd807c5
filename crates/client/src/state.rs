//! Client cart state.
//!
//! `CartState` only changes through [`CartState::apply`]. A success replaces
//! the lines with the server's list verbatim; a failure keeps whatever was
//! loaded before and records a notice.

use rust_decimal::Decimal;

use shopfront_core::{AccountId, PopulatedCartLine};

/// Cached cart as last reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartState {
    pub lines: Vec<PopulatedCartLine>,
    pub is_loading: bool,
    pub is_guest_cart: bool,
    /// Last advisory or failure message, cleared by the next request.
    pub notice: Option<String>,
}

impl Default for CartState {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            is_loading: false,
            is_guest_cart: true,
            notice: None,
        }
    }
}

/// Events that drive [`CartState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// A mutation or fetch was sent.
    Requested,
    /// The server answered with a cart.
    Succeeded {
        lines: Vec<PopulatedCartLine>,
        owner: Option<AccountId>,
    },
    /// The request failed.
    Failed { message: String },
    /// A pre-submit check produced an advisory without sending anything.
    Advised { message: String },
}

impl CartState {
    /// Apply an event.
    pub fn apply(&mut self, action: CartAction) {
        match action {
            CartAction::Requested => {
                self.is_loading = true;
                self.notice = None;
            }
            CartAction::Succeeded { lines, owner } => {
                self.lines = lines;
                self.is_guest_cart = owner.is_none();
                self.is_loading = false;
            }
            CartAction::Failed { message } => {
                self.is_loading = false;
                self.notice = Some(message);
            }
            CartAction::Advised { message } => {
                self.notice = Some(message);
            }
        }
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(PopulatedCartLine::line_total).sum()
    }

    /// Total units across lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    /// The cached line for a product, if any.
    #[must_use]
    pub fn line(&self, product_id: &shopfront_core::ProductId) -> Option<&PopulatedCartLine> {
        self.lines.iter().find(|line| &line.product_id == product_id)
    }
}
