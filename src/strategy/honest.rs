//! Implementation of the honest mining strategy.

use super::{Action, ChainView, Strategy};

/// Broadcasts every block as soon as it is found and never withholds.
#[derive(Debug, Clone, Default)]
pub struct Honest;

impl Honest {
    pub fn new() -> Self {
        Honest
    }
}

impl Strategy for Honest {
    fn name(&self) -> String {
        "Honest".into()
    }

    fn next_block(&mut self, _view: &ChainView) -> Action {
        Action::Publish
    }

    fn reveal_count(&mut self, _view: &ChainView) -> usize {
        0
    }
}
