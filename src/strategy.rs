//! Definitions for the publication strategies of simulated miners.

pub mod honest;
pub mod selfish;

pub use honest::Honest;
pub use selfish::Selfish;

use std::fmt::Debug;

use dyn_clone::DynClone;

/// What a miner does with a block it has just found.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Broadcast the block right away.
    Publish,
    /// Keep the block private.
    Withhold,
    /// Broadcast every withheld block along with the new one.
    PublishAll,
}

/// What a miner knows when deciding on an action: the lengths of its own
/// chain, of the withheld tail of that chain, and of the best chain
/// published by the rest of the network. All lengths count the genesis
/// block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainView {
    /// Length of the miner's own chain, withheld blocks included.
    pub local_len: usize,
    /// Number of trailing blocks of the local chain not yet broadcast.
    pub private_len: usize,
    /// Length of the best fully propagated chain.
    pub best_len: usize,
}

/// A block publication strategy. Stateless strategies derive their choices
/// from the [`ChainView`] alone; stateful ones may track anything else they
/// need across calls.
pub trait Strategy: Debug + DynClone + Send + Sync {
    /// Returns the name of the strategy.
    fn name(&self) -> String;

    /// Decides what to do with a block found just now, before it is added
    /// to the local chain.
    fn next_block(&mut self, view: &ChainView) -> Action;

    /// Number of withheld blocks to broadcast, oldest first, after the best
    /// published chain changed. Must not exceed `view.private_len`.
    fn reveal_count(&mut self, view: &ChainView) -> usize;
}

dyn_clone::clone_trait_object!(Strategy);
