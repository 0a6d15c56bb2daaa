//! Implementation of selfish mining.
//!
//! Follows the strategy described in Eyal and Sirer's 2013 "Majority is not
//! Enough" paper (<https://arxiv.org/pdf/1311.0243>) in the worst-case
//! scenario, i.e. gamma = 0: in a 1-block race no other miner ever mines on
//! top of the selfish miner's block.

use super::{Action, ChainView, Strategy};

/// Withholds found blocks to waste the rest of the network's work, and
/// reveals them only as the public chain catches up.
#[derive(Debug, Clone, Default)]
pub struct Selfish;

impl Selfish {
    pub fn new() -> Self {
        Selfish
    }
}

impl Strategy for Selfish {
    fn name(&self) -> String {
        "Selfish".into()
    }

    fn next_block(&mut self, view: &ChainView) -> Action {
        // Mine on the private chain, except when winning a 1-block race:
        // the public chain caught up to our single withheld block, and
        // finding the next one lets us publish both and take the race.
        let race =
            view.private_len == 1 && view.best_len == view.local_len;

        if race {
            Action::PublishAll
        } else {
            Action::Withhold
        }
    }

    fn reveal_count(&mut self, view: &ChainView) -> usize {
        // A longer public chain forces a switch; the withheld blocks are
        // lost to the reorg and there is nothing worth revealing.
        if view.best_len > view.local_len {
            return 0;
        }

        // While the private lead holds, reveal exactly as many blocks as
        // the public chain has gained. Once the lead falls to one block,
        // reveal everything to avoid the race.
        let lead = view.local_len - view.best_len;
        if view.private_len > lead {
            if view.private_len > 1 && lead == 1 {
                view.private_len
            } else {
                view.private_len - lead
            }
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(local_len: usize, private_len: usize, best_len: usize) -> ChainView {
        ChainView {
            local_len,
            private_len,
            best_len,
        }
    }

    #[test]
    fn withholds_the_first_found_block() {
        let mut selfish = Selfish::new();

        assert_eq!(selfish.next_block(&view(1, 0, 1)), Action::Withhold);
    }

    #[test]
    fn publishes_both_blocks_when_winning_a_race() {
        let mut selfish = Selfish::new();

        // One block withheld and the public chain has caught up to the
        // total private length: finding the next block wins the race.
        assert_eq!(selfish.next_block(&view(2, 1, 2)), Action::PublishAll);

        // Still ahead: keep the new block private too.
        assert_eq!(selfish.next_block(&view(3, 2, 2)), Action::Withhold);
    }

    #[test]
    fn reveals_as_much_as_the_public_chain_gained() {
        let mut selfish = Selfish::new();

        // Lead of two with three withheld blocks: reveal one.
        assert_eq!(selfish.reveal_count(&view(5, 3, 3)), 1);

        // The lead still covers the withheld tail: reveal nothing.
        assert_eq!(selfish.reveal_count(&view(5, 2, 3)), 0);
    }

    #[test]
    fn reveals_everything_when_the_lead_falls_to_one() {
        let mut selfish = Selfish::new();

        assert_eq!(selfish.reveal_count(&view(5, 3, 4)), 3);
    }

    #[test]
    fn reveals_nothing_once_overtaken() {
        let mut selfish = Selfish::new();

        assert_eq!(selfish.reveal_count(&view(3, 2, 4)), 0);
    }
}
