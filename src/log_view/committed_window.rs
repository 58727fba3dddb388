use std::collections::VecDeque;
use std::error::Error;
use std::fmt;

use validit::Validate;

use crate::Proposal;
use crate::Zxid;

/// Bounded in-memory ring of recently committed proposals kept for DIFF sync.
///
/// Entries are appended in commit order and evicted from the front once the
/// retention capacity is exceeded; the on-disk txn log retains history
/// beyond this window. Zxids are expected to be strictly increasing; a
/// non-increasing append is tolerated (it can only come from a bug in the
/// commit pipeline) and flagged with a warning.
pub struct CommittedWindow {
    capacity: usize,
    proposals: VecDeque<Proposal>,
}

impl CommittedWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            proposals: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// The smallest retained zxid, or [`Zxid::ZERO`] when empty.
    pub fn min_zxid(&self) -> Zxid {
        self.proposals.front().map(|p| p.zxid).unwrap_or(Zxid::ZERO)
    }

    /// The largest retained zxid, or [`Zxid::ZERO`] when empty.
    pub fn max_zxid(&self) -> Zxid {
        self.proposals.back().map(|p| p.zxid).unwrap_or(Zxid::ZERO)
    }

    pub fn push(&mut self, proposal: Proposal) {
        if let Some(last) = self.proposals.back() {
            if proposal.zxid <= last.zxid {
                tracing::warn!(
                    "committed window not strictly increasing: {} appended after {}",
                    proposal.zxid,
                    last.zxid
                );
            }
        }

        self.proposals.push_back(proposal);
        while self.proposals.len() > self.capacity {
            self.proposals.pop_front();
        }
    }

    /// Iterate the whole window in commit order.
    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.iter()
    }

    /// Iterate proposals with zxid strictly greater than `after`.
    pub fn iter_from(&self, after: Zxid) -> impl Iterator<Item = &Proposal> {
        self.proposals.iter().skip_while(move |p| p.zxid <= after)
    }
}

impl fmt::Display for CommittedWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CommittedWindow([{}, {}], {} entries)",
            self.min_zxid(),
            self.max_zxid(),
            self.len()
        )
    }
}

impl Validate for CommittedWindow {
    fn validate(&self) -> Result<(), Box<dyn Error>> {
        validit::less_equal!(self.min_zxid(), self.max_zxid());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::Zxid;
    use crate::log_view::CommittedWindow;
    use crate::testing::proposal;
    use crate::testing::raw;

    #[test]
    fn test_window_min_max_empty() {
        let window = CommittedWindow::new(4);
        assert!(window.is_empty());
        assert_eq!(Zxid::ZERO, window.min_zxid());
        assert_eq!(Zxid::ZERO, window.max_zxid());
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = CommittedWindow::new(3);
        for z in [2u64, 3, 5, 6] {
            window.push(proposal(raw(z)));
        }
        assert_eq!(3, window.len());
        assert_eq!(raw(3), window.min_zxid());
        assert_eq!(raw(6), window.max_zxid());
    }

    #[test]
    fn test_window_iter_from_is_exclusive() {
        let mut window = CommittedWindow::new(10);
        for z in [2u64, 3, 5] {
            window.push(proposal(raw(z)));
        }

        let zxids: Vec<_> = window.iter_from(raw(3)).map(|p| p.zxid).collect();
        assert_eq!(vec![raw(5)], zxids);

        let zxids: Vec<_> = window.iter_from(raw(4)).map(|p| p.zxid).collect();
        assert_eq!(vec![raw(5)], zxids);

        let all: Vec<_> = window.iter_from(Zxid::ZERO).map(|p| p.zxid).collect();
        assert_eq!(vec![raw(2), raw(3), raw(5)], all);
    }
}
