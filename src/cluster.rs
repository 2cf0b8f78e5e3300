//! # Predicate clusters
//!
//! Variables are partitioned so that any two variables occurring together in
//! some predicate end up in the same cluster. Clusters are maintained
//! incrementally, union-find style: adding a predicate either creates a
//! cluster, extends one, or merges the clusters its variables already belong
//! to.
//!
//! Every cluster also owns the predicates whose support lies in it, so that
//! the predicates of a variable group can be enumerated directly.
//!
//! ```
//! use std::collections::BTreeSet;
//! use pne_rs::cluster::Clusters;
//! use pne_rs::reference::ExprRef;
//!
//! let (x, y, z) = (ExprRef::new(10), ExprRef::new(11), ExprRef::new(12));
//! let (p, q) = (ExprRef::new(20), ExprRef::new(21));
//!
//! let mut clusters = Clusters::new();
//! clusters.add_predicate(p, &BTreeSet::from([x, y]));
//! clusters.add_predicate(q, &BTreeSet::from([z]));
//! assert_eq!(clusters.len(), 2);
//! assert_ne!(clusters.cluster_of(x), clusters.cluster_of(z));
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{Display, Formatter};

use log::debug;

use crate::reference::ExprRef;

/// Identity of a cluster. Identities are never reused, even after a merge
/// retired the cluster.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ClusterId(u32);

impl ClusterId {
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Display for ClusterId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct Clusters {
    next_id: u32,
    /// Live clusters and their variables.
    members: BTreeMap<ClusterId, BTreeSet<ExprRef>>,
    /// Predicates owned by each live cluster.
    preds: BTreeMap<ClusterId, BTreeSet<ExprRef>>,
    var2cluster: HashMap<ExprRef, ClusterId>,
}

impl Clusters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live clusters.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Live clusters, in creation order.
    pub fn ids(&self) -> impl Iterator<Item = ClusterId> + '_ {
        self.members.keys().copied()
    }

    pub fn cluster_of(&self, var: ExprRef) -> Option<ClusterId> {
        self.var2cluster.get(&var).copied()
    }

    /// Variables of a live cluster.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not denote a live cluster.
    pub fn vars(&self, id: ClusterId) -> &BTreeSet<ExprRef> {
        self.members
            .get(&id)
            .unwrap_or_else(|| panic!("Cluster {} is not alive", id))
    }

    /// Predicates of a live cluster.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not denote a live cluster.
    pub fn preds(&self, id: ClusterId) -> &BTreeSet<ExprRef> {
        self.preds
            .get(&id)
            .unwrap_or_else(|| panic!("Cluster {} is not alive", id))
    }

    fn fresh(&mut self, var: ExprRef) -> ClusterId {
        let id = ClusterId(self.next_id);
        self.next_id += 1;
        self.members.insert(id, BTreeSet::from([var]));
        self.preds.insert(id, BTreeSet::new());
        self.var2cluster.insert(var, id);
        debug!("new cluster {} for {}", id, var);
        id
    }

    /// Adds a predicate with the given variable support.
    ///
    /// The first variable selects (or creates) the running cluster, which
    /// receives the predicate. Every further variable is either attached to
    /// the running cluster or, if it already belongs to another one, that
    /// cluster is merged into the running one.
    ///
    /// # Panics
    ///
    /// Panics if `support` is empty.
    pub fn add_predicate(&mut self, pred: ExprRef, support: &BTreeSet<ExprRef>) -> ClusterId {
        let mut vars = support.iter().copied();
        let Some(first) = vars.next() else {
            panic!("Predicate {} has no variable support", pred);
        };

        let running = match self.cluster_of(first) {
            Some(id) => id,
            None => self.fresh(first),
        };
        self.preds.entry(running).or_default().insert(pred);

        for var in vars {
            match self.cluster_of(var) {
                None => {
                    self.var2cluster.insert(var, running);
                    self.members.entry(running).or_default().insert(var);
                }
                Some(id) if id == running => {}
                Some(other) => self.merge(other, running),
            }
        }
        running
    }

    /// Moves every variable and predicate of `from` into `into` and retires `from`.
    fn merge(&mut self, from: ClusterId, into: ClusterId) {
        assert_ne!(from, into, "Cannot merge a cluster into itself");
        let vars = self.members.remove(&from).unwrap_or_default();
        let preds = self.preds.remove(&from).unwrap_or_default();
        debug!("merging cluster {} ({} vars) into {}", from, vars.len(), into);
        for &var in &vars {
            self.var2cluster.insert(var, into);
        }
        self.members.entry(into).or_default().extend(vars);
        self.preds.entry(into).or_default().extend(preds);
    }

    /// Checks the partition invariants.
    ///
    /// # Panics
    ///
    /// Panics on the first violated invariant.
    pub fn check_invariants(&self) {
        assert!(
            self.members.keys().eq(self.preds.keys()),
            "Cluster and cluster-predicate maps disagree on live clusters"
        );
        let mut seen = BTreeSet::new();
        for (&id, vars) in &self.members {
            assert!(!vars.is_empty(), "Cluster {} is empty", id);
            for &var in vars {
                assert!(seen.insert(var), "Variable {} belongs to two clusters", var);
                assert_eq!(self.var2cluster.get(&var), Some(&id), "Variable {} is not indexed", var);
            }
        }
        assert_eq!(seen.len(), self.var2cluster.len(), "Stale variable index entries");
    }
}
