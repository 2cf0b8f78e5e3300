//! # pne-rs: Predicate Normalisation and Extraction
//!
//! **`pne-rs`** is the predicate engine of a symbolic model checker. It takes mixed boolean/scalar
//! expressions over a model's variables and prepares them for predicate abstraction.
//!
//! ## What does it do?
//!
//! - **Normalisation**: rewrites an expression so that no scalar operator is applied to a conditional.
//!   Conditionals are hoisted to the top, and every boolean leaf becomes a *predicate*:
//!   `(b ? a : a + 1) = 2` becomes `b ? (a = 2) : ((a + 1) = 2)`.
//! - **Extraction**: computes the set of complete predicates an expression induces, without
//!   rewriting it, and accumulates them across calls.
//! - **Clustering**: partitions the variables of the extracted predicates into clusters of
//!   variables that occur together in some predicate.
//!
//! ## Key Features
//!
//! - **Store-Centric Architecture**: All expressions live in an [`ExprStore`][crate::store::ExprStore],
//!   which hash-conses them. Equal expressions are equal [`ExprRef`][crate::reference::ExprRef] handles,
//!   so every memo table is keyed by plain integers.
//! - **Pluggable Oracle**: Names and types are resolved through the [`SymbolOracle`][crate::oracle::SymbolOracle]
//!   trait. [`SymbTable`][crate::symb_table::SymbTable] is a complete implementation for flat models.
//! - **Bounded Work**: Cartesian products above a configurable threshold are over-approximated
//!   instead of enumerated.
//!
//! ## Basic Usage
//!
//! ```rust
//! use pne_rs::extractor::PredicateExtractor;
//! use pne_rs::normaliser::PredicateNormaliser;
//! use pne_rs::store::ExprStore;
//! use pne_rs::symb_table::SymbTable;
//! use pne_rs::types::SymbType;
//!
//! // 1. Build the store and declare the model
//! let store = ExprStore::default();
//! let mut st = SymbTable::new(&store);
//! let a = store.mk_atom("a");
//! let b = store.mk_atom("b");
//! st.declare_var(a, SymbType::range(0, 3));
//! st.declare_var(b, SymbType::Boolean);
//!
//! // 2. (b ? a : a + 1) = 2
//! let e = store.mk_equal(
//!     store.mk_case(b, a, store.mk_plus(a, store.mk_number(1))),
//!     store.mk_number(2),
//! );
//!
//! // 3. Normalise
//! let mut pn = PredicateNormaliser::new(&store, &st);
//! let n = pn.normalise_expr(e, true).unwrap();
//! assert_eq!(store.to_string(n), "b ? (a = 2) : ((a + 1) = 2)");
//!
//! // 4. Extract and cluster
//! let mut pe = PredicateExtractor::new(&store, &st);
//! pe.compute_preds(e).unwrap();
//! assert_eq!(pe.all_preds().len(), 2);
//! assert_eq!(pe.all_clusters().unwrap().len(), 1);
//! assert!(pe.var_cluster(a).unwrap().is_some());
//! ```
//!
//! ## Core Components
//!
//! - **[`store`]**: The expression store, with raw (`mk_*`) and simplifying (`resolve_*`) constructors.
//! - **[`normaliser`]**: The [`PredicateNormaliser`][crate::normaliser::PredicateNormaliser].
//! - **[`extractor`]**: The [`PredicateExtractor`][crate::extractor::PredicateExtractor] and its clusters.
//! - **[`symb_table`]**: Declarations, type inference and flattening.

pub mod abstraction;
pub mod cluster;
pub mod error;
pub mod extractor;
pub mod hierarchy;
pub mod memo;
pub mod node;
pub mod normaliser;
pub mod oracle;
pub mod printer;
pub mod reference;
pub mod resolve;
pub mod store;
pub mod symb_table;
pub mod table;
pub mod types;
pub mod utils;

pub use error::{PneError, Result};
