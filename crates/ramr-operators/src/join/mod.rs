//! Join operators.
//!
//! Only the repartition (reduce-side) equi-join exists: both inputs are
//! shuffled on the join attribute values and paired up inside each key.

pub mod repartition;

pub use repartition::RepartitionJoin;
