//! An interval-keyed associative dictionary: maps each key to a set of
//! values over disjoint or overlapping intervals of an ordered domain,
//! backed by a choice of storage engine per key.

pub mod adaptor;
pub mod bidict;
pub mod dict;
pub mod domain;
pub mod engine;
pub mod flatten;
pub mod interval;

pub use bidict::BiDict;
pub use dict::Dict;
pub use domain::{
    BoundedDomain,
    DomainPoint,
    EpochDay,
    OrderedFloat,
    StepDomain,
};
pub use engine::EngineKind;
pub use interval::{
    Edge,
    Interval,
};
