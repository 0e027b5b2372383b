//! Binary-decision-diagram-backed sets and maps of IPv4/IPv6 addresses.
//!
//! The core is a hash-consed, ordered BDD [`engine::Engine`] with memoized AND/OR/ITE operators.
//! [`set::IpSet`] and [`map::IpMap`] build on it to represent, respectively, sets of addresses and
//! CIDR networks, and total functions from addresses to integer values. Both share an explicit
//! `Engine` handle (typically `Rc<RefCell<Engine>>`) rather than relying on any process-global
//! state, so multiple independent sets can share structure while still being ordinary owned Rust
//! values.
//!
//! ```
//! use ipset_bdd::engine::Engine;
//! use ipset_bdd::set::IpSet;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let engine = Rc::new(RefCell::new(Engine::new()));
//! let mut set = IpSet::new(engine);
//! set.add_v4("192.168.1.0".parse().unwrap(), 24);
//! assert!(set.contains_v4("192.168.1.42".parse().unwrap()));
//! assert!(!set.contains_v4("192.168.2.1".parse().unwrap()));
//! ```
//!
//! Concurrency is single-threaded and cooperative per engine (see [`engine::Engine`]'s docs);
//! parallel use is expected to run one engine per thread, handing sets off between threads via the
//! [format version 1](engine::save_to) binary serialization.

pub(crate) mod assignment;
pub mod engine;
pub mod error;
pub(crate) mod ip;
pub mod map;
pub(crate) mod path_iterator;
pub mod set;
pub mod set_iterator;
