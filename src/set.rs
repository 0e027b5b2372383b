//! Sets of IPv4/IPv6 addresses and CIDR networks, backed by a shared BDD engine.
//!
//! Grounded on `original_source/src/libipset/set.cc` (`add_ipv4`/`add_ipv6`: OR-merge the new
//! region into the current root, compare roots to report "already present") and
//! `original_source/include/ipset/ipset.h` for the full `ip_set_t` programmatic surface.

use crate::engine::{Engine, NodeId};
use crate::error::LoadError;
use crate::ip::{ipv4_oracle, ipv4_region, ipv6_oracle, ipv6_region, IPV4_BITS, IPV6_BITS};
use std::cell::RefCell;
use std::io::{Read, Write};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::rc::Rc;

/// A set of IPv4 and/or IPv6 addresses, represented as a single BDD root shared through `engine`.
///
/// Equality and emptiness are checked by comparing root identifiers, which is sound because of the
/// engine's hash-consing: structurally equivalent sets always end up with the same root, even if
/// built through entirely different sequences of `add_*` calls.
#[derive(Clone)]
pub struct IpSet {
    engine: Rc<RefCell<Engine>>,
    root: NodeId,
}

impl IpSet {
    /// An empty set sharing the given engine.
    pub fn new(engine: Rc<RefCell<Engine>>) -> IpSet {
        let root = engine.borrow().terminal(0);
        IpSet { engine, root }
    }

    /// Adds `addr/netmask` (a single host if `netmask == 32`). A `netmask` of `0` is a no-op
    /// (matches the original library's "degenerate network" handling); a `netmask` greater than 32
    /// is also treated as a no-op.
    ///
    /// Returns `true` if the network was already fully contained in the set.
    pub fn add_v4(&mut self, addr: Ipv4Addr, netmask: u8) -> bool {
        if netmask == 0 || netmask > IPV4_BITS {
            return true;
        }
        let mut engine = self.engine.borrow_mut();
        let region = ipv4_region(&mut engine, addr, netmask);
        let merged = engine.or(self.root, region);
        let already_present = merged == self.root;
        self.root = merged;
        log::debug!("add_v4({}/{}) already_present={}", addr, netmask, already_present);
        already_present
    }

    /// Adds `addr/netmask` for IPv6; see [`IpSet::add_v4`] for the netmask no-op rule (here bounded
    /// by 128 bits).
    pub fn add_v6(&mut self, addr: Ipv6Addr, netmask: u8) -> bool {
        if netmask == 0 || netmask > IPV6_BITS {
            return true;
        }
        let mut engine = self.engine.borrow_mut();
        let region = ipv6_region(&mut engine, addr, netmask);
        let merged = engine.or(self.root, region);
        let already_present = merged == self.root;
        self.root = merged;
        log::debug!("add_v6({}/{}) already_present={}", addr, netmask, already_present);
        already_present
    }

    pub fn contains_v4(&self, addr: Ipv4Addr) -> bool {
        self.engine.borrow().evaluate(self.root, ipv4_oracle(addr)) != 0
    }

    pub fn contains_v6(&self, addr: Ipv6Addr) -> bool {
        self.engine.borrow().evaluate(self.root, ipv6_oracle(addr)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.root == self.engine.borrow().terminal(0)
    }

    /// Number of distinct BDD nodes reachable from this set's root; the normative size metric.
    pub fn reachable_node_count(&self) -> usize {
        self.engine.borrow().reachable_count(self.root)
    }

    /// An implementation hint approximating bytes of engine storage used by this set; see
    /// [`IpSet::reachable_node_count`] for the metric callers should rely on instead.
    pub fn memory_size(&self) -> usize {
        self.engine.borrow().memory_size(self.root)
    }

    pub fn save(&self, writer: &mut impl Write) -> std::io::Result<()> {
        crate::engine::save_to(&self.engine.borrow(), self.root, writer)
    }

    pub fn load(engine: Rc<RefCell<Engine>>, reader: &mut impl Read) -> Result<IpSet, LoadError> {
        let root = crate::engine::load_from(&mut engine.borrow_mut(), reader)?;
        Ok(IpSet { engine, root })
    }

    pub(crate) fn engine(&self) -> &Rc<RefCell<Engine>> {
        &self.engine
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }
}

impl PartialEq for IpSet {
    /// Two sets are equal iff their roots are the same identifier.
    ///
    /// Comparing roots produced by different engines is a programming error: the same identifier
    /// value can name unrelated nodes in two separate engines. Debug builds catch this by checking
    /// `Rc::ptr_eq` on the engine handles.
    fn eq(&self, other: &Self) -> bool {
        debug_assert!(
            Rc::ptr_eq(&self.engine, &other.engine),
            "comparing IpSet values built from different engines"
        );
        self.root == other.root
    }
}

impl Eq for IpSet {}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Rc<RefCell<Engine>> {
        Rc::new(RefCell::new(Engine::new()))
    }

    #[test]
    fn starts_empty() {
        let set = IpSet::new(engine());
        assert!(set.is_empty());
    }

    #[test]
    fn empty_sets_are_equal() {
        assert_eq!(IpSet::new(engine()), IpSet::new(engine()));
    }

    #[test]
    fn contains_after_add() {
        let mut set = IpSet::new(engine());
        let a: Ipv4Addr = "192.168.1.100".parse().unwrap();
        let b: Ipv4Addr = "192.168.1.101".parse().unwrap();
        set.add_v4(a, 32);
        assert!(set.contains_v4(a));
        assert!(!set.contains_v4(b));
    }

    #[test]
    fn network_add_covers_block() {
        let mut set = IpSet::new(engine());
        set.add_v4("192.168.1.0".parse().unwrap(), 24);
        assert!(set.contains_v4("192.168.1.101".parse().unwrap()));
        assert!(!set.contains_v4("192.168.2.100".parse().unwrap()));
    }

    #[test]
    fn adding_same_host_twice_reports_already_present() {
        let mut set = IpSet::new(engine());
        let a: Ipv4Addr = "192.168.1.100".parse().unwrap();
        assert!(!set.add_v4(a, 32));
        assert!(set.add_v4(a, 32));
    }

    #[test]
    fn zero_netmask_is_a_noop() {
        let mut set = IpSet::new(engine());
        assert!(set.add_v4("10.0.0.1".parse().unwrap(), 0));
        assert!(set.is_empty());
    }

    #[test]
    fn save_load_round_trip_preserves_identifier() {
        let shared = engine();
        let mut set = IpSet::new(shared.clone());
        set.add_v4("192.168.0.1".parse().unwrap(), 32);

        let mut bytes = Vec::new();
        set.save(&mut bytes).unwrap();

        let loaded = IpSet::load(shared, &mut &bytes[..]).unwrap();
        assert_eq!(set, loaded);
    }

    #[test]
    fn empty_set_serializes_to_24_bytes() {
        let set = IpSet::new(engine());
        let mut bytes = Vec::new();
        set.save(&mut bytes).unwrap();
        assert_eq!(bytes.len(), 24);
    }

    #[test]
    fn randomized_add_then_contains_always_holds() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let mut set = IpSet::new(engine());
        for _ in 0..200 {
            let octets: [u8; 4] = [rng.gen(), rng.gen(), rng.gen(), rng.gen()];
            let netmask = rng.gen_range(1, 33);
            let addr = Ipv4Addr::from(octets);
            set.add_v4(addr, netmask);
            assert!(set.contains_v4(addr));
        }
    }

    #[test]
    fn randomized_add_is_idempotent() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let mut set = IpSet::new(engine());
            let octets: [u8; 4] = [rng.gen(), rng.gen(), rng.gen(), rng.gen()];
            let netmask = rng.gen_range(1, 33);
            let addr = Ipv4Addr::from(octets);
            assert!(!set.add_v4(addr, netmask));
            let root_after_first = set.root;
            assert!(set.add_v4(addr, netmask));
            assert_eq!(set.root, root_after_first);
        }
    }
}
