//! Maps from IPv4/IPv6 addresses to integer values, backed by a shared BDD engine.
//!
//! Grounded on `original_source/include/ipset/ipset.h` (`ipmap_*` declarations) and spec.md
//! §4.10/§9: the default value is stored as a BDD identifier, not a raw integer, which is required
//! for [`IpMap::is_empty`] to work by identifier comparison (an early source variant compared raw
//! integers here, which breaks as soon as the default is represented by more than one equivalent
//! BDD shape).

use crate::engine::{Engine, NodeId};
use crate::ip::{ipv4_oracle, ipv4_region, ipv6_oracle, ipv6_region};
use std::cell::RefCell;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::rc::Rc;

/// A total function from IPv4/IPv6 addresses to `u32`, represented as a BDD whose terminals carry
/// the mapped value.
#[derive(Clone)]
pub struct IpMap {
    engine: Rc<RefCell<Engine>>,
    default: NodeId,
    root: NodeId,
}

impl IpMap {
    /// A map where every address is mapped to `default`.
    pub fn new(engine: Rc<RefCell<Engine>>, default: u32) -> IpMap {
        let default_node = engine.borrow().terminal(default);
        IpMap { engine, default: default_node, root: default_node }
    }

    /// Maps every address in `addr/netmask` to `value`.
    pub fn set_v4(&mut self, addr: Ipv4Addr, netmask: u8, value: u32) {
        let mut engine = self.engine.borrow_mut();
        let region = ipv4_region(&mut engine, addr, netmask);
        let value_node = engine.terminal(value);
        self.root = engine.ite(region, value_node, self.root);
        log::debug!("set_v4({}/{}, {})", addr, netmask, value);
    }

    /// Maps every address in `addr/netmask` to `value`.
    pub fn set_v6(&mut self, addr: Ipv6Addr, netmask: u8, value: u32) {
        let mut engine = self.engine.borrow_mut();
        let region = ipv6_region(&mut engine, addr, netmask);
        let value_node = engine.terminal(value);
        self.root = engine.ite(region, value_node, self.root);
        log::debug!("set_v6({}/{}, {})", addr, netmask, value);
    }

    pub fn get_v4(&self, addr: Ipv4Addr) -> u32 {
        self.engine.borrow().evaluate(self.root, ipv4_oracle(addr))
    }

    pub fn get_v6(&self, addr: Ipv6Addr) -> u32 {
        self.engine.borrow().evaluate(self.root, ipv6_oracle(addr))
    }

    /// True iff every address still maps to the default value.
    pub fn is_empty(&self) -> bool {
        self.root == self.default
    }

    pub(crate) fn engine(&self) -> &Rc<RefCell<Engine>> {
        &self.engine
    }
}

impl PartialEq for IpMap {
    fn eq(&self, other: &Self) -> bool {
        debug_assert!(
            Rc::ptr_eq(&self.engine, &other.engine),
            "comparing IpMap values built from different engines"
        );
        self.root == other.root && self.default == other.default
    }
}

impl Eq for IpMap {}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Rc<RefCell<Engine>> {
        Rc::new(RefCell::new(Engine::new()))
    }

    #[test]
    fn unset_addresses_read_the_default() {
        let map = IpMap::new(engine(), 7);
        assert_eq!(map.get_v4("10.0.0.1".parse().unwrap()), 7);
        assert!(map.is_empty());
    }

    #[test]
    fn set_updates_only_the_targeted_region() {
        let mut map = IpMap::new(engine(), 0);
        map.set_v4("192.168.1.0".parse().unwrap(), 24, 42);
        assert_eq!(map.get_v4("192.168.1.50".parse().unwrap()), 42);
        assert_eq!(map.get_v4("192.168.2.50".parse().unwrap()), 0);
        assert!(!map.is_empty());
    }

    #[test]
    fn later_set_overrides_earlier_overlapping_set() {
        let mut map = IpMap::new(engine(), 0);
        map.set_v4("192.168.1.0".parse().unwrap(), 24, 1);
        map.set_v4("192.168.1.0".parse().unwrap(), 28, 2);
        assert_eq!(map.get_v4("192.168.1.1".parse().unwrap()), 2);
        assert_eq!(map.get_v4("192.168.1.100".parse().unwrap()), 1);
    }

    #[test]
    fn is_empty_compares_identifiers_not_raw_values() {
        let shared = engine();
        let mut map = IpMap::new(shared.clone(), 0);
        // Set and then overwrite back to the default value across the same region: the resulting
        // BDD root should re-converge on the default identifier, not merely compare equal values.
        map.set_v4("10.0.0.0".parse().unwrap(), 8, 5);
        map.set_v4("10.0.0.0".parse().unwrap(), 8, 0);
        assert!(map.is_empty());
    }
}
