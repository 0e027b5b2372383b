//! Maps IPv4/IPv6 addresses and netmasks onto the engine's unified variable numbering, and builds
//! the linear "chain" BDDs used to add a single network to a set or map.
//!
//! Grounded on `original_source/src/libipset/set.cc` (`create_ipv4_bdd`/`create_ipv6_bdd`: chain
//! built high variable to low, MSB-first bit extraction) and spec.md §3/§4.6 for the shared,
//! family-discriminator-prefixed variable numbering that the `.cc` file's single-family variant
//! lacks.

use crate::engine::{Engine, NodeId, Variable};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Variable 0 is the address-family discriminator: `True` selects IPv4, `False` selects IPv6.
pub const FAMILY_VARIABLE: Variable = Variable(0);

pub const IPV4_BITS: u8 = 32;
pub const IPV6_BITS: u8 = 128;

/// MSB-first bit `index` (0-based) of `octets`.
fn bit_at(octets: &[u8], index: u8) -> bool {
    let byte = octets[(index / 8) as usize];
    let mask = 0x80u8 >> (index % 8);
    byte & mask != 0
}

/// Builds the Boolean "region" BDD for `addr/netmask`: variable 1 is the address's bit 0, variable
/// 2 its bit 1, and so on, one nonterminal per constrained bit, built from the lowest-numbered
/// (most significant) constrained variable down to the highest (`netmask`..=1 in reverse, i.e. the
/// chain is built from bit `netmask - 1` back up to bit 0, one nonterminal per level). A netmask of
/// `0` yields the "anything" BDD (`terminal(1)`), matching the "no-op, already present" behavior
/// documented on [`crate::set::IpSet::add_v4`]/[`add_v6`](crate::set::IpSet::add_v6).
fn address_region(engine: &mut Engine, octets: &[u8], netmask: u8) -> NodeId {
    let mut result = engine.terminal(1);
    let false_node = engine.terminal(0);
    for bit in (0..netmask).rev() {
        let variable = Variable::new(bit + 1);
        result = if bit_at(octets, bit) {
            engine.nonterminal(variable, false_node, result)
        } else {
            engine.nonterminal(variable, result, false_node)
        };
    }
    result
}

/// The Boolean BDD selecting exactly the IPv4 addresses within `addr/netmask`, including the
/// family discriminator.
pub fn ipv4_region(engine: &mut Engine, addr: Ipv4Addr, netmask: u8) -> NodeId {
    let chain = address_region(engine, &addr.octets(), netmask);
    let false_node = engine.terminal(0);
    engine.nonterminal(FAMILY_VARIABLE, false_node, chain)
}

/// The Boolean BDD selecting exactly the IPv6 addresses within `addr/netmask`, including the
/// family discriminator.
pub fn ipv6_region(engine: &mut Engine, addr: Ipv6Addr, netmask: u8) -> NodeId {
    let chain = address_region(engine, &addr.octets(), netmask);
    let false_node = engine.terminal(0);
    engine.nonterminal(FAMILY_VARIABLE, chain, false_node)
}

/// An oracle function for [`Engine::evaluate`] that selects the IPv4 `addr`.
pub fn ipv4_oracle(addr: Ipv4Addr) -> impl Fn(Variable) -> bool {
    let octets = addr.octets();
    move |variable: Variable| {
        if variable == FAMILY_VARIABLE {
            true
        } else {
            bit_at(&octets, variable.index() - 1)
        }
    }
}

/// An oracle function for [`Engine::evaluate`] that selects the IPv6 `addr`.
pub fn ipv6_oracle(addr: Ipv6Addr) -> impl Fn(Variable) -> bool {
    let octets = addr.octets();
    move |variable: Variable| {
        if variable == FAMILY_VARIABLE {
            false
        } else {
            bit_at(&octets, variable.index() - 1)
        }
    }
}

/// Reassembles an address of `bit_count` bits from MSB-first Booleans (as produced by expanding a
/// path's variables 1.. in order). Used by the high-level set iterator when emitting concrete
/// addresses.
pub fn bits_to_octets(bits: impl Iterator<Item = bool>, bit_count: usize) -> Vec<u8> {
    let mut octets = vec![0u8; bit_count / 8];
    for (index, bit) in bits.enumerate().take(bit_count) {
        if bit {
            octets[index / 8] |= 0x80 >> (index % 8);
        }
    }
    octets
}
