//! Versioned binary save/load format (format version 1).
//!
//! Grounded directly on `original_source/src/libipset/bdd/write.c` and `read.c`: a 6-byte magic, a
//! 2-byte big-endian version, an 8-byte big-endian total length, a 4-byte nonterminal count, then
//! either a single 4-byte terminal value or that many `(variable: u8, low: i32, high: i32)`
//! records in post-order-DFS order with negative serialized ids referring to earlier records.

use crate::engine::{Engine, NodeId, Variable};
use crate::error::LoadError;
use std::collections::HashMap;
use std::io::{Read, Write};

const MAGIC: &[u8; 6] = b"IP set";
const VERSION: u16 = 0x0001;
const HEADER_LEN: u64 = 6 + 2 + 8 + 4;

/// Writes `root` to `writer` in format version 1.
pub fn save_to(engine: &Engine, root: NodeId, writer: &mut impl Write) -> std::io::Result<()> {
    let mut body = Vec::new();
    let nonterminal_count = if let Some(value) = root.terminal_value() {
        body.extend_from_slice(&value.to_be_bytes());
        0u32
    } else {
        let mut serialized_ids: HashMap<NodeId, i32> = HashMap::new();
        let mut next_id: i32 = -1;
        write_node_postorder(engine, root, &mut serialized_ids, &mut next_id, &mut body);
        (-next_id - 1) as u32
    };

    let total_length = HEADER_LEN + body.len() as u64;

    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_be_bytes())?;
    writer.write_all(&total_length.to_be_bytes())?;
    writer.write_all(&nonterminal_count.to_be_bytes())?;
    writer.write_all(&body)?;
    log::debug!("saved BDD with {} nonterminals ({} bytes)", nonterminal_count, total_length);
    Ok(())
}

fn write_node_postorder(
    engine: &Engine,
    id: NodeId,
    serialized_ids: &mut HashMap<NodeId, i32>,
    next_id: &mut i32,
    out: &mut Vec<u8>,
) -> i32 {
    if let Some(existing) = serialized_ids.get(&id) {
        return *existing;
    }

    let variable = engine.variable(id).expect("terminal ids are resolved by the caller");
    let low = engine.low(id);
    let high = engine.high(id);

    let low_ref = child_reference(engine, low, serialized_ids, next_id, out);
    let high_ref = child_reference(engine, high, serialized_ids, next_id, out);

    let serialized = *next_id;
    *next_id -= 1;
    serialized_ids.insert(id, serialized);

    out.push(variable.index());
    out.extend_from_slice(&low_ref.to_be_bytes());
    out.extend_from_slice(&high_ref.to_be_bytes());
    serialized
}

fn child_reference(
    engine: &Engine,
    id: NodeId,
    serialized_ids: &mut HashMap<NodeId, i32>,
    next_id: &mut i32,
    out: &mut Vec<u8>,
) -> i32 {
    if let Some(value) = id.terminal_value() {
        value as i32
    } else {
        write_node_postorder(engine, id, serialized_ids, next_id, out)
    }
}

/// Reads a version-1 stream from `reader`, materializing nodes into `engine` (which need not be
/// empty: loading re-canonicalizes through the normal hash-consing path, so overlapping structure
/// is shared automatically). Returns the root identifier of the loaded set/map.
pub(crate) fn load_from(engine: &mut Engine, reader: &mut impl Read) -> Result<NodeId, LoadError> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic).map_err(LoadError::Io)?;
    if &magic != MAGIC {
        return Err(LoadError::BadMagic);
    }

    let version = read_u16(reader)?;
    if version != VERSION {
        return Err(LoadError::UnsupportedVersion(version));
    }

    let total_length = read_u64(reader)?;
    let mut cap = total_length.checked_sub(HEADER_LEN).ok_or(LoadError::LengthMismatch {
        declared: total_length,
        actual: HEADER_LEN,
    })?;

    let count = read_u32(reader)?;
    cap = take(cap, 4)?;

    if count == 0 {
        let value = read_u32(reader)?;
        cap = take(cap, 4)?;
        if cap != 0 {
            return Err(LoadError::LengthMismatch { declared: total_length, actual: total_length - cap });
        }
        return Ok(engine.terminal(value));
    }

    let mut materialized: Vec<NodeId> = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let variable = read_u8(reader)?;
        let low = read_i32(reader)?;
        let high = read_i32(reader)?;
        cap = take(cap, 9)?;

        let low_id = resolve_reference(engine, low, &materialized)?;
        let high_id = resolve_reference(engine, high, &materialized)?;
        let node_id = engine.nonterminal(Variable::new(variable), low_id, high_id);
        materialized.push(node_id);
    }

    if cap != 0 {
        return Err(LoadError::LengthMismatch { declared: total_length, actual: total_length - cap });
    }

    Ok(*materialized.last().expect("count > 0 checked above"))
}

fn resolve_reference(engine: &Engine, reference: i32, materialized: &[NodeId]) -> Result<NodeId, LoadError> {
    if reference >= 0 {
        Ok(engine.terminal(reference as u32))
    } else {
        let index = (-reference - 1) as usize;
        materialized.get(index).copied().ok_or(LoadError::DanglingReference(reference))
    }
}

fn take(cap: u64, used: u64) -> Result<u64, LoadError> {
    cap.checked_sub(used).ok_or(LoadError::Truncated { expected: used, found: cap })
}

fn read_u8(reader: &mut impl Read) -> Result<u8, LoadError> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf).map_err(LoadError::Io)?;
    Ok(buf[0])
}

fn read_u16(reader: &mut impl Read) -> Result<u16, LoadError> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf).map_err(LoadError::Io)?;
    Ok(u16::from_be_bytes(buf))
}

fn read_u32(reader: &mut impl Read) -> Result<u32, LoadError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(LoadError::Io)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_i32(reader: &mut impl Read) -> Result<i32, LoadError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(LoadError::Io)?;
    Ok(i32::from_be_bytes(buf))
}

fn read_u64(reader: &mut impl Read) -> Result<u64, LoadError> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf).map_err(LoadError::Io)?;
    Ok(u64::from_be_bytes(buf))
}
