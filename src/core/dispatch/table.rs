// src/core/dispatch/table.rs

//! The command table and distribution-policy flags (§4.2). A plain data table —
//! unlike the command registry this subsystem's teacher uses, a macro-generated
//! dispatch table is unwarranted for the two dozen control verbs here.

use crate::core::errors::ControlError;
use bitflags::bitflags;

bitflags! {
    /// Per-command distribution policy (§4.2).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DispatchFlags: u32 {
        /// Mutates resolver state.
        const WRITE = 1 << 0;
        /// Replayed to peer workers after the primary applies it locally.
        const DISTRIBUTE = 1 << 1;
        /// Distributed even when there are no peer workers to distribute to.
        const ALWAYS_DISTRIBUTE = 1 << 2;
        /// Never distributed; answers from local state only.
        const READONLY = 1 << 3;
        /// Reads further lines until an empty line or a single 0x04 byte.
        const BULK_INPUT = 1 << 4;
    }
}

pub struct CommandSpec {
    pub name: &'static str,
    pub flags: DispatchFlags,
}

macro_rules! spec {
    ($name:expr, $flags:expr) => {
        CommandSpec { name: $name, flags: $flags }
    };
}

pub const COMMAND_TABLE: &[CommandSpec] = &[
    spec!("stop", DispatchFlags::empty()),
    spec!("reload", DispatchFlags::empty()),
    spec!("reload_keep_cache", DispatchFlags::empty()),
    spec!("fast_reload", DispatchFlags::empty()),
    spec!("stats", DispatchFlags::READONLY),
    spec!("stats_noreset", DispatchFlags::READONLY),
    spec!("status", DispatchFlags::READONLY),
    spec!("verbosity", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("local_zone", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("local_zone_remove", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("local_data", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("local_data_remove", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!(
        "local_zones",
        DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE).union(DispatchFlags::BULK_INPUT)
    ),
    spec!(
        "local_zones_remove",
        DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE).union(DispatchFlags::BULK_INPUT)
    ),
    spec!(
        "local_datas",
        DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE).union(DispatchFlags::BULK_INPUT)
    ),
    spec!(
        "local_datas_remove",
        DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE).union(DispatchFlags::BULK_INPUT)
    ),
    spec!("forward", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("forward_add", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("forward_remove", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("stub_add", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("stub_remove", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("flush_zone", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("flush_name", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("flush_type", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("flush_infra", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("flush_bogus", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("flush_negative", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("flush_stats", DispatchFlags::ALWAYS_DISTRIBUTE),
    spec!("flush_requestlist", DispatchFlags::ALWAYS_DISTRIBUTE),
    spec!("insecure_add", DispatchFlags::WRITE.union(DispatchFlags::ALWAYS_DISTRIBUTE)),
    spec!("insecure_remove", DispatchFlags::WRITE.union(DispatchFlags::ALWAYS_DISTRIBUTE)),
    spec!("lookup", DispatchFlags::READONLY),
    spec!("dump_cache", DispatchFlags::READONLY),
    spec!("load_cache", DispatchFlags::WRITE.union(DispatchFlags::BULK_INPUT)),
    spec!("list_local_zones", DispatchFlags::READONLY),
    spec!("list_forwards", DispatchFlags::READONLY),
    spec!("rpz_enable", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("rpz_disable", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
    spec!("view_local_zone", DispatchFlags::WRITE.union(DispatchFlags::DISTRIBUTE)),
];

/// Finds the command matching `token` by longest-unique-prefix match (§4.2): an
/// exact match always wins; otherwise a prefix must be unique among the table.
pub fn lookup(token: &str) -> Result<&'static CommandSpec, ControlError> {
    if let Some(exact) = COMMAND_TABLE.iter().find(|c| c.name == token) {
        return Ok(exact);
    }
    let mut matches = COMMAND_TABLE.iter().filter(|c| c.name.starts_with(token));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Ok(only),
        _ => Err(ControlError::UnknownCommand(token.to_string())),
    }
}
