// src/core/state/resolver.rs

//! Stand-ins for the resolver data planes named as external collaborators: the
//! `views`/`forwards`/`hints` trees the fast-reload construct step rebuilds, and the
//! RRset/message/key/infra caches the cache-mutation handlers operate on.
//!
//! Real implementations of these live in the resolver proper; this subsystem only
//! needs their shape (reader-writer locking, swap-the-whole-tree semantics) to
//! exercise the control-plane logic that sits on top of them.

use crate::config::{Config, ForwardConfig, StubConfig, ViewConfig};
use crate::core::errors::ControlError;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Tolerance applied by TTL-lowering flush handlers, per §4.3.
pub const FLUSH_EPSILON_SECS: i64 = 3;

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct LocalZoneEntry {
    pub kind: String,
    pub records: Vec<String>,
    pub rpz_enabled: bool,
}

/// The `views` tree: per-view local-zone/local-data declarations.
#[derive(Debug, Default)]
pub struct ViewsTree {
    pub zones: BTreeMap<String, LocalZoneEntry>,
}

impl ViewsTree {
    fn from_config(views: &[ViewConfig]) -> Self {
        let mut zones = BTreeMap::new();
        for view in views {
            for zone in &view.local_zones {
                zones.insert(
                    zone.clone(),
                    LocalZoneEntry {
                        kind: "static".to_string(),
                        records: Vec::new(),
                        rpz_enabled: false,
                    },
                );
            }
        }
        Self { zones }
    }
}

#[derive(Debug, Clone)]
pub struct ForwardEntry {
    pub servers: Vec<String>,
    pub insecure: bool,
    pub tls: bool,
}

/// The `forwards` tree.
#[derive(Debug, Default)]
pub struct ForwardsTree {
    pub entries: BTreeMap<String, ForwardEntry>,
}

impl ForwardsTree {
    fn from_config(forwards: &[ForwardConfig]) -> Self {
        let mut entries = BTreeMap::new();
        for fwd in forwards {
            entries.insert(
                fwd.zone.clone(),
                ForwardEntry {
                    servers: fwd.servers.clone(),
                    insecure: fwd.insecure,
                    tls: fwd.tls,
                },
            );
        }
        Self { entries }
    }
}

#[derive(Debug, Clone)]
pub struct StubEntry {
    pub servers: Vec<String>,
    pub prime: bool,
}

/// The `hints` tree (stub zones).
#[derive(Debug, Default)]
pub struct HintsTree {
    pub stubs: BTreeMap<String, StubEntry>,
}

impl HintsTree {
    fn from_config(stubs: &[StubConfig]) -> Self {
        let mut out = BTreeMap::new();
        for stub in stubs {
            out.insert(
                stub.zone.clone(),
                StubEntry {
                    servers: stub.servers.clone(),
                    prime: stub.prime,
                },
            );
        }
        Self { stubs: out }
    }
}

/// A single cached entry: an owner name and a TTL-as-absolute-deadline, plus the
/// two security-classification flags the flush handlers filter on.
#[derive(Debug, Clone)]
struct CacheEntry {
    ttl_deadline: i64,
    bogus: bool,
    negative: bool,
}

/// Stand-in for the RRset cache, message cache, and key cache: three independently
/// locked maps sharing the same TTL-lowering algorithm (§4.3).
#[derive(Debug, Default)]
pub struct Caches {
    rrsets: RwLock<BTreeMap<String, CacheEntry>>,
    messages: RwLock<BTreeMap<String, CacheEntry>>,
    keys: RwLock<BTreeMap<String, CacheEntry>>,
    infra_hosts: RwLock<BTreeMap<String, CacheEntry>>,
}

/// Count of entries affected by a flush, reported back to the client per §4.3.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlushCounts {
    pub rrsets: u64,
    pub messages: u64,
    pub keys: u64,
}

impl Caches {
    fn lower_ttl(map: &mut BTreeMap<String, CacheEntry>, predicate: impl Fn(&str, &CacheEntry) -> bool) -> u64 {
        let cutoff = now_secs() - FLUSH_EPSILON_SECS;
        let mut count = 0u64;
        for (name, entry) in map.iter_mut() {
            if predicate(name, entry) && entry.ttl_deadline > cutoff {
                entry.ttl_deadline = cutoff;
                count += 1;
            }
        }
        count
    }

    /// *Flush-by-name*: lower TTL of every entry whose owner name matches exactly.
    pub fn flush_name(&self, name: &str) -> FlushCounts {
        FlushCounts {
            rrsets: Self::lower_ttl(&mut self.rrsets.write(), |n, _| n == name),
            messages: Self::lower_ttl(&mut self.messages.write(), |n, _| n == name),
            keys: Self::lower_ttl(&mut self.keys.write(), |n, _| n == name),
        }
    }

    /// *Flush-by-zone*: lower TTL of every entry at or below `zone`.
    pub fn flush_zone(&self, zone: &str) -> FlushCounts {
        let under_zone = |n: &str| n == zone || n.ends_with(&format!(".{zone}")) || n.ends_with(zone);
        FlushCounts {
            rrsets: Self::lower_ttl(&mut self.rrsets.write(), |n, _| under_zone(n)),
            messages: Self::lower_ttl(&mut self.messages.write(), |n, _| under_zone(n)),
            keys: Self::lower_ttl(&mut self.keys.write(), |n, _| under_zone(n)),
        }
    }

    /// *Flush-bogus*: gated on the entry's security status being `bogus`.
    pub fn flush_bogus(&self) -> FlushCounts {
        FlushCounts {
            rrsets: Self::lower_ttl(&mut self.rrsets.write(), |_, e| e.bogus),
            messages: Self::lower_ttl(&mut self.messages.write(), |_, e| e.bogus),
            keys: Self::lower_ttl(&mut self.keys.write(), |_, e| e.bogus),
        }
    }

    /// *Flush-negative*: gated on the negative-caching classification.
    pub fn flush_negative(&self) -> FlushCounts {
        FlushCounts {
            rrsets: Self::lower_ttl(&mut self.rrsets.write(), |_, e| e.negative),
            messages: Self::lower_ttl(&mut self.messages.write(), |_, e| e.negative),
            keys: 0,
        }
    }

    /// *Flush-infra*: clear the entire host table, or reset a single host's entry.
    pub fn flush_infra(&self, host: Option<&str>) -> u64 {
        match host {
            Some(h) => Self::lower_ttl(&mut self.infra_hosts.write(), |n, _| n == h),
            None => {
                let mut hosts = self.infra_hosts.write();
                let count = hosts.len() as u64;
                hosts.clear();
                count
            }
        }
    }

    /// Renders every cache's contents as `name ttl bogus negative\n` lines, for
    /// `dump_cache` (§4.2). Diagnostic only — not a faithful on-disk cache format.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (label, map) in [
            ("rrset", &self.rrsets),
            ("message", &self.messages),
            ("key", &self.keys),
            ("infra", &self.infra_hosts),
        ] {
            for (name, entry) in map.read().iter() {
                out.push_str(&format!(
                    "{label} {name} {} {} {}\n",
                    entry.ttl_deadline, entry.bogus, entry.negative
                ));
            }
        }
        out
    }

    /// Parses one `dump`-formatted line (`"{label} {name} {ttl_deadline} {bogus}
    /// {negative}"`) and restores it, for `load_cache`'s dump/load round trip
    /// (§4.2). Blank lines are ignored so bulk input's trailing empty line is
    /// harmless.
    pub fn load_line(&self, line: &str) -> Result<(), ControlError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }
        let mut parts = line.split_whitespace();
        let label = parts.next().ok_or(ControlError::SyntaxError)?;
        let name = parts.next().ok_or(ControlError::SyntaxError)?;
        let ttl_deadline: i64 = parts
            .next()
            .ok_or(ControlError::SyntaxError)?
            .parse()
            .map_err(|_| ControlError::SyntaxError)?;
        let bogus: bool = parts
            .next()
            .ok_or(ControlError::SyntaxError)?
            .parse()
            .map_err(|_| ControlError::SyntaxError)?;
        let negative: bool = parts
            .next()
            .ok_or(ControlError::SyntaxError)?
            .parse()
            .map_err(|_| ControlError::SyntaxError)?;
        let entry = CacheEntry {
            ttl_deadline,
            bogus,
            negative,
        };
        match label {
            "rrset" => {
                self.rrsets.write().insert(name.to_string(), entry);
            }
            "message" => {
                self.messages.write().insert(name.to_string(), entry);
            }
            "key" => {
                self.keys.write().insert(name.to_string(), entry);
            }
            "infra" => {
                self.infra_hosts.write().insert(name.to_string(), entry);
            }
            _ => return Err(ControlError::SyntaxError),
        }
        Ok(())
    }

    /// Inserts a synthetic entry — used by tests to populate the stub caches.
    pub fn insert_for_test(&self, which: &str, name: &str, bogus: bool, negative: bool) {
        let entry = CacheEntry {
            ttl_deadline: now_secs() + 3600,
            bogus,
            negative,
        };
        match which {
            "rrset" => {
                self.rrsets.write().insert(name.to_string(), entry);
            }
            "message" => {
                self.messages.write().insert(name.to_string(), entry);
            }
            "key" => {
                self.keys.write().insert(name.to_string(), entry);
            }
            "infra" => {
                self.infra_hosts.write().insert(name.to_string(), entry);
            }
            _ => {}
        }
    }
}

/// The live, mutable resolver data planes this subsystem fronts.
#[derive(Debug, Default)]
pub struct ResolverState {
    pub views: RwLock<ViewsTree>,
    pub forwards: RwLock<ForwardsTree>,
    pub hints: RwLock<HintsTree>,
    pub caches: Caches,
}

impl ResolverState {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            views: RwLock::new(ViewsTree::from_config(&cfg.views)),
            forwards: RwLock::new(ForwardsTree::from_config(&cfg.forwards)),
            hints: RwLock::new(HintsTree::from_config(&cfg.stubs)),
            caches: Caches::default(),
        }
    }

    /// Swaps the three tree roots in place, per §4.5's "swaps the tree roots (cheap
    /// pointer swaps)". Returns the previous contents so the caller can stash them
    /// in a `FastReloadConstruct`'s old-config container until the post-swap barrier.
    pub fn swap_roots(&self, new: ResolverState) -> (ViewsTree, ForwardsTree, HintsTree) {
        let old_views = std::mem::replace(&mut *self.views.write(), new.views.into_inner());
        let old_forwards = std::mem::replace(&mut *self.forwards.write(), new.forwards.into_inner());
        let old_hints = std::mem::replace(&mut *self.hints.write(), new.hints.into_inner());
        (old_views, old_forwards, old_hints)
    }
}
