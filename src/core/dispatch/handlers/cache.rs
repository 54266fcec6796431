// src/core/dispatch/handlers/cache.rs

//! `lookup`, `dump_cache`, and `load_cache` (§4.2).

use crate::core::errors::ControlError;
use crate::core::state::resolver::ResolverState;

/// Reports which configured tree (view, forward, or stub) would govern resolution
/// of `name`, by longest-suffix match — a diagnostic, not full resolution. When the
/// match is a local zone carrying `local_data` records, those records are returned
/// directly rather than just the zone name, matching what a real lookup answers.
pub fn lookup(resolver: &ResolverState, args: &[&str]) -> Result<String, ControlError> {
    let [name] = args else {
        return Err(ControlError::SyntaxError);
    };
    let under = |zone: &str| *name == zone || name.ends_with(&format!(".{zone}"));

    let mut best: Option<(usize, String)> = None;
    let mut consider = |zone: &str, line: String| {
        if under(zone) {
            let specificity = zone.len();
            if best.as_ref().is_none_or(|(s, _)| specificity > *s) {
                best = Some((specificity, line));
            }
        }
    };

    for (zone, entry) in resolver.views.read().zones.iter() {
        let line = if entry.records.is_empty() {
            format!("local_zone {zone} {}\n", entry.kind)
        } else {
            entry
                .records
                .iter()
                .map(|rr| format!("{rr}\n"))
                .collect::<String>()
        };
        consider(zone, line);
    }
    for zone in resolver.forwards.read().entries.keys() {
        consider(zone, format!("forward {zone}\n"));
    }
    for zone in resolver.hints.read().stubs.keys() {
        consider(zone, format!("stub {zone}\n"));
    }

    Ok(match best {
        Some((_, line)) => line,
        None => "no match, using direct resolution\n".to_string(),
    })
}

pub fn dump_cache(resolver: &ResolverState) -> String {
    resolver.caches.dump()
}

/// Restores one `dump_cache`-formatted line (bulk read until an empty line or
/// 0x04, per §4.2), completing the round trip `dump_cache` renders.
pub fn load_cache_line(resolver: &ResolverState, line: &str) -> Result<(), ControlError> {
    resolver.caches.load_line(line)
}
