// src/core/dispatch/handlers/zones.rs

//! `local_zone`/`local_data` family and their bulk, view-scoped, and RPZ variants
//! (§4.2).

use crate::core::errors::ControlError;
use crate::core::protocol::is_bulk_terminator;
use crate::core::state::resolver::{LocalZoneEntry, ResolverState};

pub fn local_zone(resolver: &ResolverState, args: &[&str]) -> Result<String, ControlError> {
    let [zone, kind] = args else {
        return Err(ControlError::SyntaxError);
    };
    resolver.views.write().zones.insert(
        zone.to_string(),
        LocalZoneEntry {
            kind: kind.to_string(),
            records: Vec::new(),
            rpz_enabled: false,
        },
    );
    Ok("ok\n".to_string())
}

pub fn local_zone_remove(resolver: &ResolverState, args: &[&str]) -> Result<String, ControlError> {
    let [zone] = args else {
        return Err(ControlError::SyntaxError);
    };
    resolver.views.write().zones.remove(*zone);
    Ok("ok\n".to_string())
}

pub fn local_data(resolver: &ResolverState, args: &[&str]) -> Result<String, ControlError> {
    if args.is_empty() {
        return Err(ControlError::SyntaxError);
    }
    let owner = args[0];
    let rr_line = args.join(" ");
    let mut views = resolver.views.write();
    let entry = views.zones.entry(owner.to_string()).or_insert_with(|| LocalZoneEntry {
        kind: "static".to_string(),
        records: Vec::new(),
        rpz_enabled: false,
    });
    entry.records.push(rr_line);
    Ok("ok\n".to_string())
}

pub fn local_data_remove(resolver: &ResolverState, args: &[&str]) -> Result<String, ControlError> {
    let [owner] = args else {
        return Err(ControlError::SyntaxError);
    };
    if let Some(entry) = resolver.views.write().zones.get_mut(*owner) {
        entry.records.clear();
    }
    Ok("ok\n".to_string())
}

/// Applies one bulk line (`local_zones`/`local_zones_remove`/`local_datas`/
/// `local_datas_remove`, read until an empty line or 0x04 per §4.2).
pub fn apply_bulk_line(resolver: &ResolverState, variant: &str, line: &str) -> Result<(), ControlError> {
    if is_bulk_terminator(line) {
        return Ok(());
    }
    let parts: Vec<&str> = line.split_whitespace().collect();
    match variant {
        "local_zones" => {
            let [zone, kind] = parts.as_slice() else {
                return Err(ControlError::SyntaxError);
            };
            local_zone(resolver, &[zone, kind])?;
        }
        "local_zones_remove" => {
            let [zone] = parts.as_slice() else {
                return Err(ControlError::SyntaxError);
            };
            local_zone_remove(resolver, &[zone])?;
        }
        "local_datas" => {
            local_data(resolver, &parts)?;
        }
        "local_datas_remove" => {
            let [owner] = parts.as_slice() else {
                return Err(ControlError::SyntaxError);
            };
            local_data_remove(resolver, &[owner])?;
        }
        _ => return Err(ControlError::UnknownCommand(variant.to_string())),
    }
    Ok(())
}

pub fn view_local_zone(resolver: &ResolverState, args: &[&str]) -> Result<String, ControlError> {
    // `view_<name> local_zone <zone> <kind>` — the view name itself only scopes the
    // write; the simplified model keeps a single views tree, so this mutates it
    // directly (the per-view partitioning is a named external collaborator, §1).
    let [_view_name, zone, kind] = args else {
        return Err(ControlError::SyntaxError);
    };
    local_zone(resolver, &[zone, kind])
}

pub fn rpz_enable(resolver: &ResolverState, args: &[&str]) -> Result<String, ControlError> {
    let [zone] = args else {
        return Err(ControlError::SyntaxError);
    };
    match resolver.views.write().zones.get_mut(*zone) {
        Some(entry) => {
            entry.rpz_enabled = true;
            Ok("ok\n".to_string())
        }
        None => Err(ControlError::NoSuchZone(zone.to_string())),
    }
}

pub fn rpz_disable(resolver: &ResolverState, args: &[&str]) -> Result<String, ControlError> {
    let [zone] = args else {
        return Err(ControlError::SyntaxError);
    };
    match resolver.views.write().zones.get_mut(*zone) {
        Some(entry) => {
            entry.rpz_enabled = false;
            Ok("ok\n".to_string())
        }
        None => Err(ControlError::NoSuchZone(zone.to_string())),
    }
}

pub fn list_local_zones(resolver: &ResolverState) -> String {
    let views = resolver.views.read();
    let mut out = String::new();
    for (zone, entry) in views.zones.iter() {
        out.push_str(&format!("{zone} {}\n", entry.kind));
    }
    out
}
