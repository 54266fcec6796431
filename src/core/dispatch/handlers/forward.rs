// src/core/dispatch/handlers/forward.rs

//! `forward`/`forward_add`/`forward_remove` and `stub_add`/`stub_remove` (§4.2).
//! Grammar: `[+it] zone servers…` (i=insecure, t=TLS) for forwards, `[+ipt] zone
//! servers…` (p=prime) for stubs.

use crate::core::errors::ControlError;
use crate::core::state::resolver::{ForwardEntry, ResolverState, StubEntry};

struct ForwardOptions {
    insecure: bool,
    tls: bool,
}

struct StubOptions {
    insecure: bool,
    prime: bool,
    tls: bool,
}

fn parse_forward_options(token: &str) -> Result<ForwardOptions, ControlError> {
    let mut opts = ForwardOptions { insecure: false, tls: false };
    for ch in token.trim_start_matches('+').chars() {
        match ch {
            'i' => opts.insecure = true,
            't' => opts.tls = true,
            other => return Err(ControlError::UnknownOption(other.to_string())),
        }
    }
    Ok(opts)
}

fn parse_stub_options(token: &str) -> Result<StubOptions, ControlError> {
    let mut opts = StubOptions { insecure: false, prime: false, tls: false };
    for ch in token.trim_start_matches('+').chars() {
        match ch {
            'i' => opts.insecure = true,
            'p' => opts.prime = true,
            't' => opts.tls = true,
            other => return Err(ControlError::UnknownOption(other.to_string())),
        }
    }
    Ok(opts)
}

fn split_options<'a>(args: &[&'a str]) -> (Option<&'a str>, &'a [&'a str]) {
    match args.first() {
        Some(tok) if tok.starts_with('+') => (Some(tok), &args[1..]),
        _ => (None, args),
    }
}

pub fn forward_add(resolver: &ResolverState, args: &[&str]) -> Result<String, ControlError> {
    let (opt_tok, rest) = split_options(args);
    let opts = opt_tok.map(parse_forward_options).transpose()?.unwrap_or(ForwardOptions {
        insecure: false,
        tls: false,
    });
    let [zone, servers @ ..] = rest else {
        return Err(ControlError::SyntaxError);
    };
    if servers.is_empty() {
        return Err(ControlError::SyntaxError);
    }
    resolver.forwards.write().entries.insert(
        zone.to_string(),
        ForwardEntry {
            servers: servers.iter().map(|s| s.to_string()).collect(),
            insecure: opts.insecure,
            tls: opts.tls,
        },
    );
    Ok("ok\n".to_string())
}

pub fn forward_remove(resolver: &ResolverState, args: &[&str]) -> Result<String, ControlError> {
    let [zone] = args else {
        return Err(ControlError::SyntaxError);
    };
    resolver.forwards.write().entries.remove(*zone);
    Ok("ok\n".to_string())
}

pub fn stub_add(resolver: &ResolverState, args: &[&str]) -> Result<String, ControlError> {
    let (opt_tok, rest) = split_options(args);
    let opts = opt_tok.map(parse_stub_options).transpose()?.unwrap_or(StubOptions {
        insecure: false,
        prime: false,
        tls: false,
    });
    let [zone, servers @ ..] = rest else {
        return Err(ControlError::SyntaxError);
    };
    if servers.is_empty() {
        return Err(ControlError::SyntaxError);
    }
    let _ = opts.insecure;
    let _ = opts.tls;
    resolver.hints.write().stubs.insert(
        zone.to_string(),
        StubEntry {
            servers: servers.iter().map(|s| s.to_string()).collect(),
            prime: opts.prime,
        },
    );
    Ok("ok\n".to_string())
}

pub fn stub_remove(resolver: &ResolverState, args: &[&str]) -> Result<String, ControlError> {
    let [zone] = args else {
        return Err(ControlError::SyntaxError);
    };
    resolver.hints.write().stubs.remove(*zone);
    Ok("ok\n".to_string())
}

/// Renders each entry as `<zone> IN forward [+it] server…`, matching the
/// original's `list_forwards` line shape so scripts that scrape it keep working.
pub fn list_forwards(resolver: &ResolverState) -> String {
    let forwards = resolver.forwards.read();
    let mut out = String::new();
    for (zone, entry) in forwards.entries.iter() {
        let mut flags = String::new();
        if entry.insecure {
            flags.push('i');
        }
        if entry.tls {
            flags.push('t');
        }
        let opt_tok = if flags.is_empty() {
            String::new()
        } else {
            format!(" +{flags}")
        };
        out.push_str(&format!("{zone} IN forward{opt_tok} {}\n", entry.servers.join(" ")));
    }
    out
}
