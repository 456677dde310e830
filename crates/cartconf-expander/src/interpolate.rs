//! `${name}` substitution over a materialized parameter dictionary.

use indexmap::IndexMap;
use regex::Regex;

use crate::error::InterpError;

/// Hard cap on fixed-point passes; a real cycle (`a = ${b}`, `b = ${a}`)
/// never converges and must not loop forever.
const MAX_CYCLES: u32 = 32;

fn reference_pattern() -> Regex {
    Regex::new(r"\$\{([A-Za-z0-9_-]+)\}").expect("static interpolation pattern is valid")
}

/// Resolve every `${name}` reference in every value, reading from a
/// snapshot taken at the start of each pass so within-pass substitutions
/// never depend on iteration order over the map. A reference to a key
/// that is never assigned resolves to the empty string, same as the
/// source language's treatment of an absent value. Repeats until no
/// value changes or the cycle cap is hit; any `${...}` still present
/// after the cap means a genuine cycle.
pub fn interpolate_dict(dict: &mut IndexMap<String, String>) -> Result<(), InterpError> {
    let pattern = reference_pattern();

    for _ in 0..MAX_CYCLES {
        let snapshot = dict.clone();
        let mut changed = false;

        for value in dict.values_mut() {
            if !pattern.is_match(value) {
                continue;
            }
            let replaced = pattern
                .replace_all(value, |caps: &regex::Captures| {
                    snapshot.get(&caps[1]).cloned().unwrap_or_default()
                })
                .into_owned();
            if &replaced != value {
                changed = true;
            }
            *value = replaced;
        }

        if !changed {
            break;
        }
    }

    for (key, value) in dict.iter() {
        if let Some(caps) = pattern.captures(value) {
            return Err(InterpError {
                key: key.clone(),
                chain: vec![key.clone(), caps[1].to_string()],
            });
        }
    }

    Ok(())
}
