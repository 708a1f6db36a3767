use std::collections::HashMap;

use serde_yaml::{Mapping, Number, Value};

use crate::error::EnvError;

/// Derive the env var prefix from an app name: `my-app` → `MY_APP`.
pub fn prefix_for(app_name: &str) -> String {
    segment(app_name)
}

/// The env var bound to a dotted field path: `("APP", "database.url")` →
/// `APP_DATABASE_URL`.
pub fn var_name(prefix: &str, dotted_path: &str) -> String {
    let mut name = prefix.to_string();
    for part in dotted_path.split('.') {
        name.push('_');
        name.push_str(&segment(part));
    }
    name
}

fn segment(s: &str) -> String {
    s.to_uppercase().replace(['-', '.', ' '], "_")
}

/// Environment overrides, ready to be merged over the serialized config.
#[derive(Debug)]
pub struct EnvOverlay {
    values: Mapping,
    guesses: Vec<Guess>,
}

/// A leaf whose field had no value to take a type from (null, or an empty
/// list) and was parsed heuristically. `text` is the same variable read as
/// plain strings.
#[derive(Debug)]
struct Guess {
    path: Vec<Value>,
    text: Value,
}

impl EnvOverlay {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolve heuristically parsed leaves and return the overlay.
    ///
    /// A leaf keeps its parsed value when `accepts` takes an overlay holding
    /// only that leaf, and falls back to its plain-text form otherwise.
    pub fn settle(mut self, accepts: impl Fn(Mapping) -> bool) -> Mapping {
        for guess in &self.guesses {
            let Some(parsed) = lookup(&self.values, &guess.path) else {
                continue;
            };
            if *parsed == guess.text || accepts(nest(&guess.path, parsed.clone())) {
                continue;
            }
            tracing::debug!(field = ?guess.path, "reading environment value as text");
            replace(&mut self.values, &guess.path, guess.text.clone());
        }
        self.values
    }
}

/// Build an overlay from environment variables.
///
/// The variable names come from the shape of `current` (the serialized
/// config): every leaf at path `a.b` is bound to `{PREFIX}_A_B`. Each value
/// is parsed according to the type already held at that path, so a string
/// field stays a string even when the variable looks like a number.
///
/// A variable set to the empty string is present: it empties string and list
/// fields and is invalid for bool and number fields. Every path in
/// `required` must have its variable set.
///
/// Takes an iterator so tests can pass synthetic data instead of `std::env::vars()`.
pub fn env_overlay(
    prefix: &str,
    current: &Mapping,
    vars: impl IntoIterator<Item = (String, String)>,
    required: &[&str],
) -> Result<EnvOverlay, EnvError> {
    let vars: HashMap<String, String> = vars.into_iter().collect();

    for path in required {
        let var = var_name(prefix, path);
        if !vars.contains_key(&var) {
            return Err(EnvError::Missing { var });
        }
    }

    let mut guesses = Vec::new();
    let values = overlay_mapping(prefix, &[], current, &vars, &mut guesses)?;
    Ok(EnvOverlay { values, guesses })
}

fn overlay_mapping(
    var_prefix: &str,
    path: &[Value],
    current: &Mapping,
    vars: &HashMap<String, String>,
    guesses: &mut Vec<Guess>,
) -> Result<Mapping, EnvError> {
    let mut overlay = Mapping::new();

    for (key, value) in current {
        let Some(field) = key.as_str() else {
            continue;
        };
        let var = format!("{var_prefix}_{}", segment(field));
        let mut here = path.to_vec();
        here.push(key.clone());

        if let Value::Mapping(nested) = value {
            let sub = overlay_mapping(&var, &here, nested, vars, guesses)?;
            if !sub.is_empty() {
                overlay.insert(key.clone(), Value::Mapping(sub));
            }
            continue;
        }

        if let Some(raw) = vars.get(&var) {
            tracing::debug!(var = %var, "overriding config field from environment");
            overlay.insert(key.clone(), parse_like(&var, raw, value)?);
            if is_untyped(value) {
                guesses.push(Guess {
                    path: here,
                    text: as_text(raw, value),
                });
            }
        }
    }

    Ok(overlay)
}

/// Parse `raw` into a value of the same kind as `existing`.
fn parse_like(var: &str, raw: &str, existing: &Value) -> Result<Value, EnvError> {
    let invalid = |expected| EnvError::Invalid {
        var: var.to_string(),
        value: raw.to_string(),
        expected,
    };

    match existing {
        Value::String(_) => Ok(Value::String(raw.to_string())),
        Value::Bool(_) => parse_bool(raw).map(Value::Bool).ok_or_else(|| invalid("bool")),
        Value::Number(n) if n.is_f64() => raw
            .trim()
            .parse::<f64>()
            .map(|f| Value::Number(Number::from(f)))
            .map_err(|_| invalid("float")),
        Value::Number(_) => parse_integer(raw).ok_or_else(|| invalid("integer")),
        Value::Sequence(items) => {
            let sample = items.first().cloned().unwrap_or(Value::Null);
            split_list(raw)
                .into_iter()
                .map(|item| parse_like(var, item, &sample))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence)
        }
        _ => Ok(parse_untyped(raw)),
    }
}

/// No value to take a type from: null, or a list without a typed first item.
fn is_untyped(existing: &Value) -> bool {
    match existing {
        Value::Null => true,
        Value::Sequence(items) => items.first().is_none_or(Value::is_null),
        _ => false,
    }
}

fn as_text(raw: &str, existing: &Value) -> Value {
    match existing {
        Value::Sequence(_) => Value::Sequence(
            split_list(raw)
                .into_iter()
                .map(|item| Value::String(item.to_string()))
                .collect(),
        ),
        _ => Value::String(raw.to_string()),
    }
}

fn split_list(raw: &str) -> Vec<&str> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(str::trim).collect()
}

fn lookup<'m>(mapping: &'m Mapping, path: &[Value]) -> Option<&'m Value> {
    let (last, parents) = path.split_last()?;
    let mut current = mapping;
    for key in parents {
        current = current.get(key)?.as_mapping()?;
    }
    current.get(last)
}

fn replace(mapping: &mut Mapping, path: &[Value], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = mapping;
    for key in parents {
        current = match current.get_mut(key) {
            Some(Value::Mapping(next)) => next,
            _ => return,
        };
    }
    current.insert(last.clone(), value);
}

/// A mapping holding only `leaf` at `path`.
fn nest(path: &[Value], leaf: Value) -> Mapping {
    let mut value = leaf;
    for key in path.iter().rev() {
        let mut level = Mapping::new();
        level.insert(key.clone(), value);
        value = Value::Mapping(level);
    }
    match value {
        Value::Mapping(mapping) => mapping,
        _ => Mapping::new(),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

fn parse_integer(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Value::Number(Number::from(i)));
    }
    raw.parse::<u64>().ok().map(|u| Value::Number(Number::from(u)))
}

/// Parse a value with no known target type.
/// Tries: bool → integer → float → string.
fn parse_untyped(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Some(i) = parse_integer(s) {
        return i;
    }
    if let Ok(f) = s.parse::<f64>() {
        // Only use float if the string actually contains a dot,
        // to avoid "NaN" / "inf" being parsed as float.
        if s.contains('.') {
            return Value::Number(Number::from(f));
        }
    }
    Value::String(s.to_string())
}
