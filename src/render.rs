use serde::Serialize;
use serde_json::Value;

pub const BASIC_STAT_ORDER: &[&str] = &[
    "hostip",
    "hostport",
    "gametype",
    "motd",
    "map",
    "numplayers",
    "maxplayers",
];

pub const FULL_STAT_ORDER: &[&str] = &[
    "hostip",
    "hostport",
    "game_id",
    "gametype",
    "version",
    "server_mod",
    "plugins",
    "motd",
    "map",
    "numplayers",
    "maxplayers",
    "players",
];

/// Render `record` as `key: value` lines in `order`. Keys the record does not
/// have are skipped.
pub fn render_fields<S: Serialize, K: AsRef<str>>(
    record: &S,
    order: &[K],
) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(record)?;

    Ok(order
        .iter()
        .filter_map(|key| {
            value
                .get(key.as_ref())
                .map(|v| format!("{}: {}", key.as_ref(), display_value(v)))
        })
        .collect::<Vec<_>>()
        .join("\n"))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(display_value).collect::<Vec<_>>().join(", ")
        ),
        other => other.to_string(),
    }
}
