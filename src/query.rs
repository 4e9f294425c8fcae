use crate::{
    share::{bufs_to_latin1_str, find_all},
    QueryErr,
};
use serde::Serialize;
use std::collections::HashMap;

/// Fixed `splitnum\0\x80\0` padding in front of the full stat key/values.
const FULL_STAT_PADDING: usize = 11;
/// Separates the key/value section from the player list.
const PLAYER_MARKER: &[u8] = b"\x00\x00\x01player_\x00\x00";

/// Result of a [basic stat](https://wiki.vg/Query#Basic_stat).
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BasicStatus {
    pub motd: String,
    #[serde(rename = "gametype")]
    pub game_type: String,
    pub map: String,
    #[serde(rename = "numplayers")]
    pub num_players: i32,
    #[serde(rename = "maxplayers")]
    pub max_players: i32,
    #[serde(rename = "hostport")]
    pub host_port: u16,
    #[serde(rename = "hostip")]
    pub host_ip: String,
}

impl std::fmt::Display for BasicStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?
        )
    }
}

/// Result of a [full stat](https://wiki.vg/Query#Full_stat).
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FullStatus {
    pub game_id: String,
    #[serde(rename = "gametype")]
    pub game_type: String,
    pub version: String,
    pub map: String,
    pub motd: String,
    #[serde(rename = "numplayers")]
    pub num_players: i32,
    #[serde(rename = "maxplayers")]
    pub max_players: i32,
    #[serde(rename = "hostport")]
    pub host_port: u16,
    #[serde(rename = "hostip")]
    pub host_ip: String,
    /// Server software, the part of the raw `plugins` value before `": "`.
    pub server_mod: String,
    pub plugins: Vec<String>,
    pub players: Vec<String>,
}

impl std::fmt::Display for FullStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?
        )
    }
}

/// Decode a basic stat payload (response header already removed).
///
/// Layout: five null-terminated strings, a little-endian u16 port and a
/// null-terminated host ip.
pub fn decode_basic_status(payload: &[u8]) -> Result<BasicStatus, QueryErr> {
    let mut fields = payload.splitn(6, |&b| b == 0x00);
    let mut next_field = |name: &str| match fields.next() {
        Some(field) => Ok(field),
        None => Err(QueryErr::DecodeErr(format!(
            "Basic stat response ended before the {} field",
            name
        ))),
    };

    let motd = bufs_to_latin1_str(next_field("motd")?);
    let game_type = bufs_to_latin1_str(next_field("gametype")?);
    let map = bufs_to_latin1_str(next_field("map")?);
    let num_players = bufs_to_latin1_str(next_field("numplayers")?);
    let max_players = bufs_to_latin1_str(next_field("maxplayers")?);
    let rest = next_field("hostport")?;

    if rest.len() < 2 {
        return Err(QueryErr::DecodeErr(format!(
            "Basic stat response too short for the host port, remaining: {:?}",
            rest
        )));
    }

    let host_ip = match rest[2..].strip_suffix(&[0u8]) {
        Some(ip) => ip,
        None => &rest[2..],
    };

    Ok(BasicStatus {
        motd,
        game_type,
        map,
        num_players: parse_int("numplayers", &num_players)?,
        max_players: parse_int("maxplayers", &max_players)?,
        host_port: u16::from_le_bytes([rest[0], rest[1]]),
        host_ip: bufs_to_latin1_str(host_ip),
    })
}

/// Decode a full stat payload (response header already removed).
pub fn decode_full_status(payload: &[u8]) -> Result<FullStatus, QueryErr> {
    // Drop meaningless byte padding
    let bufs = match payload.get(FULL_STAT_PADDING..) {
        Some(bufs) => bufs,
        None => {
            return Err(QueryErr::DecodeErr(format!(
                "Full stat response too short: {} bytes",
                payload.len()
            )));
        }
    };

    let (kv_bufs, player_bufs) = match find_all(bufs, PLAYER_MARKER).as_slice() {
        [idx] => (&bufs[..*idx], &bufs[idx + PLAYER_MARKER.len()..]),
        [] => {
            return Err(QueryErr::DecodeErr(
                "Full stat response has no player section marker".into(),
            ));
        }
        found => {
            return Err(QueryErr::DecodeErr(format!(
                "Full stat response has {} player section markers",
                found.len()
            )));
        }
    };

    let mut kv = decode_key_values(&bufs_to_latin1_str(kv_bufs));
    let players = decode_players(&bufs_to_latin1_str(player_bufs));
    let mut take = |key: &str| match kv.remove(key) {
        Some(value) => Ok(value),
        None => Err(QueryErr::DecodeErr(format!(
            "Full stat response is missing the {} key",
            key
        ))),
    };

    let motd = take("motd")?;
    let game_type = take("gametype")?;
    let game_id = take("game_id")?;
    let version = take("version")?;
    let (server_mod, plugins) = split_plugins(&take("plugins")?);
    let map = take("map")?;
    let num_players = parse_int("numplayers", &take("numplayers")?)?;
    let max_players = parse_int("maxplayers", &take("maxplayers")?)?;
    let host_port = parse_int("hostport", &take("hostport")?)?;
    let host_ip = take("hostip")?;

    Ok(FullStatus {
        game_id,
        game_type,
        version,
        map,
        motd,
        num_players,
        max_players,
        host_port,
        host_ip,
        server_mod,
        plugins,
        players,
    })
}

/// Pair up null-separated tokens. The first key is sent as `hostname` but
/// carries the motd, so it is renamed.
fn decode_key_values(section: &str) -> HashMap<String, String> {
    let mut tokens = section.split('\0');
    let mut kv = HashMap::new();

    if let (Some(_), Some(motd)) = (tokens.next(), tokens.next()) {
        kv.insert("motd".to_string(), motd.to_string());
    }

    while let (Some(key), Some(value)) = (tokens.next(), tokens.next()) {
        kv.insert(key.to_string(), value.to_string());
    }

    kv
}

fn decode_players(section: &str) -> Vec<String> {
    let names = section.trim_end_matches('\0');

    if names.is_empty() {
        return vec![];
    }

    names.split('\0').map(String::from).collect()
}

/// Plugin format: `SERVER_MOD_NAME[: PLUGIN_NAME(; PLUGIN_NAME...)]`
pub fn split_plugins(raw: &str) -> (String, Vec<String>) {
    match raw.split_once(": ") {
        Some((server_mod, plugins)) => (
            server_mod.into(),
            plugins
                .split("; ")
                .filter(|x| !x.is_empty())
                .map(String::from)
                .collect(),
        ),
        None => (raw.into(), vec![]),
    }
}

fn parse_int<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, QueryErr> {
    value.trim().parse::<T>().map_err(|_| {
        QueryErr::DecodeErr(format!("{} is not a number: {:?}", name, value))
    })
}
