//! Shared test helpers: a scripted in-memory transport and sample payloads.

#![allow(dead_code)]

use mcq::{Packet, PacketHeader, QueryErr, Transport};
use std::{
    collections::VecDeque,
    thread,
    time::{Duration, Instant},
};

pub const BASIC_PAYLOAD: &[u8] =
    b"A Minecraft Server\x00SMP\x00world\x005\x0020\x00\xDD\x63127.0.0.1\x00";

pub fn full_payload() -> Vec<u8> {
    [
        b"splitnum\x00\x80\x00".as_slice(),
        b"hostname\x00A Minecraft Server\x00",
        b"gametype\x00SMP\x00",
        b"game_id\x00MINECRAFT\x00",
        b"version\x001.7.9\x00",
        b"plugins\x00CraftBukkit on Bukkit 1.7.9-R0.1: WorldEdit; Essentials\x00",
        b"map\x00world\x00",
        b"numplayers\x002\x00",
        b"maxplayers\x0020\x00",
        b"hostport\x0025565\x00",
        b"hostip\x00127.0.0.1",
        b"\x00\x00\x01player_\x00\x00",
        b"Alice\x00Bob\x00\x00",
    ]
    .concat()
}

/// What the scripted server does with the next receive.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer the last request with a handshake carrying this token.
    Token(i32),
    /// Answer the last request with a stat payload.
    Stat(Vec<u8>),
    /// Answer with a session id that belongs to no outstanding request.
    Stale(Vec<u8>),
    Timeout,
    Truncated,
}

/// In-memory [Transport] replaying a script of replies.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    pub replies: VecDeque<Reply>,
    pub sent: Vec<(u8, i32, Vec<u8>)>,
    /// Once the script runs out, keep answering with stale responses every
    /// few milliseconds instead of timing out.
    pub flood: bool,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            sent: vec![],
            flood: false,
        }
    }

    pub fn flooding(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            flood: true,
            ..Self::new(replies)
        }
    }

    pub fn handshakes_sent(&self) -> usize {
        self.sent.iter().filter(|(t, _, _)| *t == 0x09).count()
    }

    pub fn stats_sent(&self) -> usize {
        self.sent.iter().filter(|(t, _, _)| *t == 0x00).count()
    }

    fn last_session_id(&self) -> i32 {
        self.sent.last().map(|(_, id, _)| *id).unwrap_or(0)
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, packet_type: u8, session_id: i32, payload: &[u8]) -> Result<(), QueryErr> {
        self.sent.push((packet_type, session_id, payload.to_vec()));
        Ok(())
    }

    fn receive(&mut self, deadline: Instant) -> Result<Packet, QueryErr> {
        let session_id = self.last_session_id();

        if Instant::now() >= deadline {
            return Err(QueryErr::Timeout);
        }

        let reply = match self.replies.pop_front() {
            None if self.flood => {
                thread::sleep(Duration::from_millis(5));
                Some(Reply::Stale(vec![]))
            }
            reply => reply,
        };

        match reply {
            Some(Reply::Token(token)) => Ok(Packet {
                header: PacketHeader::new(0x09, session_id),
                payload: format!("{}\0", token).into_bytes(),
            }),
            Some(Reply::Stat(payload)) => Ok(Packet {
                header: PacketHeader::new(0x00, session_id),
                payload,
            }),
            Some(Reply::Stale(payload)) => Ok(Packet {
                header: PacketHeader::new(0x00, session_id ^ 0x0F),
                payload,
            }),
            Some(Reply::Truncated) => Err(QueryErr::MalformedPacket(3)),
            Some(Reply::Timeout) | None => Err(QueryErr::Timeout),
        }
    }
}
