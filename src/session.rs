use crate::{
    query::{decode_basic_status, decode_full_status, BasicStatus, FullStatus},
    share::bufs_to_latin1_str,
    transport::{Packet, Transport, UdpTransport, TYPE_HANDSHAKE, TYPE_STAT},
    Conf, QueryErr,
};
use log::{debug, info, warn};
use std::time::{Duration, Instant};

/// A full stat request pads the token to 8 bytes.
const FULL_STAT_PADDING: [u8; 4] = [0x00, 0x00, 0x00, 0x00];

/// A query session with one server.
///
/// Holds the challenge token between requests and re-handshakes only when a
/// request is lost or rejected, so polling should reuse one session.
#[derive(Debug)]
pub struct Session<T: Transport> {
    transport: T,
    session_id: i32,
    challenge_token: Option<i32>,
    retry_count: u32,
    max_retries: u32,
    stat_retries: u32,
    timeout: Duration,
}

impl Session<UdpTransport> {
    /// Open a UDP transport to the configured server and handshake.
    pub fn connect(conf: &Conf) -> Result<Self, QueryErr> {
        conf.socket_conf.validate()?;

        let mut session = Self::with_transport(UdpTransport::connect(conf)?, conf);

        session.handshake()?;

        Ok(session)
    }
}

impl<T: Transport> Session<T> {
    /// Wrap an already opened transport. No packet is sent until the first
    /// request.
    pub fn with_transport(transport: T, conf: &Conf) -> Self {
        Self {
            transport,
            session_id: 0,
            challenge_token: None,
            retry_count: 0,
            max_retries: conf.socket_conf.max_retries,
            stat_retries: conf.socket_conf.stat_retries,
            timeout: conf.socket_conf.timeout,
        }
    }

    /// Obtain a fresh challenge token.
    ///
    /// Lost or truncated responses are retried until `max_retries` attempts
    /// have failed, then [QueryErr::HandshakeFailed] is returned. Send failures
    /// are returned immediately.
    pub fn handshake(&mut self) -> Result<i32, QueryErr> {
        self.challenge_token = None;

        loop {
            self.session_id = self.session_id.wrapping_add(1);

            let session_id = self.session_id;

            if let Err(err) = self.transport.send(TYPE_HANDSHAKE, session_id, &[]) {
                self.retry_count = 0;
                return Err(err);
            }

            match self.await_response(TYPE_HANDSHAKE, session_id) {
                Ok(packet) => {
                    self.retry_count = 0;

                    let token = parse_challenge_token(&packet.payload)?;

                    debug!("Handshake {} got challenge token {}", session_id, token);
                    self.challenge_token = Some(token);

                    return Ok(token);
                }
                Err(err) if err.is_transient() => {
                    self.retry_count += 1;

                    warn!(
                        "Failed handshake attempt {}/{}: {}",
                        self.retry_count, self.max_retries, err
                    );

                    if self.retry_count >= self.max_retries {
                        let attempts = self.retry_count;

                        self.retry_count = 0;
                        return Err(QueryErr::HandshakeFailed { attempts });
                    }
                }
                Err(err) => {
                    self.retry_count = 0;
                    return Err(err);
                }
            }
        }
    }

    /// Get basic [status](https://wiki.vg/Query#Basic_stat).
    pub fn basic_stat(&mut self) -> Result<BasicStatus, QueryErr> {
        let packet = self.request_stat(false)?;

        decode_basic_status(&packet.payload)
    }

    /// Get full [status](https://wiki.vg/Query#Full_stat).
    pub fn full_stat(&mut self) -> Result<FullStatus, QueryErr> {
        let packet = self.request_stat(true)?;

        decode_full_status(&packet.payload)
    }

    /// Send a stat request, re-handshaking at most `stat_retries` times when
    /// the response is lost or truncated. A stale token shows up the same way,
    /// since servers silently drop requests carrying one.
    fn request_stat(&mut self, full: bool) -> Result<Packet, QueryErr> {
        let mut retries_remaining = self.stat_retries;

        loop {
            let token = match self.challenge_token {
                Some(token) => token,
                None => self.handshake()?,
            };
            let payload = [
                token.to_be_bytes().as_slice(),
                match full {
                    true => FULL_STAT_PADDING.as_slice(),
                    false => [].as_slice(),
                },
            ]
            .concat();
            let session_id = self.session_id;

            self.transport.send(TYPE_STAT, session_id, &payload)?;

            match self.await_response(TYPE_STAT, session_id) {
                Ok(packet) => return Ok(packet),
                Err(err) if err.is_transient() && retries_remaining > 0 => {
                    retries_remaining -= 1;

                    info!("Stat request {} failed ({}), re-handshaking", session_id, err);
                    self.handshake()?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Receive until the response to `session_id` shows up. Responses to
    /// earlier, timed out requests are skipped, but the whole wait is bounded
    /// by one timeout.
    fn await_response(&mut self, packet_type: u8, session_id: i32) -> Result<Packet, QueryErr> {
        let deadline = Instant::now() + self.timeout;

        loop {
            if Instant::now() >= deadline {
                return Err(QueryErr::Timeout);
            }

            let packet = self.transport.receive(deadline)?;

            if !packet.header.answers(session_id) {
                debug!(
                    "Skipping stale response for session {}, waiting for {}",
                    packet.header.session_id, session_id
                );
                continue;
            }

            if packet.header.packet_type != packet_type {
                return Err(QueryErr::DecodeErr(format!(
                    "Response packet invalid, expected type {:#04x}, but got: {:#04x}",
                    packet_type, packet.header.packet_type
                )));
            }

            return Ok(packet);
        }
    }

    /// Token of the last successful handshake, `None` before the first one or
    /// after a failed one.
    pub fn challenge_token(&self) -> Option<i32> {
        self.challenge_token
    }

    /// Id of the last request sent.
    pub fn session_id(&self) -> i32 {
        self.session_id
    }

    /// Failed attempts of the handshake in progress.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// The handshake response carries the token as null-terminated decimal text,
/// while requests carry it as a big-endian i32.
fn parse_challenge_token(payload: &[u8]) -> Result<i32, QueryErr> {
    let token_str = bufs_to_latin1_str(payload);
    let token_str = token_str.trim_end_matches('\0');

    match token_str.trim().parse::<i32>() {
        Ok(token) => Ok(token),
        Err(err) => Err(QueryErr::DecodeErr(format!(
            "Can not parse challenge token {:?}, reason: {}",
            token_str, err
        ))),
    }
}
