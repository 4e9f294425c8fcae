mod common;

use common::{full_payload, BASIC_PAYLOAD};
use mcq::{Conf, PacketHeader, QueryErr, Session, UdpTransport};
use std::{
    net::{Ipv4Addr, SocketAddr, UdpSocket},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

const TOKEN: i32 = 9513307;

/// Minimal query server on loopback. Drops the first `drop_stats` stat
/// requests, answers everything else, and returns the number of requests
/// seen once it has been idle for a second.
fn spawn_server(drop_stats: usize) -> (u16, JoinHandle<usize>) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = socket.local_addr().unwrap().port();

    socket
        .set_read_timeout(Some(Duration::from_secs(1)))
        .unwrap();

    let handle = thread::spawn(move || {
        let mut bufs = [0u8; 64];
        let mut requests = 0;
        let mut dropped = 0;

        while let Ok((len, src_addr)) = socket.recv_from(&mut bufs) {
            requests += 1;

            let header = PacketHeader::decode_request(&bufs[..len]).unwrap();
            let payload = &bufs[7..len];
            let echoed = (header.session_id & 0x0F0F0F0F).to_be_bytes();

            let body = match header.packet_type {
                0x09 => format!("{}\0", TOKEN).into_bytes(),
                0x00 => {
                    assert_eq!(&payload[..4], TOKEN.to_be_bytes().as_slice());

                    if dropped < drop_stats {
                        dropped += 1;
                        continue;
                    }

                    match payload.len() {
                        8 => full_payload(),
                        _ => BASIC_PAYLOAD.to_vec(),
                    }
                }
                other => panic!("unexpected packet type {}", other),
            };

            let response = [[header.packet_type].as_slice(), &echoed, body.as_slice()].concat();
            socket.send_to(&response, src_addr).unwrap();
        }

        requests
    });

    (port, handle)
}

#[test]
fn basic_and_full_over_loopback() {
    let (port, server) = spawn_server(0);
    let conf = Conf::create_with_port("127.0.0.1", port).with_timeout(Duration::from_millis(500));

    let mut session = conf.connect().unwrap();
    assert_eq!(session.challenge_token(), Some(TOKEN));

    let basic = session.basic_stat().unwrap();
    assert_eq!(basic.game_type, "SMP");
    assert_eq!(basic.host_port, 25565);

    let full = session.full_stat().unwrap();
    assert_eq!(full.version, "1.7.9");
    assert_eq!(full.players, vec!["Alice", "Bob"]);

    // handshake, basic, full
    assert_eq!(server.join().unwrap(), 3);
}

#[test]
fn lost_stat_reply_over_loopback() {
    let (port, server) = spawn_server(1);
    let conf = Conf::create_with_port("127.0.0.1", port).with_timeout(Duration::from_millis(300));

    let mut session = conf.connect().unwrap();
    let full = session.full_stat().unwrap();

    assert_eq!(full.num_players, 2);
    assert_eq!(session.session_id(), 2);

    // handshake, dropped full, handshake, full
    assert_eq!(server.join().unwrap(), 4);
}

#[test]
fn silent_server_fails_handshake() {
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = silent.local_addr().unwrap().port();
    let conf = Conf::create_with_port("127.0.0.1", port)
        .with_timeout(Duration::from_millis(100))
        .with_max_retries(2);

    assert!(matches!(
        conf.connect(),
        Err(QueryErr::HandshakeFailed { attempts: 2 })
    ));
}

#[test]
fn unresolvable_host() {
    let conf = Conf::create("no-such-host.invalid").with_timeout(Duration::from_millis(100));

    assert!(matches!(conf.query(), Err(QueryErr::UnreachableHost(_))));
}

#[test]
fn invalid_conf_is_rejected_before_sending() {
    let conf = Conf::create_with_port("127.0.0.1", 25565).with_timeout(Duration::ZERO);

    assert!(matches!(conf.query_full(), Err(QueryErr::ConfErr(_))));
}

#[test]
fn foreign_datagrams_are_dropped() {
    let (port, server) = spawn_server(0);
    let conf = Conf::create_with_port("127.0.0.1", port).with_timeout(Duration::from_millis(500));
    let transport = UdpTransport::connect(&conf).unwrap();
    let client_addr = SocketAddr::from((Ipv4Addr::LOCALHOST, transport.local_addr().unwrap().port()));

    // Looks like the answer to the first handshake, but from the wrong peer
    let intruder = UdpSocket::bind("127.0.0.1:0").unwrap();
    intruder
        .send_to(b"\x09\x00\x00\x00\x01666\x00", client_addr)
        .unwrap();

    let mut session = Session::with_transport(transport, &conf);
    let basic = session.basic_stat().unwrap();

    assert_eq!(session.challenge_token(), Some(TOKEN));
    assert_eq!(basic.map, "world");
    assert_eq!(server.join().unwrap(), 2);
}

#[test]
fn stale_stream_is_bounded_by_timeout() {
    let flooder = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = flooder.local_addr().unwrap().port();

    flooder
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();

    // Answer every request with an id that matches nothing, every 20ms for 2s
    thread::spawn(move || {
        let mut bufs = [0u8; 64];

        if let Ok((_, client_addr)) = flooder.recv_from(&mut bufs) {
            let started = Instant::now();

            while started.elapsed() < Duration::from_secs(2) {
                let _ = flooder.send_to(b"\x09\x0E\x0E\x0E\x0E42\x00", client_addr);
                thread::sleep(Duration::from_millis(20));
            }
        }
    });

    let conf = Conf::create_with_port("127.0.0.1", port)
        .with_timeout(Duration::from_millis(200))
        .with_max_retries(2);
    let started = Instant::now();

    assert!(matches!(
        conf.connect(),
        Err(QueryErr::HandshakeFailed { attempts: 2 })
    ));
    assert!(started.elapsed() < Duration::from_millis(1000));
}
