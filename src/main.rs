mod render;

use std::{net::Ipv4Addr, thread, time::Duration};

use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use mcq::{Conf, QueryErr, Session, SocketConf, Transport, DEFAULT_HOST, DEFAULT_PORT};
use render::{render_fields, BASIC_STAT_ORDER, FULL_STAT_ORDER};

#[derive(Parser)]
#[command(name = "mcq")]
#[command(about = "Minecraft server query tool")]
struct Args {
    /// Host (IP or domain) of the Minecraft server
    #[arg(default_value = DEFAULT_HOST)]
    host: String,

    /// Query port of the Minecraft server
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(long, default_value_t = 3, help = "Handshake attempts before giving up")]
    max_retries: u32,

    #[arg(short, long, default_value_t = 10, help = "Receive timeout in seconds")]
    timeout: u64,

    #[arg(long, default_value_t = 1, help = "Re-handshakes per lost stat response")]
    stat_retries: u32,

    #[arg(long, default_value = "0.0.0.0")]
    bind: Ipv4Addr,

    #[arg(long, default_value_t = 0)]
    bind_port: u16,

    #[arg(long, help = "Run the basic stat query")]
    basic: bool,

    #[arg(long, help = "Run the full stat query")]
    full: bool,

    #[arg(long, help = "Print JSON instead of key: value lines")]
    json: bool,

    #[arg(long, value_delimiter = ',', help = "Fields to print, in order")]
    fields: Vec<String>,

    #[arg(short, long, help = "Repeat the queries every N seconds")]
    watch: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    if args.host == DEFAULT_HOST && args.port == DEFAULT_PORT {
        println!(
            "No host or port given, using defaults: {}:{}",
            DEFAULT_HOST, DEFAULT_PORT
        );
    }

    let conf = Conf {
        host: args.host.clone(),
        port: args.port,
        socket_conf: SocketConf {
            timeout: Duration::from_secs(args.timeout),
            max_retries: args.max_retries,
            stat_retries: args.stat_retries,
            rep_udp_ipv4: args.bind,
            rep_udp_port: args.bind_port,
        },
    };

    println!("Querying {}", conf);

    let mut session = conf.connect()?;

    loop {
        if let Err(err) = run_queries(&mut session, &args) {
            match (&err, args.watch) {
                // A bad or lost response is not fatal while polling.
                (QueryErr::DecodeErr(_) | QueryErr::Timeout | QueryErr::MalformedPacket(_), Some(_)) => {
                    log::error!("Query failed: {}", err);
                }
                _ => return Err(err.into()),
            }
        }

        match args.watch {
            Some(secs) => thread::sleep(Duration::from_secs(secs)),
            None => break,
        }
    }

    Ok(())
}

fn run_queries<T: Transport>(session: &mut Session<T>, args: &Args) -> Result<(), QueryErr> {
    // Neither flag means both, like the original tool.
    let (basic, full) = match (args.basic, args.full) {
        (false, false) => (true, true),
        selected => selected,
    };

    if basic {
        let status = session.basic_stat()?;
        print_record("Basic Stat Response", &status, BASIC_STAT_ORDER, args);
    }

    if full {
        let status = session.full_stat()?;
        print_record("Full Stat Response", &status, FULL_STAT_ORDER, args);
    }

    Ok(())
}

fn print_record<S: Serialize + std::fmt::Display>(
    title: &str,
    record: &S,
    default_order: &[&str],
    args: &Args,
) {
    println!("{}:", title);

    if args.json {
        println!("{}\n", record);
        return;
    }

    let rendered = match args.fields.is_empty() {
        true => render_fields(record, default_order),
        false => render_fields(record, &args.fields),
    };

    match rendered {
        Ok(text) => println!("{}\n", text),
        Err(err) => log::error!("Can not render {}: {}", title, err),
    }
}
