use mcq::{Conf, QueryErr};
use std::{thread, time::Duration};

/// Poll a server's full stat every five seconds on one session.
fn main() -> Result<(), QueryErr> {
    let mut session = Conf::create_with_port("localhost", 25565).connect()?;

    println!("{}", session.basic_stat()?);

    loop {
        println!("{}", session.full_stat()?);
        thread::sleep(Duration::from_secs(5));
    }
}
