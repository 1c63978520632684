//! Minimal echo client: connects over TCP, sends a line of JSON every
//! second, and prints whatever comes back.
//!
//! Run an echo server first (`ncat -l -k -e /bin/cat 7777` works), then:
//!
//! ```text
//! cargo run --example echo_client -- 127.0.0.1 7777
//! ```

use std::sync::Arc;
use std::time::Duration;

use netforge::{ChannelEvents, NetworkChannel, NetworkErrorCode, PacketHandler};
use netforge_protocol::{LengthPrefixedCodec, Packet, PacketId};
use netforge_transport::TcpTransport;
use serde::{Deserialize, Serialize};

const OP_ECHO: PacketId = PacketId(1);
const OP_HEARTBEAT: PacketId = PacketId(0);

#[derive(Serialize, Deserialize)]
struct Echo {
    seq: u32,
    text: String,
}

struct LogEvents;

impl ChannelEvents for LogEvents {
    fn on_connected(&mut self, name: &str, _user_data: Option<&(dyn std::any::Any + Send)>) {
        println!("[{name}] connected");
    }

    fn on_closed(&mut self, name: &str) {
        println!("[{name}] closed");
    }

    fn on_miss_heartbeat(&mut self, name: &str, missed: u32) {
        println!("[{name}] missed heartbeat x{missed}");
    }

    fn on_error(&mut self, name: &str, code: NetworkErrorCode, message: &str) {
        eprintln!("[{name}] error ({code}): {message}");
    }
}

struct EchoHandler;

impl PacketHandler for EchoHandler {
    fn id(&self) -> PacketId {
        OP_ECHO
    }

    fn handle(&self, packet: &Packet) {
        match packet.payload_json::<Echo>() {
            Ok(echo) => println!("<- #{}: {}", echo.seq, echo.text),
            Err(e) => eprintln!("bad echo body: {e}"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netforge=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = args.next().as_deref().unwrap_or("7777").parse()?;

    let codec = LengthPrefixedCodec::new().with_control_id(OP_HEARTBEAT);
    let mut channel = NetworkChannel::new("echo", TcpTransport, codec, Box::new(LogEvents));
    channel.register_handler(Arc::new(EchoHandler));
    channel.set_heartbeat_interval(10.0);
    channel.connect(&host, port, None)?;

    let mut seq = 0u32;
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    loop {
        ticker.tick().await;
        channel.update(0.1, 0.1);

        if channel.connected() && seq % 10 == 0 {
            let msg = Echo {
                seq: seq / 10,
                text: "hello over netforge".to_string(),
            };
            channel.send(Packet::json(OP_ECHO, &msg)?)?;
            println!("-> #{}", msg.seq);
        }
        seq = seq.wrapping_add(1);
    }
}
