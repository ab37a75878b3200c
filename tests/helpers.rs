#![allow(dead_code)]

use leaderboard::RedisStore;
use std::process::{Child, Command, Stdio};
use std::{thread, time::Duration};

/// A throwaway `valkey-server` on a free port, shut down on drop.
pub struct Valkey {
    server: Child,
    pub port: u16,
}

impl Valkey {
    /// Spawns a server, or returns `None` when `valkey-server` is not installed.
    pub fn spawn() -> Option<Self> {
        if which::which("valkey-server").is_err() {
            eprintln!("valkey-server not found in PATH; skipping");
            return None;
        }
        let port = portpicker::pick_unused_port().expect("no free port for valkey");
        let server = Command::new("valkey-server")
            .args(["--port", &port.to_string(), "--save", "", "--appendonly", "no"])
            .stdout(Stdio::null())
            .spawn()
            .expect("spawn valkey-server");
        let valkey = Self { server, port };
        valkey.wait_ready();
        Some(valkey)
    }

    fn wait_ready(&self) {
        for _ in 0..60 {
            let pong = redis::Client::open(self.url())
                .and_then(|c| c.get_connection())
                .and_then(|mut con| redis::cmd("PING").query::<String>(&mut con));
            if pong.is_ok() {
                return;
            }
            thread::sleep(Duration::from_millis(50));
        }
        panic!("valkey on port {} never answered PING", self.port);
    }

    pub fn url(&self) -> String {
        format!("redis://127.0.0.1:{}", self.port)
    }

    pub fn store(&self) -> RedisStore {
        RedisStore::open(&self.url()).expect("connect to valkey")
    }
}

impl Drop for Valkey {
    fn drop(&mut self) {
        if let Ok(mut con) = redis::Client::open(self.url()).and_then(|c| c.get_connection()) {
            let _: redis::RedisResult<()> = redis::cmd("SHUTDOWN").arg("NOSAVE").query(&mut con);
        }
        let _ = self.server.kill();
        let _ = self.server.wait();
    }
}
