//! A plain-TCP FTP server on 127.0.0.1 that understands just enough of the
//! protocol for `SuppaConnector`: USER/PASS, TYPE, CWD, SIZE, PASV, RETR, QUIT.

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::REMOTE_DIR;

#[derive(Clone, Default)]
pub struct LoopbackServer {
    files: HashMap<String, Vec<u8>>,
    cwd_reply: Option<String>,
    stall_data: Option<Duration>,
}

impl LoopbackServer {
    pub fn with_files(files: &[(&str, Vec<u8>)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(name, data)| (name.to_string(), data.clone()))
                .collect(),
            ..Self::default()
        }
    }

    /// Answer every CWD with `reply` instead of the usual 250/550.
    pub fn cwd_reply(mut self, reply: &str) -> Self {
        self.cwd_reply = Some(reply.to_string());
        self
    }

    /// Open the data connection and send `150`, then say nothing for `stall`.
    pub fn stall_data(mut self, stall: Duration) -> Self {
        self.stall_data = Some(stall);
        self
    }

    /// Start accepting connections. Each one is served on its own thread.
    pub fn spawn(self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(self);
        thread::spawn(move || {
            for control in listener.incoming() {
                let Ok(control) = control else { break };
                let server = server.clone();
                thread::spawn(move || {
                    let _ = server.serve(control);
                });
            }
        });
        addr
    }

    fn serve(&self, control: TcpStream) -> io::Result<()> {
        let mut out = control.try_clone()?;
        let mut lines = BufReader::new(control);
        reply(&mut out, "220 loopback ready")?;

        let mut binary = false;
        let mut passive: Option<TcpListener> = None;
        let mut line = String::new();
        loop {
            line.clear();
            if lines.read_line(&mut line)? == 0 {
                return Ok(());
            }
            let command = line.trim_end();
            let (verb, arg) = command.split_once(' ').unwrap_or((command, ""));

            match verb.to_ascii_uppercase().as_str() {
                "USER" => reply(&mut out, "331 Anonymous login ok, send your email as password")?,
                "PASS" => reply(&mut out, "230 Anonymous access granted")?,
                "TYPE" => {
                    binary = arg == "I";
                    reply(&mut out, &format!("200 Type set to {}", arg))?;
                }
                "CWD" => match &self.cwd_reply {
                    Some(custom) => reply(&mut out, custom)?,
                    None if arg == REMOTE_DIR => reply(&mut out, "250 CWD command successful")?,
                    None => reply(&mut out, &format!("550 {}: No such file or directory", arg))?,
                },
                "SIZE" if !binary => reply(&mut out, "550 SIZE not allowed in ASCII mode")?,
                "SIZE" => match self.files.get(arg) {
                    Some(data) => reply(&mut out, &format!("213 {}", data.len()))?,
                    None => reply(&mut out, &format!("550 {}: No such file or directory", arg))?,
                },
                "PASV" => {
                    let data_listener = TcpListener::bind("127.0.0.1:0")?;
                    let port = data_listener.local_addr()?.port();
                    reply(
                        &mut out,
                        &format!("227 Entering Passive Mode (127,0,0,1,{},{})", port / 256, port % 256),
                    )?;
                    passive = Some(data_listener);
                }
                "RETR" => {
                    let (Some(data_listener), Some(data)) = (passive.take(), self.files.get(arg)) else {
                        reply(&mut out, &format!("550 {}: No such file or directory", arg))?;
                        continue;
                    };
                    let (mut data_conn, _) = data_listener.accept()?;
                    reply(&mut out, "150 Opening BINARY mode data connection")?;
                    match self.stall_data {
                        Some(stall) => thread::sleep(stall),
                        None => data_conn.write_all(data)?,
                    }
                    drop(data_conn);
                    reply(&mut out, "226 Transfer complete")?;
                }
                "QUIT" => {
                    reply(&mut out, "221 Goodbye")?;
                    return Ok(());
                }
                _ => reply(&mut out, "502 Command not implemented")?,
            }
        }
    }
}

fn reply(out: &mut TcpStream, line: &str) -> io::Result<()> {
    out.write_all(format!("{}\r\n", line).as_bytes())?;
    out.flush()
}
