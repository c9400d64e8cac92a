//! # IOAPI Module
//!
//! Single-instance control channel for the `daedalus-shell` process.
//!
//! The first instance binds a localhost TCP listener and writes its address into a
//! connection file in the OS temporary directory. A later launch reads that file and,
//! instead of opening a second session, forwards a command to the resident instance:
//! `Activate` (recreate the window if it was closed) or `Quit`.
//!
//! Frames are `[u32 big-endian length][opcode][payload...]`; the resident instance
//! answers every command with a length-prefixed acknowledgement.

use std::{
    io::{Read, Write},
    net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream},
    ops::Deref,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender, TryRecvError},
    },
    thread::JoinHandle,
    time::Duration,
};

use crate::error::ControlError;

const ACCEPT_POLL: Duration = Duration::from_millis(50);
const IO_TIMEOUT: Duration = Duration::from_secs(2);
const ACK: &[u8] = b"ok";
/// Largest frame either side sends; commands and acks are a few bytes.
const MAX_FRAME_LEN: usize = 64;

/// Returns a per-user OS temporary directory path for the connection file.
///
/// This uses `std::env::temp_dir()`, which avoids hardcoding usernames or absolute
/// paths that won't exist on other users' machines.
pub fn connection_file_path() -> PathBuf {
    std::env::temp_dir().join("daedalus-shell.txt")
}

/// Commands a second launch can send to the resident instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IoApiCommand {
    /// Bring the window back, recreating it if it was closed.
    Activate = 1,
    /// Exit the resident instance.
    Quit = 2,
}

impl IoApiCommand {
    /// Returns the numeric operation code associated with the command.
    fn cmd_code(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for IoApiCommand {
    type Error = ControlError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(IoApiCommand::Activate),
            2 => Ok(IoApiCommand::Quit),
            other => Err(ControlError::UnknownOpcode(other)),
        }
    }
}

/// A serialized request ready to be sent over the socket.
pub struct IoApiRequest(Box<[u8]>);

impl From<IoApiCommand> for IoApiRequest {
    fn from(value: IoApiCommand) -> Self {
        Self(length_prefixed(&[value.cmd_code()]))
    }
}

impl Deref for IoApiRequest {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn length_prefixed(bytes: &[u8]) -> Box<[u8]> {
    let length_prefix = (bytes.len() as u32).to_be_bytes();
    [&length_prefix[..], bytes].concat().into_boxed_slice()
}

fn read_frame(stream: &mut impl Read) -> Result<Vec<u8>, ControlError> {
    let mut length_buf = [0u8; 4];
    stream.read_exact(&mut length_buf)?;
    let length = u32::from_be_bytes(length_buf) as usize;
    if length > MAX_FRAME_LEN {
        return Err(ControlError::OversizedFrame(length));
    }

    let mut body = vec![0u8; length];
    stream.read_exact(&mut body)?;
    Ok(body)
}

/// Reads the resident instance's address from a connection file.
pub fn read_instance_addr(path: &Path) -> Result<SocketAddr, ControlError> {
    let content = std::fs::read_to_string(path)?;
    let first_line = content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| ControlError::MalformedAddress("connection file is empty".into()))?;

    first_line
        .parse()
        .map_err(|_| ControlError::MalformedAddress(first_line.to_string()))
}

/// Sends `command` to the instance at `addr` and waits for its acknowledgement.
pub fn send_command(addr: SocketAddr, command: IoApiCommand) -> Result<(), ControlError> {
    let mut stream = TcpStream::connect_timeout(&addr, IO_TIMEOUT)?;
    stream.set_read_timeout(Some(IO_TIMEOUT))?;
    stream.set_write_timeout(Some(IO_TIMEOUT))?;

    let request: IoApiRequest = command.into();
    stream.write_all(&request)?;

    let reply = read_frame(&mut stream)?;
    tracing::debug!("Instance replied: {}", String::from_utf8_lossy(&reply));
    Ok(())
}

/// Forwards `command` to a resident instance if one is listening.
///
/// Returns `false` when there is no connection file or it points at nobody, in which
/// case the caller should become the resident instance itself.
pub fn forward_to_running_instance(path: &Path, command: IoApiCommand) -> bool {
    let addr = match read_instance_addr(path) {
        Ok(addr) => addr,
        Err(e) => {
            tracing::debug!("No running instance: {}", e);
            return false;
        }
    };

    match send_command(addr, command) {
        Ok(()) => {
            tracing::info!("Forwarded {:?} to running instance at {}", command, addr);
            true
        }
        Err(e) => {
            tracing::debug!("Stale connection file at {:?}: {}", path, e);
            false
        }
    }
}

/// The resident side: accepts control connections on a background thread.
pub struct ControlListener {
    addr: SocketAddr,
    connection_file: PathBuf,
    receiver: Receiver<IoApiCommand>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ControlListener {
    /// Binds on an ephemeral localhost port and publishes it in `connection_file`.
    pub fn bind(connection_file: impl Into<PathBuf>) -> Result<Self, ControlError> {
        let connection_file = connection_file.into();
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        std::fs::write(&connection_file, addr.to_string())?;
        tracing::info!("Control channel on address: {}", addr);

        let (sender, receiver) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let thread = std::thread::spawn(move || accept_loop(listener, sender, thread_stop));

        Ok(Self {
            addr,
            connection_file,
            receiver,
            stop,
            thread: Some(thread),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Next command if one has arrived.
    pub fn try_next(&self) -> Result<Option<IoApiCommand>, ControlError> {
        match self.receiver.try_recv() {
            Ok(command) => Ok(Some(command)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ControlError::ListenerFinished),
        }
    }

    /// Blocks until a command arrives.
    pub fn wait(&self) -> Result<IoApiCommand, ControlError> {
        self.receiver
            .recv()
            .map_err(|_| ControlError::ListenerFinished)
    }
}

impl Drop for ControlListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        // Only remove the file if it still advertises us.
        if let Ok(addr) = read_instance_addr(&self.connection_file)
            && addr == self.addr
        {
            let _ = std::fs::remove_file(&self.connection_file);
        }
    }
}

fn accept_loop(listener: TcpListener, sender: Sender<IoApiCommand>, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = handle_connection(stream, &sender) {
                    tracing::warn!("Error on control connection from {}: {}", peer, e);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                tracing::error!("Error accepting control connection: {}", e);
                std::thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn handle_connection(
    mut stream: TcpStream,
    sender: &Sender<IoApiCommand>,
) -> Result<(), ControlError> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(IO_TIMEOUT))?;
    stream.set_write_timeout(Some(IO_TIMEOUT))?;

    let frame = read_frame(&mut stream)?;
    let code = *frame.first().ok_or(ControlError::EmptyFrame)?;
    let command = IoApiCommand::try_from(code)?;
    tracing::info!("Control command received: {:?}", command);

    if sender.send(command).is_err() {
        tracing::warn!("Control receiver dropped, ignoring {:?}", command);
    }
    stream.write_all(&length_prefixed(ACK))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_length_prefixed() {
        let request: IoApiRequest = IoApiCommand::Quit.into();
        assert_eq!(&*request, &[0, 0, 0, 1, 2]);
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        assert!(matches!(
            IoApiCommand::try_from(9),
            Err(ControlError::UnknownOpcode(9))
        ));
    }

    #[test]
    fn oversized_frame_is_rejected_before_reading_the_body() {
        let mut header: &[u8] = &[0xff, 0xff, 0xff, 0xff];
        assert!(matches!(
            read_frame(&mut header),
            Err(ControlError::OversizedFrame(len)) if len == u32::MAX as usize
        ));

        let mut ack: &[u8] = &[0, 0, 0, 2, b'o', b'k'];
        assert_eq!(read_frame(&mut ack).unwrap(), b"ok");
    }

    #[test]
    fn listener_survives_an_oversized_frame() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("instance.txt");
        let listener = ControlListener::bind(&file).unwrap();

        let mut rogue = TcpStream::connect(listener.addr()).unwrap();
        rogue.write_all(&[0x7f, 0xff, 0xff, 0xff, 1]).unwrap();
        drop(rogue);

        assert!(forward_to_running_instance(&file, IoApiCommand::Activate));
        assert_eq!(listener.wait().unwrap(), IoApiCommand::Activate);
    }

    #[test]
    fn forwarded_commands_reach_the_listener() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("instance.txt");
        let listener = ControlListener::bind(&file).unwrap();

        assert_eq!(read_instance_addr(&file).unwrap(), listener.addr());
        assert!(forward_to_running_instance(&file, IoApiCommand::Activate));
        assert!(forward_to_running_instance(&file, IoApiCommand::Quit));

        assert_eq!(listener.wait().unwrap(), IoApiCommand::Activate);
        assert_eq!(listener.wait().unwrap(), IoApiCommand::Quit);
        assert_eq!(listener.try_next().unwrap(), None);

        drop(listener);
        assert!(!file.exists());
    }

    #[test]
    fn missing_or_stale_file_means_no_instance() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("instance.txt");
        assert!(!forward_to_running_instance(&file, IoApiCommand::Activate));

        let port = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .unwrap()
            .local_addr()
            .unwrap();
        std::fs::write(&file, port.to_string()).unwrap();
        assert!(!forward_to_running_instance(&file, IoApiCommand::Activate));

        std::fs::write(&file, "not an address").unwrap();
        assert!(matches!(
            read_instance_addr(&file),
            Err(ControlError::MalformedAddress(_))
        ));
    }
}
