use std::io;
use std::io::BufReader;
use std::net::{SocketAddr, TcpStream};

pub type ConnectionId = u64;

/// One accepted client connection.
///
/// A connection carries no authentication state of its own; identity is
/// established per command through the session token the client supplies.
pub struct Connection {
    pub id: ConnectionId,
    stream: BufReader<TcpStream>,
}

impl io::Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl io::Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.get_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.get_mut().flush()
    }
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        let reader = BufReader::new(stream);

        Connection {
            id: 0,
            stream: reader,
        }
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.get_ref().peer_addr()
    }
}
