use crate::messaging::frame::Frame;
use crate::messaging::MAX_FRAME_SIZE;
use crate::networking::connection::Connection;
use crate::networking::connection_manager::ConnectionManager;
use log::{error, info, warn};
use snafu::{ensure, Snafu};
use std::error::Error;
use std::io::{ErrorKind, Read};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use std::{io, thread};

#[derive(Debug, Snafu)]
enum ServerSocketError {
    #[snafu(display("Frame was too large (size={frame_size}, max={MAX_FRAME_SIZE})"))]
    FrameTooLargeError { frame_size: u32 },
    #[snafu(display("The client sent an incomplete frame header"))]
    IncompleteFrameHeaderError {},
}

/// Handles the command frames of one connection.
pub trait FrameHandler {
    fn handle_frame(
        &self,
        connection: &mut Connection,
        frame: Frame,
    ) -> Result<(), Box<dyn Error>>;
}

/// Accepts client connections on one TCP port and runs an independent frame
/// loop per connection, each on its own thread.
pub struct ServerSocket {
    listener: Option<TcpListener>,
    connection_manager: Arc<ConnectionManager>,
    read_timeout: Option<Duration>,
}

impl ServerSocket {
    /// Creates a new ServerSocket instance and binds it to the specified port.
    /// Port `0` lets the OS pick a free port; see [`Self::local_port`].
    pub fn new(port: u16) -> Result<ServerSocket, io::Error> {
        let listener = TcpListener::bind(format!("0.0.0.0:{port}"))?;

        info!("Opened depot socket on port {}", listener.local_addr()?.port());

        Ok(ServerSocket {
            listener: Some(listener),
            connection_manager: Arc::new(ConnectionManager::new()),
            read_timeout: None,
        })
    }

    /// Applies a read deadline to every accepted connection. A client that
    /// stalls longer than this between bytes has its connection closed
    /// instead of pinning the connection thread forever.
    pub fn set_read_timeout(&mut self, read_timeout: Option<Duration>) {
        self.read_timeout = read_timeout;
    }

    pub fn local_port(&self) -> io::Result<u16> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| io::Error::new(ErrorKind::NotConnected, "listener already running"))?;

        Ok(listener.local_addr()?.port())
    }

    pub fn connection_manager(&self) -> Arc<ConnectionManager> {
        Arc::clone(&self.connection_manager)
    }

    fn listen(
        listener: &TcpListener,
        connection_manager: Arc<ConnectionManager>,
        frame_handler: Arc<dyn FrameHandler + Send + Sync>,
        read_timeout: Option<Duration>,
    ) -> Result<(), io::Error> {
        loop {
            let stream = match listener.accept() {
                Ok((stream, _)) => stream,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionAborted
                            | ErrorKind::ConnectionReset
                            | ErrorKind::Interrupted
                    ) =>
                {
                    // Transient accept failures do not take the server down.
                    warn!("Accept failed transiently: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Err(e) = stream.set_read_timeout(read_timeout) {
                warn!("Could not apply read timeout: {e}");
            }

            let connection_manager = Arc::clone(&connection_manager);
            let frame_handler = Arc::clone(&frame_handler);
            thread::spawn(move || {
                let mut connection = Connection::new(stream);
                connection_manager.register_connection(&mut connection);
                ServerSocket::handle_connection(&mut connection, frame_handler.as_ref());
                connection_manager.unregister_connection(&connection);
            });
        }
    }

    pub fn run_sync(
        &mut self,
        frame_handler: Arc<dyn FrameHandler + Send + Sync>,
    ) -> Result<(), io::Error> {
        let connection_manager = Arc::clone(&self.connection_manager);
        Self::listen(
            self.listener.as_ref().unwrap(),
            connection_manager,
            frame_handler,
            self.read_timeout,
        )
    }

    pub fn run_async(
        &mut self,
        frame_handler: Arc<dyn FrameHandler + Send + Sync>,
    ) -> JoinHandle<Result<(), io::Error>> {
        let frame_handler = Arc::clone(&frame_handler);
        let connection_manager = Arc::clone(&self.connection_manager);
        let read_timeout = self.read_timeout;
        let listener = self.listener.take();
        thread::spawn(move || -> Result<(), io::Error> {
            Self::listen(
                listener.as_ref().unwrap(),
                connection_manager,
                frame_handler,
                read_timeout,
            )
        })
    }

    fn handle_connection(connection: &mut Connection, frame_handler: &dyn FrameHandler) {
        let connection_loop = |connection: &mut Connection| -> Result<(), Box<dyn Error>> {
            loop {
                let mut b: [u8; 4] = [0; 4];
                let len = connection.read(&mut b)?;
                if len == 0 {
                    return Ok(());
                }

                if len != 4 {
                    connection
                        .read_exact(&mut b[len..])
                        .map_err(|_| IncompleteFrameHeaderSnafu {}.build())?;
                }
                let frame_size = u32::from_le_bytes(b);

                ensure!(
                    frame_size <= MAX_FRAME_SIZE,
                    FrameTooLargeSnafu { frame_size }
                );

                let mut payload = vec![0; frame_size as usize];
                connection.read_exact(payload.as_mut_slice())?;
                let frame = Frame::new(payload)?;
                frame_handler.handle_frame(connection, frame)?;
            }
        };

        let connection_result = connection_loop(connection);
        if let Err(e) = connection_result {
            if let Some(e0) = e.downcast_ref::<io::Error>() {
                match e0.kind() {
                    ErrorKind::Interrupted
                    | ErrorKind::ConnectionReset
                    | ErrorKind::UnexpectedEof => {}
                    ErrorKind::WouldBlock | ErrorKind::TimedOut => warn!(
                        "[Connection {}] Read deadline expired, closing connection",
                        connection.id
                    ),
                    _ => error!(
                        "[Connection {}] Connection terminated: {}: {e}",
                        connection.id,
                        e0.kind()
                    ),
                }
            } else {
                error!(
                    "[Connection {}] Connection terminated with error: {e}",
                    connection.id
                )
            }
        }
    }
}
