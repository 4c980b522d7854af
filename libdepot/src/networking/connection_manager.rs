use crate::networking::connection::{Connection, ConnectionId};
use log::info;
use std::sync::Mutex;

type OnConnectionCallback = dyn FnMut(&Connection) + Sync + Send;

/// Assigns connection ids and notifies interested parties about connection
/// lifecycle, e.g. for log correlation.
pub struct ConnectionManager {
    connection_id_counter: Mutex<ConnectionId>,
    open_cb: Mutex<Vec<Box<OnConnectionCallback>>>,
    close_cb: Mutex<Vec<Box<OnConnectionCallback>>>,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    pub fn new() -> ConnectionManager {
        ConnectionManager {
            connection_id_counter: Mutex::new(0),
            open_cb: Mutex::new(vec![]),
            close_cb: Mutex::new(vec![]),
        }
    }

    pub fn register_connection(&self, connection: &mut Connection) {
        let mut connection_counter = self.connection_id_counter.lock().unwrap();
        connection.id = *connection_counter;
        *connection_counter += 1;
        drop(connection_counter);

        match connection.peer_addr() {
            Ok(peer_addr) => info!(
                "New connection {} from {}:{}",
                connection.id,
                peer_addr.ip(),
                peer_addr.port()
            ),
            Err(_) => info!("New connection {} from unknown peer", connection.id),
        }

        self.open_cb
            .lock()
            .unwrap()
            .iter_mut()
            .for_each(|cb| cb(connection));
    }

    pub fn unregister_connection(&self, connection: &Connection) {
        info!("Connection {} ended", connection.id);

        self.close_cb
            .lock()
            .unwrap()
            .iter_mut()
            .for_each(|cb| cb(connection));
    }

    pub fn on_connection_opened<F>(&self, cb: F)
    where
        F: FnMut(&Connection) + Sync + Send + 'static,
    {
        self.open_cb.lock().unwrap().push(Box::from(cb));
    }

    pub fn on_connection_closed<F>(&self, cb: F)
    where
        F: FnMut(&Connection) + Sync + Send + 'static,
    {
        self.close_cb.lock().unwrap().push(Box::from(cb));
    }
}
