mod config;
mod db;
mod logging;
mod store;

use crate::config::DepotServerConfig;
use crate::store::SqliteRecordStore;
use depot::auth::Pbkdf2Verifier;
use depot::networking::server_socket::ServerSocket;
use depot::protocol::CommandServer;
use depot::session::SessionRegistry;
use depot::upload::UploadRunner;
use log::error;
use std::path::Path;
use std::sync::Arc;

fn main() {
    logging::initialize_log();

    let config = DepotServerConfig::load(Path::new("depot.json"));

    // The store must be usable before the first connection is accepted.
    db::ensure_initialized();

    let record_store = Arc::new(SqliteRecordStore::new());
    let session_registry = Arc::new(SessionRegistry::with_time_to_live(
        config.session_ttl_seconds(),
    ));
    let upload_runner = Arc::new(UploadRunner::new(
        record_store.clone(),
        config.upload_workers(),
    ));
    let credential_verifier = Arc::new(Pbkdf2Verifier::new());

    let command_server = Arc::new(CommandServer::new(
        session_registry,
        record_store,
        Arc::clone(&upload_runner),
        credential_verifier,
    ));

    let port = config.port();
    let mut socket = match ServerSocket::new(port) {
        Err(err) => panic!("Failed to open depot socket on port {port}: {err}"),
        Ok(s) => s,
    };
    socket.set_read_timeout(config.read_timeout());
    logging::log_connection_id(&socket.connection_manager(), "depot");

    let result = socket.run_sync(command_server);

    // The accept loop only returns on a fatal listener error; drain the
    // upload workers before going down.
    upload_runner.stop();

    if let Err(err) = result {
        error!("Accept loop failed: {err}");
        std::process::exit(1);
    }
}
