pub mod account;
pub mod files;

use crate::auth::ThreadSafeCredentialVerifier;
use crate::messaging::frame::Frame;
use crate::messaging::frame_reader::FrameReader;
use crate::messaging::response::Response;
use crate::networking::connection::Connection;
use crate::networking::server_socket::FrameHandler;
use crate::protocol::account::AccountHandler;
use crate::protocol::files::FileHandler;
use crate::session::SessionRegistry;
use crate::storage::ThreadSafeRecordStore;
use crate::upload::UploadRunner;
use log::{info, warn};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, RwLock};

pub const REGISTER_OK: &str = "REGISTER_OK";
pub const REGISTER_FAIL: &str = "REGISTER_FAIL";
pub const LOGIN_OK: &str = "LOGIN_OK";
pub const LOGIN_FAIL: &str = "LOGIN_FAIL";
pub const UPLOAD_OK: &str = "UPLOAD_OK";
pub const UPLOAD_FAIL_PREFIX: &str = "UPLOAD_FAIL - ";
pub const UNKNOWN_COMMAND_PREFIX: &str = "Nieznana komenda: ";

/// The commands a client may issue, keyed by their wire names.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub enum ServerCommand {
    Register,
    Login,
    Upload,
    Download,
    ListFiles,
}

impl ServerCommand {
    pub fn from_name(name: &str) -> Option<ServerCommand> {
        match name {
            "REGISTER" => Some(ServerCommand::Register),
            "LOGIN" => Some(ServerCommand::Login),
            "UPLOAD" => Some(ServerCommand::Upload),
            "DOWNLOAD" => Some(ServerCommand::Download),
            "LIST_FILES" => Some(ServerCommand::ListFiles),
            _ => None,
        }
    }
}

pub type ThreadSafeCommandHandler = dyn CommandHandler + Sync + Send;

pub trait CommandHandler {
    fn handle_command(
        &self,
        connection: &mut Connection,
        command: ServerCommand,
        reader: &mut FrameReader,
    ) -> Result<Response, Box<dyn Error>>;
}

/// Drives the request/response exchange of one connection.
///
/// Each inbound frame names a command followed by its arguments; the server
/// looks the command up, lets the handler produce a response and writes it
/// back. Unknown commands are answered but do not terminate the loop; a
/// malformed frame does.
pub struct CommandServer {
    command_handlers: RwLock<HashMap<ServerCommand, Arc<ThreadSafeCommandHandler>>>,
}

impl CommandServer {
    pub fn new(
        session_registry: Arc<SessionRegistry>,
        record_store: Arc<ThreadSafeRecordStore>,
        upload_runner: Arc<UploadRunner>,
        credential_verifier: Arc<ThreadSafeCredentialVerifier>,
    ) -> Self {
        let command_server = CommandServer {
            command_handlers: RwLock::new(HashMap::new()),
        };

        let account_handler = Arc::new(AccountHandler::new(
            Arc::clone(&record_store),
            Arc::clone(&session_registry),
            credential_verifier,
        ));
        command_server.add_handler(ServerCommand::Register, account_handler.clone());
        command_server.add_handler(ServerCommand::Login, account_handler);

        let file_handler = Arc::new(FileHandler::new(
            record_store,
            session_registry,
            upload_runner,
        ));
        command_server.add_handler(ServerCommand::Upload, file_handler.clone());
        command_server.add_handler(ServerCommand::Download, file_handler.clone());
        command_server.add_handler(ServerCommand::ListFiles, file_handler);

        command_server
    }

    pub fn add_handler(&self, command: ServerCommand, handler: Arc<ThreadSafeCommandHandler>) {
        info!("Adding {command:?} command handler");
        self.command_handlers
            .write()
            .unwrap()
            .insert(command, handler);
    }
}

impl FrameHandler for CommandServer {
    fn handle_frame(
        &self,
        connection: &mut Connection,
        mut frame: Frame,
    ) -> Result<(), Box<dyn Error>> {
        let command_name = frame.reader.read_str()?;

        let maybe_handler = ServerCommand::from_name(&command_name).and_then(|command| {
            let handlers = self.command_handlers.read().unwrap();
            handlers.get(&command).cloned().map(|handler| (command, handler))
        });

        match maybe_handler {
            Some((command, handler)) => {
                let mut response =
                    handler.handle_command(connection, command, &mut frame.reader)?;
                response.send(connection)?;

                Ok(())
            }
            None => {
                warn!(
                    "[Connection {}] Unknown command {command_name}",
                    connection.id
                );
                let mut response =
                    Response::status(&format!("{UNKNOWN_COMMAND_PREFIX}{command_name}"))?;
                response.send(connection)?;

                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_wire_names_map_to_commands() {
        assert_eq!(
            ServerCommand::from_name("REGISTER"),
            Some(ServerCommand::Register)
        );
        assert_eq!(ServerCommand::from_name("LOGIN"), Some(ServerCommand::Login));
        assert_eq!(
            ServerCommand::from_name("UPLOAD"),
            Some(ServerCommand::Upload)
        );
        assert_eq!(
            ServerCommand::from_name("DOWNLOAD"),
            Some(ServerCommand::Download)
        );
        assert_eq!(
            ServerCommand::from_name("LIST_FILES"),
            Some(ServerCommand::ListFiles)
        );
    }

    #[test]
    fn ensure_unknown_names_map_to_nothing() {
        assert_eq!(ServerCommand::from_name("FOO"), None);
        assert_eq!(ServerCommand::from_name(""), None);
        // Wire names are case-sensitive.
        assert_eq!(ServerCommand::from_name("register"), None);
    }
}
