use crate::auth::{verify_user, ThreadSafeCredentialVerifier};
use crate::messaging::frame_reader::FrameReader;
use crate::messaging::response::Response;
use crate::networking::connection::Connection;
use crate::protocol::{
    CommandHandler, ServerCommand, LOGIN_FAIL, LOGIN_OK, REGISTER_FAIL, REGISTER_OK,
};
use crate::session::SessionRegistry;
use crate::storage::ThreadSafeRecordStore;
use log::{info, warn};
use snafu::Snafu;
use std::error::Error;
use std::sync::Arc;

#[derive(Debug, Snafu)]
#[snafu(display("The account handler cannot serve the {command:?} command."))]
struct UnhandledCommandError {
    command: ServerCommand,
}

/// Serves REGISTER and LOGIN. Neither requires a session.
pub struct AccountHandler {
    record_store: Arc<ThreadSafeRecordStore>,
    session_registry: Arc<SessionRegistry>,
    credential_verifier: Arc<ThreadSafeCredentialVerifier>,
}

impl AccountHandler {
    pub fn new(
        record_store: Arc<ThreadSafeRecordStore>,
        session_registry: Arc<SessionRegistry>,
        credential_verifier: Arc<ThreadSafeCredentialVerifier>,
    ) -> AccountHandler {
        AccountHandler {
            record_store,
            session_registry,
            credential_verifier,
        }
    }

    fn register(
        &self,
        connection: &Connection,
        reader: &mut FrameReader,
    ) -> Result<Response, Box<dyn Error>> {
        let username = reader.read_str()?;
        let password = reader.read_str()?;

        let secret = match self.credential_verifier.derive_secret(&password) {
            Ok(secret) => secret,
            Err(e) => {
                warn!(
                    "[Connection {}] Could not derive a secret for {username}: {e}",
                    connection.id
                );
                return Response::status(REGISTER_FAIL);
            }
        };

        let created = match self.record_store.create_user(&username, &secret) {
            Ok(created) => created,
            Err(e) => {
                warn!(
                    "[Connection {}] Registration of {username} failed: {e}",
                    connection.id
                );
                false
            }
        };

        if created {
            info!("[Connection {}] Registered user {username}", connection.id);
            Response::status(REGISTER_OK)
        } else {
            Response::status(REGISTER_FAIL)
        }
    }

    fn login(
        &self,
        connection: &Connection,
        reader: &mut FrameReader,
    ) -> Result<Response, Box<dyn Error>> {
        let username = reader.read_str()?;
        let password = reader.read_str()?;

        if !verify_user(
            self.record_store.as_ref(),
            self.credential_verifier.as_ref(),
            &username,
            &password,
        ) {
            warn!(
                "[Connection {}] Failed login attempt for {username}",
                connection.id
            );
            return Response::status(LOGIN_FAIL);
        }

        let token = self.session_registry.create(&username);
        info!("[Connection {}] User {username} logged in", connection.id);

        Response::build(|writer| {
            writer.write_str(LOGIN_OK)?;
            writer.write_str(&token)
        })
    }
}

impl CommandHandler for AccountHandler {
    fn handle_command(
        &self,
        connection: &mut Connection,
        command: ServerCommand,
        reader: &mut FrameReader,
    ) -> Result<Response, Box<dyn Error>> {
        match command {
            ServerCommand::Register => self.register(connection, reader),
            ServerCommand::Login => self.login(connection, reader),
            _ => Err(UnhandledCommandSnafu { command }.build().into()),
        }
    }
}
