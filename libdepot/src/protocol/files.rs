use crate::messaging::frame_reader::FrameReader;
use crate::messaging::response::Response;
use crate::networking::connection::Connection;
use crate::protocol::{
    CommandHandler, ServerCommand, UPLOAD_FAIL_PREFIX, UPLOAD_OK,
};
use crate::session::SessionRegistry;
use crate::storage::ThreadSafeRecordStore;
use crate::upload::{UploadOutcome, UploadRunner};
use log::{info, warn};
use snafu::Snafu;
use std::error::Error;
use std::sync::Arc;

const INVALID_SESSION_REASON: &str = "invalid session";

#[derive(Debug, Snafu)]
#[snafu(display("The file handler cannot serve the {command:?} command."))]
struct UnhandledCommandError {
    command: ServerCommand,
}

/// Serves UPLOAD, DOWNLOAD and LIST_FILES.
///
/// Every command carries a session token as its first argument; when the
/// token does not resolve, the command fails without the record store ever
/// being consulted.
pub struct FileHandler {
    record_store: Arc<ThreadSafeRecordStore>,
    session_registry: Arc<SessionRegistry>,
    upload_runner: Arc<UploadRunner>,
}

impl FileHandler {
    pub fn new(
        record_store: Arc<ThreadSafeRecordStore>,
        session_registry: Arc<SessionRegistry>,
        upload_runner: Arc<UploadRunner>,
    ) -> FileHandler {
        FileHandler {
            record_store,
            session_registry,
            upload_runner,
        }
    }

    fn upload(
        &self,
        connection: &Connection,
        reader: &mut FrameReader,
    ) -> Result<Response, Box<dyn Error>> {
        let token = reader.read_str()?;
        let filename = reader.read_str()?;
        let content = reader.read_blob()?;

        let Some(owner) = self.session_registry.resolve(&token) else {
            warn!(
                "[Connection {}] Upload with an invalid session token",
                connection.id
            );
            return Response::status(&format!("{UPLOAD_FAIL_PREFIX}{INVALID_SESSION_REASON}"));
        };

        info!(
            "[Connection {}] Uploading {filename} for {owner} ({} bytes)",
            connection.id,
            content.len()
        );

        match self.upload_runner.submit(&owner, &filename, content) {
            UploadOutcome::Completed => Response::status(UPLOAD_OK),
            UploadOutcome::Failed(reason) => {
                Response::status(&format!("{UPLOAD_FAIL_PREFIX}{reason}"))
            }
        }
    }

    fn download(
        &self,
        connection: &Connection,
        reader: &mut FrameReader,
    ) -> Result<Response, Box<dyn Error>> {
        let token = reader.read_str()?;
        let filename = reader.read_str()?;

        let Some(owner) = self.session_registry.resolve(&token) else {
            warn!(
                "[Connection {}] Download with an invalid session token",
                connection.id
            );
            return Response::absent();
        };

        match self.record_store.get_file_content(&owner, &filename) {
            Ok(Some(content)) => {
                info!(
                    "[Connection {}] Sending {filename} to {owner} ({} bytes)",
                    connection.id,
                    content.len()
                );
                Response::build(|writer| writer.write_blob(&content))
            }
            Ok(None) => Response::absent(),
            Err(e) => {
                warn!(
                    "[Connection {}] Download of {filename} for {owner} failed: {e}",
                    connection.id
                );
                Response::absent()
            }
        }
    }

    fn list_files(
        &self,
        connection: &Connection,
        reader: &mut FrameReader,
    ) -> Result<Response, Box<dyn Error>> {
        let token = reader.read_str()?;

        let Some(owner) = self.session_registry.resolve(&token) else {
            warn!(
                "[Connection {}] File listing with an invalid session token",
                connection.id
            );
            return Response::absent();
        };

        match self.record_store.list_files(&owner) {
            Ok(filenames) => Response::build(|writer| writer.write_str_list(&filenames)),
            Err(e) => {
                warn!(
                    "[Connection {}] File listing for {owner} failed: {e}",
                    connection.id
                );
                Response::absent()
            }
        }
    }
}

impl CommandHandler for FileHandler {
    fn handle_command(
        &self,
        connection: &mut Connection,
        command: ServerCommand,
        reader: &mut FrameReader,
    ) -> Result<Response, Box<dyn Error>> {
        match command {
            ServerCommand::Upload => self.upload(connection, reader),
            ServerCommand::Download => self.download(connection, reader),
            ServerCommand::ListFiles => self.list_files(connection, reader),
            _ => Err(UnhandledCommandSnafu { command }.build().into()),
        }
    }
}
