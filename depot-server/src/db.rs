use log::info;
use rusqlite::Connection;
use std::cell::RefCell;
use std::fs::create_dir_all;

thread_local! {
    pub static DEPOT_DB: RefCell<Connection> = RefCell::new(initialized_db());
}

/// Forces the schema to exist before any other work happens, so the listener
/// only starts accepting once the store is usable.
pub fn ensure_initialized() {
    DEPOT_DB.with(|_| ());
}

fn initialized_db() -> Connection {
    create_dir_all("db").expect("to be able to create dir");

    let conn = Connection::open("db/depot.db").expect("expected db connection to be able to open");

    // One connection per thread; readers must not stall behind a slow write
    // and concurrent writers wait instead of failing fast.
    conn.pragma_update(None, "journal_mode", "WAL")
        .expect("journal mode to be set");
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .expect("busy timeout to be set");

    let version: i64 = conn
        .query_row("PRAGMA user_version", (), |row| row.get(0))
        .expect("Version to be available");
    if version < 1 {
        conn.execute(
            "CREATE TABLE user (
                    username TEXT PRIMARY KEY,
                    secret TEXT NOT NULL
                 )",
            (),
        )
        .expect("Initialization to succeed");

        conn.execute(
            "CREATE TABLE user_file (
                    id INTEGER PRIMARY KEY,
                    owner TEXT NOT NULL,
                    filename TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    content BLOB NOT NULL
                 )",
            (),
        )
        .expect("Initialization to succeed");

        conn.execute("PRAGMA user_version = 1", ())
            .expect("Setting pragma to succeed");

        info!("Initialized depot db");
    }

    conn
}
