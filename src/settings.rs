//! Storage for the application settings, currently just the shared access
//! password that gates the whole app.

use rusqlite::Connection;

use crate::Error;

/// Create the table that holds the application settings.
///
/// The table holds at most one row.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL
/// error.
pub fn create_app_settings_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS app_settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                access_password TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Retrieve the access password that log-in attempts are checked against.
///
/// # Errors
/// Returns [Error::AccessPasswordNotSet] if the settings row has not been
/// created yet, or [Error::SqlError] if there is an unexpected SQL error.
pub fn get_access_password(connection: &Connection) -> Result<String, Error> {
    connection
        .prepare("SELECT access_password FROM app_settings WHERE id = 1")?
        .query_row([], |row| row.get(0))
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::AccessPasswordNotSet,
            error => error.into(),
        })
}

/// Set the access password, creating the settings row if it does not exist.
///
/// This is intended to be called from the `set_password` admin tool, not from
/// a route handler.
///
/// # Errors
/// Returns an error if there is an unexpected SQL error.
pub fn set_access_password(password: &str, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO app_settings (id, access_password) VALUES (1, ?1)
            ON CONFLICT(id) DO UPDATE SET access_password = excluded.access_password",
        [password],
    )?;

    Ok(())
}

#[cfg(test)]
mod settings_tests {
    use rusqlite::Connection;

    use crate::Error;

    use super::{create_app_settings_table, get_access_password, set_access_password};

    fn init_db() -> Connection {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        create_app_settings_table(&connection).expect("Could not create app settings table");

        connection
    }

    #[test]
    fn get_access_password_fails_when_not_set() {
        let connection = init_db();

        let maybe_password = get_access_password(&connection);

        assert_eq!(maybe_password, Err(Error::AccessPasswordNotSet));
    }

    #[test]
    fn set_then_get_access_password() {
        let connection = init_db();

        set_access_password("hunter2", &connection).unwrap();
        let password = get_access_password(&connection).unwrap();

        assert_eq!(password, "hunter2");
    }

    #[test]
    fn set_access_password_overwrites_existing_password() {
        let connection = init_db();

        set_access_password("hunter2", &connection).unwrap();
        set_access_password("correct horse battery staple", &connection).unwrap();

        let password = get_access_password(&connection).unwrap();

        assert_eq!(password, "correct horse battery staple");
    }
}
