pub mod cleaner;
pub mod executor;
pub mod table;
pub mod validator;

pub use cleaner::clean_sql;
pub use executor::{connect_executor, MysqlExecutor, PostgresExecutor, SqlExecutor, SqliteExecutor};
pub use table::{Cell, ResultTable};
pub use validator::{validate_sql, Validation, DENYLIST};
