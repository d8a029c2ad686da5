pub mod errors;
pub mod fsystem;
pub mod locations;
pub mod log;
pub mod parser;
pub mod storage;
pub mod terminal;

pub use errors::{Result, TermError, TermErrorType};
pub use fsystem::{File, FileSystem, FolderId};
pub use parser::{parse_line, Token};
pub use storage::Storage;
pub use terminal::{CommandResult, Terminal};
