pub mod error;
pub mod local_executor;
pub mod shell;
pub mod traits;
pub mod types;

pub use error::ExecutorError;
pub use local_executor::LocalCommandExecutor;
pub use traits::{CommandExecutor, FileAccess, HostExec};
pub use types::{CommandOutput, CommandResult, OutputError};
