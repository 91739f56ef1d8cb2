pub mod collect;
pub mod paths;
pub mod prompt;
pub mod record;
pub mod store;

pub use collect::{collect_full, collect_quick, CollectError};
pub use prompt::{PromptError, Prompter, TerminalPrompter};
pub use record::{DeploymentRecord, DeploymentType, RecordSummary};
pub use store::{ConfigStore, StoreError};
