pub mod budget;
pub mod config;
pub mod record;
pub mod scheduler;
pub mod state;
pub mod values;

pub use budget::{BudgetDecision, CycleBudget};
pub use config::ExploreConfig;
pub use record::{CycleResult, InteractionRecord};
pub use scheduler::Explorer;
pub use state::{ExplorerState, Termination};
pub use values::{FieldType, classify_field_type, guess_value, is_submit_like};
