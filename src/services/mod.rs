pub mod errors;
pub mod results_cache;
pub mod value_mappings;
pub mod view_manager;

pub use errors::{ErrorInfo, ErrorManager};
pub use results_cache::{CachedEntity, CachedResult, ResultKey, ResultsCache};
pub use value_mappings::ValueMappings;
pub use view_manager::{AnalyticsViewManager, ViewHandle};
