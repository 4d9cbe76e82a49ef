pub mod depgraph;
pub mod id;
pub mod portfolio;
pub mod requirement;
pub mod results;
pub mod value;
pub mod view_def;
pub mod ws;

pub use depgraph::*;
pub use id::*;
pub use portfolio::*;
pub use requirement::*;
pub use results::*;
pub use value::*;
pub use view_def::*;
pub use ws::*;
