mod analysis;
mod risk;
mod upload;

pub use analysis::*;
pub use risk::*;
pub use upload::*;
