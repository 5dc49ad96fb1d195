mod amount;
mod history;
mod point;

pub use amount::*;
pub use history::*;
pub use point::*;
