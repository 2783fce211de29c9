pub mod response;
pub mod sell;
pub mod transaction;

pub use response::*;
pub use sell::*;
pub use transaction::*;
