pub mod assignment;
pub mod consent;
pub mod doctor;
pub mod enums;
pub mod patient;
pub mod query;
pub mod report;

pub use assignment::*;
pub use consent::*;
pub use doctor::*;
pub use enums::*;
pub use patient::*;
pub use query::*;
pub use report::*;
