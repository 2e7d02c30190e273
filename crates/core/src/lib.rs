pub mod money;
pub mod period;
pub mod transaction;

pub use money::Money;
pub use period::{CycleSchedule, DateRange, Month, PeriodError};
pub use transaction::Transaction;
