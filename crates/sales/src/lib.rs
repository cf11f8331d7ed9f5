//! Sales domain module.
//!
//! Holds the `SalesOrder` aggregate (a completed POS sale) and the one place
//! where sales rows are aggregated into totals. Commission and goal
//! calculations both consume `SalesTotals` rather than summing rows themselves.

pub mod order;
pub mod period;
pub mod record;
pub mod totals;

pub use order::{
    RecordSale, SaleRecorded, SaleVoided, SalesOrder, SalesOrderCommand, SalesOrderEvent,
    SalesOrderId, VoidSale, max_sale_total,
};
pub use period::{DateWindow, Period};
pub use record::{SaleRecord, SaleType};
pub use totals::{SalesFilter, SalesTotals};
