//! Domain models shared by server and client
//!
//! One module per aggregate; each carries the entity struct plus the
//! Create/Update payloads used by the HTTP surface. Database row mapping
//! (`sqlx::FromRow` / `sqlx::Type`) is gated behind the `db` feature so the
//! client does not pull in sqlx.

pub mod actor;
pub mod archive;
pub mod batch;
pub mod branch;
pub mod finance;
pub mod kpi;
pub mod notification;
pub mod product;
pub mod sale;
pub mod staff;
pub mod stock;

pub use actor::{Actor, Role};
pub use archive::{ArchiveRun, ArchiveRunStatus, ArchiveRunType, ArchiveSettings};
pub use batch::{Batch, BatchItem, BatchStatus};
pub use branch::Branch;
pub use finance::{Expense, StaffPayment};
pub use kpi::KpiEvent;
pub use notification::{AlertRule, Notification};
pub use product::{Category, Product};
pub use sale::{PaymentMethod, Sale, SaleItem};
pub use staff::{RolePreference, StaffProfile};
pub use stock::{InventoryMovement, MovementType, StockLevel, StockSource};
