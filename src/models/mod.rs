pub mod catalog;
pub mod coupon;
pub mod pagination;
pub mod subscription;
pub mod usage;

pub use catalog::*;
pub use coupon::*;
pub use pagination::*;
pub use subscription::*;
pub use usage::*;
