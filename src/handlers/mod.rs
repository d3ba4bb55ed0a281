pub mod catalog;
pub mod coupon;
pub mod subscription;
pub mod usage;

pub use catalog::*;
pub use coupon::*;
pub use subscription::*;
pub use usage::*;
