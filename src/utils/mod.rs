pub mod code_generator;
pub mod jwt;
pub mod money;
pub mod proration;

pub use code_generator::generate_coupon_code;
pub use jwt::*;
pub use money::{calculate_discount, discount_amount};
pub use proration::{proration_credit, prorated_charge};
