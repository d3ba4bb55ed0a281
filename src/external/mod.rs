pub mod currency;
pub mod payment;

pub use currency::*;
pub use payment::*;
