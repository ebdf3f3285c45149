// Services module - Business logic

pub mod accounts;
pub mod membership_enrollment;
pub mod password;
pub mod voucher_redemption;
