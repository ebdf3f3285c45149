// Background jobs

pub mod voucher_expiry;
