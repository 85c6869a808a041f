pub const TRANSACTION_KIND_BUY: &str = "BUY";
pub const TRANSACTION_KIND_SELL: &str = "SELL";
pub const TRANSACTION_KIND_DEPOSIT: &str = "DEPOSIT";
pub const TRANSACTION_KIND_WITHDRAWAL: &str = "WITHDRAWAL";
