/// Internal rounding scale for ledger arithmetic
pub const ROUNDING_SCALE: u32 = 8;

/// Decimal precision for intermediate reporting-currency amounts
pub const REPORT_DECIMAL_PRECISION: u32 = 4;

/// Decimal precision for realized gains
pub const GAIN_DECIMAL_PRECISION: u32 = 2;

/// Quantity threshold below which a position is considered closed
pub const QUANTITY_THRESHOLD: &str = "0.00000001";
