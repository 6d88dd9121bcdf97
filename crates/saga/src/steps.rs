//! Checkout step names, used as log fields and metric labels.

/// Hold stock for the requested quantity.
pub const STEP_RESERVE_INVENTORY: &str = "reserve_inventory";

/// Charge the reservation's total fee.
pub const STEP_CHARGE_PAYMENT: &str = "charge_payment";

/// Finalize the reservation.
pub const STEP_COMPLETE_RESERVATION: &str = "complete_reservation";

/// Compensation: release the reservation.
pub const STEP_RELEASE_RESERVATION: &str = "release_reservation";
