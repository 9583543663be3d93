pub mod testing;

/// The operator role shared by every XAPI contract.
/// - `assert_owner` compares an explicitly passed sender against the stored operator.
/// - `transfer_ownership` only allows the current operator to hand the role over.
pub mod ownership;

pub mod time;
