// Library root: catalog loading, rosters, cap-rule transactions, and the
// session that ties them together.

pub mod catalog;
pub mod config;
pub mod history;
pub mod roster;
pub mod session;
pub mod transactions;
