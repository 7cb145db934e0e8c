mod ledger;

pub use ledger::PgLedger;
