mod ledger_store;

pub use ledger_store::{
    initialize_and_persist, InMemoryLedgerStore, LedgerStore, LoadError, StoreError,
};
