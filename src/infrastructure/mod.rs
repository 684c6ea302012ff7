pub mod checkout_store;
