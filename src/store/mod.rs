mod kw_store;

pub use kw_store::KwStore;
