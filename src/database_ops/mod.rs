pub mod countries;
pub mod db;
pub mod exchange;
pub mod reconcile;
pub mod refresh;
pub mod source;
pub mod status;
