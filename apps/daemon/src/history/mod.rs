pub mod handlers;
pub mod import;
pub mod job_id;
pub mod ledger;
