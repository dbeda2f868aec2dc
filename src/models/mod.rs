pub mod answer;
pub mod assignment;
pub mod audit_log;
pub mod group;
pub mod question;
pub mod snapshot;
pub mod test;
pub mod test_attempt;
pub mod violation;
