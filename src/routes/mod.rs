pub mod assignment_routes;
pub mod attempt_routes;
pub mod audit_routes;
pub mod evaluation_routes;
pub mod group_routes;
pub mod health;
pub mod question_routes;
pub mod test_routes;
