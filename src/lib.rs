pub mod config;
pub mod database;
pub mod dto;
pub mod eligibility;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod snapshot;
pub mod utils;

use sqlx::PgPool;

use crate::services::{
    assignment_service::AssignmentService, attempt_service::AttemptService,
    audit_service::AuditService, group_service::GroupService,
    question_service::QuestionService, test_service::TestService,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub question_service: QuestionService,
    pub test_service: TestService,
    pub group_service: GroupService,
    pub assignment_service: AssignmentService,
    pub attempt_service: AttemptService,
    pub audit_service: AuditService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let question_service = QuestionService::new(pool.clone());
        let test_service = TestService::new(pool.clone());
        let group_service = GroupService::new(pool.clone());
        let assignment_service = AssignmentService::new(pool.clone());
        let attempt_service = AttemptService::new(pool.clone());
        let audit_service = AuditService::new(pool.clone());

        Self {
            pool,
            question_service,
            test_service,
            group_service,
            assignment_service,
            attempt_service,
            audit_service,
        }
    }
}
