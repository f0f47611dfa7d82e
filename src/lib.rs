pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use crate::services::{
    comment_service::CommentService, scoring_service::ScoringService, test_service::TestService,
    user_service::UserService,
};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub test_service: TestService,
    pub scoring_service: ScoringService,
    pub comment_service: CommentService,
    pub user_service: UserService,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        let test_service = TestService::new(pool.clone());
        let scoring_service = ScoringService::new(pool.clone());
        let comment_service = CommentService::new(pool.clone());
        let user_service = UserService::new(pool.clone());

        Self {
            pool,
            test_service,
            scoring_service,
            comment_service,
            user_service,
        }
    }
}
