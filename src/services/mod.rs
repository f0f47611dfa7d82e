pub mod comment_service;
pub mod scoring_service;
pub mod test_service;
pub mod test_validation;
pub mod user_service;
