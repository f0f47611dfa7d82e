pub mod attempt_dto;
pub mod auth_dto;
pub mod comment_dto;
pub mod test_dto;
