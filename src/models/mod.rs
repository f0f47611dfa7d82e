pub mod answer;
pub mod comment;
pub mod question;
pub mod result;
pub mod user;
