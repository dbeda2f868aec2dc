pub mod assignment_dto;
pub mod attempt_dto;
pub mod group_dto;
pub mod question_dto;
pub mod test_dto;
