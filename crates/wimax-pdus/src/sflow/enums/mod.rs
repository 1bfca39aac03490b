pub mod confirmation_code;
pub mod cs_specification;
