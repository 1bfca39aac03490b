pub mod classifier_record;
pub mod cs_parameters;
pub mod enums;
pub mod five_tuple;
pub mod sf_params;

pub use classifier_record::IpcsClassifierRecord;
pub use cs_parameters::{ClassifierDscAction, CsParameters};
pub use enums::confirmation_code::ConfirmationCode;
pub use enums::cs_specification::CsSpecification;
pub use five_tuple::FiveTuple;
pub use sf_params::ServiceFlowParams;
