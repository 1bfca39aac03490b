pub mod component_test;
pub mod sink;

#[allow(unused_imports)]
pub use component_test::{ComponentTest, default_test_config};
#[allow(unused_imports)]
pub use sink::Sink;
