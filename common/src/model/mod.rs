pub mod attendance;
pub mod email;
pub mod form;
pub mod payload;
