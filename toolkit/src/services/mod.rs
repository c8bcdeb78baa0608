pub mod attendance;
pub mod forms;
pub mod mail;
pub mod qr;
