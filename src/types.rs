pub mod device;
pub mod dismissal;
pub mod lifecycle;
pub mod messaging;
pub mod registration;
