pub mod address;
pub mod contact;
pub mod session;
pub mod tag;
pub mod token;
pub mod user;
