pub mod contact;
pub mod contact_list;
pub mod session;
pub mod tag;
pub mod text_match;
pub mod token;
pub mod user;
