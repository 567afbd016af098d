pub mod agent;
pub mod apartment;
pub mod apartment_owner;
pub mod apartment_resident;
pub mod app_user;
