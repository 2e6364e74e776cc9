pub mod health;
pub mod managers;
