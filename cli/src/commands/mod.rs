pub mod config;
pub mod init;
pub mod login;
pub mod register;
pub mod whoami;
