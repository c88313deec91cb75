pub mod bridging;
pub mod btl;
pub mod config;
