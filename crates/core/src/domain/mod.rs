pub mod message;
pub mod product;
