pub mod price;
pub mod wire;
